use crate::config::{Graph, ListenerType, SUPPORTED_VERSION};
use crate::error::FirelynxError;
use std::collections::{HashMap, HashSet};

/// Validates a candidate graph against every invariant in one pass,
/// accumulating every violation instead of stopping at the first. Must run
/// strictly after interpolation, since e.g. `pathPrefix` is checked for a
/// leading `/` on its expanded value.
pub fn validate(graph: &Graph) -> Result<(), FirelynxError> {
    let mut errors = Vec::new();

    if graph.version != SUPPORTED_VERSION {
        errors.push(format!(
            "unsupported version {:?}: only {:?} is accepted",
            graph.version, SUPPORTED_VERSION
        ));
    }

    let listener_ids = unique_ids(
        graph.listeners.iter().map(|l| l.id.as_str()),
        "listener",
        &mut errors,
    );
    let app_ids = unique_ids(graph.apps.iter().map(|a| a.id.as_str()), "app", &mut errors);
    for app in &graph.apps {
        validate_app(app, &mut errors);
    }
    let _endpoint_ids = unique_ids(
        graph.endpoints.iter().map(|e| e.id.as_str()),
        "endpoint",
        &mut errors,
    );

    for listener in &graph.listeners {
        if !matches!(listener.kind, ListenerType::Http) {
            errors.push(format!(
                "listener {:?}: unsupported listener type (only http is accepted)",
                listener.id
            ));
        }
        if listener.options.read_timeout.is_zero() {
            errors.push(format!("listener {:?}: read_timeout must be positive", listener.id));
        }
        if listener.options.write_timeout.is_zero() {
            errors.push(format!("listener {:?}: write_timeout must be positive", listener.id));
        }
        if listener.options.idle_timeout.is_zero() {
            errors.push(format!("listener {:?}: idle_timeout must be positive", listener.id));
        }
        if listener.options.drain_timeout.is_zero() {
            errors.push(format!("listener {:?}: drain_timeout must be positive", listener.id));
        }
    }

    let mut listener_owner: HashMap<&str, &str> = HashMap::new();
    for endpoint in &graph.endpoints {
        if !listener_ids.contains(endpoint.listener_id.as_str()) {
            errors.push(format!(
                "endpoint {:?}: listener_id {:?} does not exist",
                endpoint.id, endpoint.listener_id
            ));
        } else if let Some(owner) = listener_owner.insert(endpoint.listener_id.as_str(), endpoint.id.as_str()) {
            errors.push(format!(
                "listener {:?} is claimed by both endpoint {:?} and endpoint {:?}",
                endpoint.listener_id, owner, endpoint.id
            ));
        }

        let mut middleware_ids = HashSet::new();
        for mw in &endpoint.middlewares {
            if !middleware_ids.insert(mw.id.as_str()) {
                errors.push(format!(
                    "endpoint {:?}: duplicate middleware id {:?}",
                    endpoint.id, mw.id
                ));
            }
            validate_middleware(endpoint.id.as_str(), mw, &mut errors);
        }

        let mut seen_conditions: HashSet<(String, String)> = HashSet::new();
        for route in &endpoint.routes {
            if !app_ids.contains(route.app_id.as_str()) {
                errors.push(format!(
                    "endpoint {:?}: route app_id {:?} does not exist",
                    endpoint.id, route.app_id
                ));
            }
            if let Some(http) = &route.http {
                if !http.path_prefix.as_str().starts_with('/') {
                    errors.push(format!(
                        "endpoint {:?}: route path_prefix {:?} must start with '/'",
                        endpoint.id,
                        http.path_prefix.as_str()
                    ));
                }
                let method_key = http
                    .method
                    .as_deref()
                    .map(|m| m.to_uppercase())
                    .unwrap_or_default();
                let key = (http.path_prefix.as_str().to_string(), method_key);
                if !seen_conditions.insert(key) {
                    errors.push(format!(
                        "endpoint {:?}: duplicate route for path_prefix {:?} and method {:?}",
                        endpoint.id,
                        http.path_prefix.as_str(),
                        http.method
                    ));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(FirelynxError::Validation(errors))
    }
}

fn unique_ids<'a>(
    ids: impl Iterator<Item = &'a str>,
    kind: &str,
    errors: &mut Vec<String>,
) -> HashSet<&'a str> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            errors.push(format!("duplicate {kind} id {id:?}"));
        }
    }
    seen
}

fn validate_app(app: &crate::config::AppDef, errors: &mut Vec<String>) {
    match app.kind.as_str() {
        "echo" => {
            if let Some(Err(e)) = app.as_echo_config() {
                errors.push(format!("app {:?}: invalid echo config: {e}", app.id));
            }
        }
        other => errors.push(format!("app {:?}: unknown kind {other:?}", app.id)),
    }
}

fn validate_middleware(endpoint_id: &str, mw: &crate::config::MiddlewareDef, errors: &mut Vec<String>) {
    match mw.kind.as_str() {
        "headers" => match mw.as_headers_config() {
            Some(Ok(cfg)) => {
                validate_header_ops(endpoint_id, &mw.id, "request", &cfg.request, errors);
                validate_header_ops(endpoint_id, &mw.id, "response", &cfg.response, errors);
            }
            Some(Err(e)) => errors.push(format!(
                "endpoint {endpoint_id:?}: middleware {:?}: invalid headers config: {e}",
                mw.id
            )),
            None => errors.push(format!(
                "endpoint {endpoint_id:?}: middleware {:?}: missing `headers` block",
                mw.id
            )),
        },
        "console_logger" => {
            if let Some(Err(e)) = mw.as_console_logger_config() {
                errors.push(format!(
                    "endpoint {endpoint_id:?}: middleware {:?}: invalid console_logger config: {e}",
                    mw.id
                ));
            }
            if let Some(Ok(cfg)) = mw.as_console_logger_config() {
                if cfg.max_body_size == 0 {
                    errors.push(format!(
                        "endpoint {endpoint_id:?}: middleware {:?}: max_body_size must be positive",
                        mw.id
                    ));
                }
            }
        }
        other => errors.push(format!(
            "endpoint {endpoint_id:?}: middleware {:?}: unknown kind {other:?}",
            mw.id
        )),
    }
}

fn validate_header_ops(
    endpoint_id: &str,
    mw_id: &str,
    phase: &str,
    ops: &crate::config::HeaderOps,
    errors: &mut Vec<String>,
) {
    for name in &ops.remove {
        if http::HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(format!(
                "endpoint {endpoint_id:?}: middleware {mw_id:?} ({phase}.remove): invalid header name {name:?}"
            ));
        }
    }
    for kv in ops.set.iter().chain(ops.add.iter()) {
        if http::HeaderName::from_bytes(kv.name.as_bytes()).is_err() {
            errors.push(format!(
                "endpoint {endpoint_id:?}: middleware {mw_id:?} ({phase}): invalid header name {:?}",
                kv.name
            ));
        }
        if http::HeaderValue::from_str(kv.value.as_str()).is_err() {
            errors.push(format!(
                "endpoint {endpoint_id:?}: middleware {mw_id:?} ({phase}): invalid header value for {:?}",
                kv.name
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppDef, EndpointDef, ListenerDef, ListenerOptions};
    use crate::interpolate::Interpolated;
    use crate::route::{HttpCondition, RouteDef};

    fn base_graph() -> Graph {
        Graph {
            version: SUPPORTED_VERSION.into(),
            listeners: vec![ListenerDef {
                id: "http1".into(),
                address: Interpolated::new("127.0.0.1:8080"),
                kind: ListenerType::Http,
                options: ListenerOptions::default(),
            }],
            endpoints: vec![EndpointDef {
                id: "main".into(),
                listener_id: "http1".into(),
                routes: vec![RouteDef {
                    app_id: "e1".into(),
                    http: Some(HttpCondition {
                        path_prefix: Interpolated::new("/"),
                        method: None,
                    }),
                    static_data: Default::default(),
                    other_conditions: Default::default(),
                }],
                middlewares: vec![],
            }],
            apps: vec![AppDef {
                id: "e1".into(),
                kind: "echo".into(),
                config: serde_json::Map::new(),
            }],
        }
    }

    #[test]
    fn valid_graph_passes() {
        assert!(validate(&base_graph()).is_ok());
    }

    #[test]
    fn rejects_dangling_app_reference() {
        let mut g = base_graph();
        g.endpoints[0].routes[0].app_id = "missing".into();
        let err = validate(&g).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn rejects_dangling_listener_reference() {
        let mut g = base_graph();
        g.endpoints[0].listener_id = "ghost".into();
        let err = validate(&g).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn rejects_path_prefix_without_leading_slash() {
        let mut g = base_graph();
        g.endpoints[0].routes[0].http.as_mut().unwrap().path_prefix = Interpolated::new("api");
        let err = validate(&g).unwrap_err();
        assert!(err.to_string().contains("must start with"));
    }

    #[test]
    fn rejects_duplicate_route_condition() {
        let mut g = base_graph();
        let dup = g.endpoints[0].routes[0].clone();
        g.endpoints[0].routes.push(dup);
        let err = validate(&g).unwrap_err();
        assert!(err.to_string().contains("duplicate route"));
    }

    #[test]
    fn accumulates_multiple_errors_in_one_pass() {
        let mut g = base_graph();
        g.endpoints[0].routes[0].app_id = "missing".into();
        g.endpoints[0].listener_id = "ghost".into();
        let err = validate(&g).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("missing"));
        assert!(text.contains("ghost"));
    }

    #[test]
    fn two_endpoints_cannot_share_a_listener() {
        let mut g = base_graph();
        let mut second = g.endpoints[0].clone();
        second.id = "other".into();
        g.endpoints.push(second);
        let err = validate(&g).unwrap_err();
        assert!(err.to_string().contains("claimed by both"));
    }

    #[test]
    fn rejects_unknown_app_kind() {
        let mut g = base_graph();
        g.apps[0].kind = "llm_proxy".into();
        let err = validate(&g).unwrap_err();
        assert!(err.to_string().contains("unknown kind"));
    }

    #[test]
    fn rejects_invalid_header_name_in_headers_middleware() {
        let mut g = base_graph();
        g.endpoints[0].middlewares.push(crate::config::MiddlewareDef {
            id: "h1".into(),
            kind: "headers".into(),
            config: serde_json::json!({
                "headers": { "request": { "remove": ["bad header\n"] } }
            })
            .as_object()
            .unwrap()
            .clone(),
        });
        let err = validate(&g).unwrap_err();
        assert!(err.to_string().contains("invalid header name"));
    }
}
