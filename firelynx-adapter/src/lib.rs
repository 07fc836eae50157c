//! Pure transform from a validated [`firelynx_core::config::Graph`] into the
//! runtime-shaped pieces the core runner publishes: an app registry, a
//! route snapshot, per-endpoint middleware chains, and the listener set to
//! reconcile against. Building this is side-effect free — no socket is
//! bound here, no registry is swapped. The caller decides when and how to
//! publish the result.

use firelynx_core::config::{AppDef, EndpointDef, Graph, MiddlewareDef};
use firelynx_core::error::FirelynxError;
use firelynx_listener::ListenerSpec;
use firelynx_middleware::{ConsoleLoggerMiddleware, HeadersMiddleware};
use firelynx_runtime::app::builtin::EchoApp;
use firelynx_runtime::{App, AppRegistry, CompiledRoute, EndpointTable, Middleware};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Id under which a default echo app is always registered, independent of
/// whatever the config graph declares, so there's always something to
/// smoke-test a listener against.
pub const BUILTIN_ECHO_APP_ID: &str = "__builtin_echo__";

pub struct RuntimeConfig {
    pub apps: AppRegistry,
    pub routes: HashMap<String, EndpointTable>,
    pub middlewares: HashMap<String, Vec<Arc<dyn Middleware>>>,
    pub listeners: Vec<ListenerSpec>,
}

pub fn build(graph: &Graph) -> Result<RuntimeConfig, FirelynxError> {
    let apps = build_apps(graph)?;
    let middlewares = build_middlewares(graph)?;
    let routes = build_routes(graph);
    let listeners = build_listeners(graph);

    Ok(RuntimeConfig {
        apps,
        routes,
        middlewares,
        listeners,
    })
}

fn build_apps(graph: &Graph) -> Result<AppRegistry, FirelynxError> {
    let mut builder = AppRegistry::builder().register(BUILTIN_ECHO_APP_ID, Arc::new(EchoApp::new(Default::default())));

    for app in &graph.apps {
        let instance = build_app(app)?;
        builder = builder.register(app.id.clone(), instance);
    }

    Ok(builder.build())
}

fn build_app(app: &AppDef) -> Result<Arc<dyn App>, FirelynxError> {
    match app.kind.as_str() {
        "echo" => {
            let config = app
                .as_echo_config()
                .unwrap_or_else(|| Ok(Default::default()))
                .map_err(|e| FirelynxError::Validation(vec![format!("app {:?}: {e}", app.id)]))?;
            Ok(Arc::new(EchoApp::new(config)))
        }
        other => Err(FirelynxError::Validation(vec![format!(
            "app {:?}: unknown kind {other:?}",
            app.id
        )])),
    }
}

fn build_middlewares(graph: &Graph) -> Result<HashMap<String, Vec<Arc<dyn Middleware>>>, FirelynxError> {
    let mut chains = HashMap::new();
    for endpoint in &graph.endpoints {
        let mut mws: Vec<Arc<dyn Middleware>> = Vec::with_capacity(endpoint.middlewares.len());
        for mw in &endpoint.middlewares {
            mws.push(build_middleware(mw)?);
        }
        chains.insert(endpoint.id.clone(), mws);
    }
    Ok(chains)
}

fn build_middleware(mw: &MiddlewareDef) -> Result<Arc<dyn Middleware>, FirelynxError> {
    match mw.kind.as_str() {
        "headers" => {
            let config = mw
                .as_headers_config()
                .unwrap_or_else(|| Ok(Default::default()))
                .map_err(|e| FirelynxError::Validation(vec![format!("middleware {:?}: {e}", mw.id)]))?;
            Ok(Arc::new(HeadersMiddleware::new(config)))
        }
        "console_logger" => {
            let config = mw
                .as_console_logger_config()
                .unwrap_or_else(|| Ok(Default::default()))
                .map_err(|e| FirelynxError::Validation(vec![format!("middleware {:?}: {e}", mw.id)]))?;
            Ok(Arc::new(ConsoleLoggerMiddleware::new(config)))
        }
        other => Err(FirelynxError::Validation(vec![format!(
            "middleware {:?}: unknown kind {other:?}",
            other
        )])),
    }
}

fn build_routes(graph: &Graph) -> HashMap<String, EndpointTable> {
    let mut tables = HashMap::new();
    for endpoint in &graph.endpoints {
        let compiled: Vec<CompiledRoute> = endpoint
            .routes
            .iter()
            .enumerate()
            .filter_map(|(order, route)| {
                let http = route.http.as_ref()?;
                Some(CompiledRoute {
                    declaration_order: order,
                    path_prefix: http.path_prefix.as_str().to_string(),
                    method: http.method.clone(),
                    app_id: route.app_id.clone(),
                    static_data: Arc::new(route.static_data.clone()),
                })
            })
            .collect();
        tables.insert(endpoint.id.clone(), EndpointTable::new(compiled));
    }
    tables
}

fn build_listeners(graph: &Graph) -> Vec<ListenerSpec> {
    let endpoint_by_listener: HashMap<&str, &EndpointDef> = graph
        .endpoints
        .iter()
        .map(|e| (e.listener_id.as_str(), e))
        .collect();

    graph
        .listeners
        .iter()
        .filter_map(|listener| {
            let Some(endpoint) = endpoint_by_listener.get(listener.id.as_str()) else {
                warn!(listener_id = %listener.id, "listener has no owning endpoint, skipping");
                return None;
            };
            Some(ListenerSpec {
                id: listener.id.clone(),
                address: listener.address.as_str().to_string(),
                endpoint_id: endpoint.id.clone(),
                options: listener.options.clone(),
            })
        })
        .collect()
}
