use async_trait::async_trait;
use firelynx_core::config::{HeaderOps, HeadersConfig};
use firelynx_runtime::{FirelynxError, HttpRequest, HttpResponse, Middleware, Next};
use http::{HeaderMap, HeaderName, HeaderValue};

/// Request/response header rewriting. Ops apply in fixed order
/// `remove -> set -> add`, independently for each phase. Header
/// name/value grammar is already enforced at config-validation time; any
/// op that somehow still fails to parse is skipped rather than panicking.
pub struct HeadersMiddleware {
    config: HeadersConfig,
}

impl HeadersMiddleware {
    pub fn new(config: HeadersConfig) -> Self {
        Self { config }
    }

    fn apply(ops: &HeaderOps, headers: &mut HeaderMap) {
        for name in &ops.remove {
            if let Ok(name) = HeaderName::from_bytes(name.as_bytes()) {
                headers.remove(&name);
            }
        }
        for kv in &ops.set {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(kv.name.as_bytes()),
                HeaderValue::from_str(kv.value.as_str()),
            ) {
                headers.insert(name, value);
            }
        }
        for kv in &ops.add {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(kv.name.as_bytes()),
                HeaderValue::from_str(kv.value.as_str()),
            ) {
                headers.append(name, value);
            }
        }
    }
}

#[async_trait]
impl Middleware for HeadersMiddleware {
    async fn handle(&self, mut request: HttpRequest, next: Next) -> Result<HttpResponse, FirelynxError> {
        Self::apply(&self.config.request, request.headers_mut());
        let mut response = next.run(request).await?;
        Self::apply(&self.config.response, response.headers_mut());
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firelynx_core::config::HeaderKv;
    use firelynx_core::interpolate::Interpolated;
    use firelynx_runtime::build_chain;
    use firelynx_runtime::StaticData;
    use std::sync::Arc;

    struct UpstreamApp;

    #[async_trait]
    impl firelynx_runtime::App for UpstreamApp {
        async fn handle_http(
            &self,
            _request: &HttpRequest,
            _static_data: &StaticData,
        ) -> Result<HttpResponse, FirelynxError> {
            let mut response = http::Response::builder()
                .status(200)
                .body(bytes::Bytes::new())
                .unwrap();
            response.headers_mut().insert("server", HeaderValue::from_static("foo"));
            response.headers_mut().append("set-cookie", HeaderValue::from_static("b=2"));
            Ok(response)
        }
    }

    #[tokio::test]
    async fn applies_remove_set_add_in_order_on_response_phase() {
        let config = HeadersConfig {
            request: HeaderOps::default(),
            response: HeaderOps {
                remove: vec!["Server".to_string()],
                set: vec![HeaderKv {
                    name: "X-Frame-Options".to_string(),
                    value: Interpolated::new("DENY"),
                }],
                add: vec![HeaderKv {
                    name: "Set-Cookie".to_string(),
                    value: Interpolated::new("a=1"),
                }],
            },
        };

        let chain = build_chain(
            vec![Arc::new(HeadersMiddleware::new(config))],
            Arc::new(UpstreamApp),
            Arc::new(StaticData::new()),
        );

        let request = http::Request::builder().uri("/").body(bytes::Bytes::new()).unwrap();
        let response = chain.run(request).await.unwrap();

        assert!(response.headers().get("server").is_none());
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        let cookies: Vec<_> = response
            .headers()
            .get_all("set-cookie")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(cookies, vec!["b=2", "a=1"]);
    }
}
