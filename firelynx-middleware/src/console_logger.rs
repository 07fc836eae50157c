use async_trait::async_trait;
use firelynx_core::config::{ConsoleLoggerConfig, LogFormat, LoggerPreset};
use firelynx_runtime::{FirelynxError, HttpRequest, HttpResponse, Middleware, Next};
use std::time::Instant;

struct PresetDefaults {
    status: bool,
    latency: bool,
    headers: bool,
    query: bool,
    request_body: bool,
    response_body: bool,
    remote_addr: bool,
}

fn defaults_for(preset: LoggerPreset) -> PresetDefaults {
    match preset {
        LoggerPreset::Minimal => PresetDefaults {
            status: true,
            latency: false,
            headers: false,
            query: false,
            request_body: false,
            response_body: false,
            remote_addr: false,
        },
        LoggerPreset::Standard => PresetDefaults {
            status: true,
            latency: true,
            headers: false,
            query: true,
            request_body: false,
            response_body: false,
            remote_addr: true,
        },
        LoggerPreset::Detailed => PresetDefaults {
            status: true,
            latency: true,
            headers: true,
            query: true,
            request_body: false,
            response_body: false,
            remote_addr: true,
        },
        LoggerPreset::Debug => PresetDefaults {
            status: true,
            latency: true,
            headers: true,
            query: true,
            request_body: true,
            response_body: true,
            remote_addr: true,
        },
    }
}

/// Emits one structured access-log record per request. Filters run first
/// and skip logging entirely (but never skip dispatch); body capture is
/// bounded by `max_body_size` and never alters what reaches the client,
/// since bodies here are already-buffered `Bytes` and sampling is just a
/// cheap, refcounted slice.
pub struct ConsoleLoggerMiddleware {
    config: ConsoleLoggerConfig,
}

impl ConsoleLoggerMiddleware {
    pub fn new(config: ConsoleLoggerConfig) -> Self {
        Self { config }
    }

    fn passes_filters(&self, method: &str, path: &str) -> bool {
        if self.config.exclude_paths.iter().any(|p| path.starts_with(p.as_str())) {
            return false;
        }
        if !self.config.include_paths.is_empty()
            && !self.config.include_paths.iter().any(|p| path.starts_with(p.as_str()))
        {
            return false;
        }
        if self
            .config
            .exclude_methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(method))
        {
            return false;
        }
        if !self.config.include_methods.is_empty()
            && !self.config.include_methods.iter().any(|m| m.eq_ignore_ascii_case(method))
        {
            return false;
        }
        true
    }

    fn sample(&self, body: &bytes::Bytes) -> String {
        let end = body.len().min(self.config.max_body_size);
        String::from_utf8_lossy(&body[..end]).into_owned()
    }
}

#[async_trait]
impl Middleware for ConsoleLoggerMiddleware {
    async fn handle(&self, request: HttpRequest, next: Next) -> Result<HttpResponse, FirelynxError> {
        let method = request.method().to_string();
        let path = request.uri().path().to_string();
        if !self.passes_filters(&method, &path) {
            return next.run(request).await;
        }

        let defaults = defaults_for(self.config.preset);
        let want_query = self.config.fields.query.unwrap_or(defaults.query);
        let want_headers = self.config.fields.headers.unwrap_or(defaults.headers);
        let want_req_body = self.config.fields.request_body.unwrap_or(defaults.request_body);
        let want_latency = self.config.fields.latency.unwrap_or(defaults.latency);
        let want_status = self.config.fields.status.unwrap_or(defaults.status);
        let want_resp_body = self.config.fields.response_body.unwrap_or(defaults.response_body);

        let query = if want_query {
            request.uri().query().unwrap_or("").to_string()
        } else {
            String::new()
        };
        let request_headers = if want_headers {
            format!("{:?}", request.headers())
        } else {
            String::new()
        };
        let request_body = if want_req_body {
            self.sample(request.body())
        } else {
            String::new()
        };

        let started = Instant::now();
        let response = next.run(request).await?;
        let latency_ms = if want_latency {
            started.elapsed().as_secs_f64() * 1000.0
        } else {
            0.0
        };
        let status = if want_status { response.status().as_u16() } else { 0 };
        let response_body = if want_resp_body {
            self.sample(response.body())
        } else {
            String::new()
        };

        match self.config.format {
            LogFormat::Json => {
                let record = serde_json::json!({
                    "method": method,
                    "path": path,
                    "query": query,
                    "status": status,
                    "latency_ms": latency_ms,
                    "request_headers": request_headers,
                    "request_body": request_body,
                    "response_body": response_body,
                });
                tracing::info!(target: "firelynx::access_log", "{}", record);
            }
            LogFormat::Text => {
                tracing::info!(
                    target: "firelynx::access_log",
                    method = %method,
                    path = %path,
                    query = %query,
                    status = status,
                    latency_ms = latency_ms,
                    request_headers = %request_headers,
                    request_body = %request_body,
                    response_body = %response_body,
                    "access log",
                );
            }
        }

        Ok(response)
    }
}
