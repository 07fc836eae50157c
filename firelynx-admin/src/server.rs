use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use firelynx_observability::MetricsCollector;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Flips once from `false` to `true` the moment the first config generation
/// has been published; readiness checks observe it, nothing ever resets it
/// back — a gateway that's served one generation is never "not ready"
/// again, even mid-reload.
#[derive(Clone, Default)]
pub struct Readiness(Arc<AtomicBool>);

impl Readiness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_ready(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Clone)]
struct AppState {
    metrics: Arc<MetricsCollector>,
    readiness: Readiness,
}

/// Health/readiness/metrics HTTP surface. Deliberately has no route or app
/// configuration endpoints — config changes flow in through the loader and
/// adapter, never through this server.
pub struct AdminServer {
    address: String,
    state: AppState,
}

impl AdminServer {
    pub fn new(address: impl Into<String>, metrics: Arc<MetricsCollector>, readiness: Readiness) -> Self {
        Self {
            address: address.into(),
            state: AppState { metrics, readiness },
        }
    }

    fn build_router(&self) -> axum::Router {
        axum::Router::new()
            .route("/healthz", get(healthz))
            .route("/readyz", get(readyz))
            .route("/metrics", get(metrics_handler))
            .with_state(self.state.clone())
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.address).await?;
        info!(address = %self.address, "admin surface listening");
        axum::serve(listener, self.build_router()).await?;
        Ok(())
    }
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    if state.readiness.is_ready() {
        (http::StatusCode::OK, "ready")
    } else {
        (http::StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.gather_text(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use tower::ServiceExt;

    fn server() -> AdminServer {
        AdminServer::new("127.0.0.1:0", Arc::new(MetricsCollector::default()), Readiness::new())
    }

    #[tokio::test]
    async fn healthz_is_always_ok() {
        let router = server().build_router();
        let response = router
            .oneshot(http::Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
    }

    #[tokio::test]
    async fn readyz_is_503_before_first_publish() {
        let router = server().build_router();
        let response = router
            .oneshot(http::Request::builder().uri("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn readyz_is_200_after_mark_ready() {
        let readiness = Readiness::new();
        readiness.mark_ready();
        let server = AdminServer::new("127.0.0.1:0", Arc::new(MetricsCollector::default()), readiness);
        let router = server.build_router();
        let response = router
            .oneshot(http::Request::builder().uri("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_endpoint_exposes_registered_series() {
        let router = server().build_router();
        let response = router
            .oneshot(http::Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
    }
}
