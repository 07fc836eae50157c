use crate::timeout_io::IdleTimeoutListener;
use axum::error_handling::HandleErrorLayer;
use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use firelynx_core::config::ListenerOptions;
use firelynx_core::error::FirelynxError;
use firelynx_observability::MetricsCollector;
use firelynx_runtime::{AppRegistryHandle, MiddlewareRegistry, RouteRegistry};
use http_body_util::BodyExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener as TokioTcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info, warn};

/// Static description of one listener, as produced by the reload pipeline.
#[derive(Debug, Clone)]
pub struct ListenerSpec {
    pub id: String,
    pub address: String,
    pub endpoint_id: String,
    pub options: ListenerOptions,
}

struct DispatchContext {
    endpoint_id: String,
    routes: Arc<RouteRegistry>,
    apps: Arc<AppRegistryHandle>,
    middlewares: Arc<MiddlewareRegistry>,
    metrics: Arc<MetricsCollector>,
}

/// Owns one bound socket for the lifetime of the process, or until told to
/// stop. Route/app/middleware state is not owned here — it lives in the
/// shared registries and is re-read on every request, so a reload never
/// requires rebinding the socket.
pub struct Listener {
    spec: ListenerSpec,
    routes: Arc<RouteRegistry>,
    apps: Arc<AppRegistryHandle>,
    middlewares: Arc<MiddlewareRegistry>,
    metrics: Arc<MetricsCollector>,
}

impl Listener {
    pub fn new(
        spec: ListenerSpec,
        routes: Arc<RouteRegistry>,
        apps: Arc<AppRegistryHandle>,
        middlewares: Arc<MiddlewareRegistry>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self { spec, routes, apps, middlewares, metrics }
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn address(&self) -> &str {
        &self.spec.address
    }

    pub fn spec(&self) -> &ListenerSpec {
        &self.spec
    }

    /// Installs a brand-new route set for this listener's endpoint. Since
    /// the route registry is shared across listeners keyed by endpoint id,
    /// this republishes the whole endpoint -> table map; `reload` is an
    /// alias kept for symmetry with the wrapper's documented contract.
    pub fn update_routes(&self, tables: HashMap<String, firelynx_runtime::EndpointTable>) {
        self.routes.publish(tables);
    }

    pub fn reload(&self, tables: HashMap<String, firelynx_runtime::EndpointTable>) {
        self.update_routes(tables);
    }

    /// Builds the request-serving stack. A request budget (`read_timeout +
    /// write_timeout`) is applied as a single layer around the whole
    /// service call: `dispatch` fully buffers the request body before
    /// handling it and fully buffers the response before writing it, so
    /// there is no separate read-phase/write-phase boundary to hang two
    /// independent timeouts off of. Keep-alive idle time between requests is
    /// bounded separately, at the socket layer — see `spawn`.
    fn build_router(&self) -> axum::Router {
        let ctx = Arc::new(DispatchContext {
            endpoint_id: self.spec.endpoint_id.clone(),
            routes: self.routes.clone(),
            apps: self.apps.clone(),
            middlewares: self.middlewares.clone(),
            metrics: self.metrics.clone(),
        });
        let request_budget = self.spec.options.read_timeout + self.spec.options.write_timeout;
        axum::Router::new().fallback(dispatch).with_state(ctx).layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .layer(TimeoutLayer::new(request_budget)),
        )
    }

    /// Spawns the accept loop on the current runtime and returns a handle
    /// that can later drain and stop it. Binding happens here, synchronously
    /// relative to the caller, so a failing bind surfaces before the
    /// listener is considered started.
    pub async fn spawn(self: Arc<Self>) -> Result<ListenerHandle, FirelynxError> {
        let tcp = TokioTcpListener::bind(&self.spec.address)
            .await
            .map_err(|source| FirelynxError::Bind {
                listener_id: self.spec.id.clone(),
                address: self.spec.address.clone(),
                source,
            })?;
        info!(listener_id = %self.spec.id, address = %self.spec.address, "listener bound");

        let idle_listener = IdleTimeoutListener::new(tcp, self.spec.options.idle_timeout);
        let router = self.build_router();
        let shutdown = Arc::new(Notify::new());
        let shutdown_for_serve = shutdown.clone();
        let listener_id = self.spec.id.clone();

        let join = tokio::spawn(async move {
            let result = axum::serve(idle_listener, router.into_make_service())
                .with_graceful_shutdown(async move {
                    shutdown_for_serve.notified().await;
                })
                .await;
            if let Err(err) = &result {
                error!(listener_id = %listener_id, error = %err, "listener accept loop ended with an error");
            }
            result.map_err(|e| FirelynxError::Handler(e.to_string()))
        });

        Ok(ListenerHandle {
            id: self.spec.id.clone(),
            shutdown,
            join,
            drain_timeout: self.spec.options.drain_timeout,
        })
    }
}

async fn handle_timeout_error(err: tower::BoxError) -> Response {
    if err.is::<tower::timeout::error::Elapsed>() {
        (http::StatusCode::REQUEST_TIMEOUT, "request exceeded read_timeout + write_timeout").into_response()
    } else {
        (http::StatusCode::INTERNAL_SERVER_ERROR, format!("unhandled error: {err}")).into_response()
    }
}

async fn dispatch(State(ctx): State<Arc<DispatchContext>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            return (http::StatusCode::BAD_REQUEST, format!("failed to read request body: {err}"))
                .into_response();
        }
    };

    let method = parts.method.clone();
    let path = parts.uri.path().to_string();

    let Some(route) = ctx.routes.dispatch(&ctx.endpoint_id, method.as_str(), &path) else {
        ctx.metrics.record_dispatch(&ctx.endpoint_id, 404);
        return (http::StatusCode::NOT_FOUND, "no route matched").into_response();
    };

    let Some(app) = ctx.apps.get(&route.app_id) else {
        error!(app_id = %route.app_id, "dispatched route references an app missing from the registry");
        ctx.metrics.record_dispatch(&ctx.endpoint_id, 500);
        return (http::StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response();
    };

    let middlewares = ctx.middlewares.get(&ctx.endpoint_id);
    let chain = firelynx_runtime::build_chain(middlewares, app, route.static_data.clone());

    let firelynx_request = http::Request::from_parts(parts, bytes);
    match chain.run(firelynx_request).await {
        Ok(response) => {
            ctx.metrics.record_dispatch(&ctx.endpoint_id, response.status().as_u16());
            let (resp_parts, resp_body) = response.into_parts();
            Response::from_parts(resp_parts, axum::body::Body::from(resp_body))
        }
        Err(err) => {
            let status = http::StatusCode::from_u16(err.status_code()).unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
            ctx.metrics.record_dispatch(&ctx.endpoint_id, status.as_u16());
            (status, axum::body::Bytes::from(err.to_json_body())).into_response()
        }
    }
}

/// Handle to a running listener. `stop` requests a graceful drain and forces
/// the accept loop down if it hasn't finished within `drain_timeout`.
pub struct ListenerHandle {
    id: String,
    shutdown: Arc<Notify>,
    join: JoinHandle<Result<(), FirelynxError>>,
    drain_timeout: Duration,
}

impl ListenerHandle {
    pub async fn stop(self) -> Result<(), FirelynxError> {
        let abort = self.join.abort_handle();
        self.shutdown.notify_one();
        match tokio::time::timeout(self.drain_timeout, self.join).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) if join_err.is_cancelled() => Ok(()),
            Ok(Err(join_err)) => Err(FirelynxError::Handler(join_err.to_string())),
            Err(_elapsed) => {
                warn!(listener_id = %self.id, "drain timeout elapsed, forcing listener down");
                abort.abort();
                Ok(())
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
