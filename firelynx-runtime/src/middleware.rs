use crate::{App, FirelynxError, HttpRequest, HttpResponse, StaticData};
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The rest of the chain, bundled as a single callable. A middleware that
/// wants to short-circuit simply never calls it.
#[derive(Clone)]
pub struct Next {
    inner: Arc<dyn Fn(HttpRequest) -> BoxFuture<'static, Result<HttpResponse, FirelynxError>> + Send + Sync>,
}

impl Next {
    pub async fn run(&self, request: HttpRequest) -> Result<HttpResponse, FirelynxError> {
        (self.inner)(request).await
    }
}

/// A request/response wrapper composed in declaration order around an app.
/// May inspect/modify the request before calling `next`, short-circuit
/// without calling it, or inspect/modify the response as it unwinds.
/// Middlewares never see or alter which route was selected.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, request: HttpRequest, next: Next) -> Result<HttpResponse, FirelynxError>;
}

/// Compiles `[A, B, C]` plus app `H` into a single callable implementing
/// `A -> B -> C -> H` on the way in and `H -> C -> B -> A` on the way out,
/// by folding from the innermost (the app) outward.
pub fn build_chain(
    middlewares: Vec<Arc<dyn Middleware>>,
    app: Arc<dyn App>,
    static_data: Arc<StaticData>,
) -> Next {
    let terminal: Next = Next {
        inner: Arc::new(move |request: HttpRequest| {
            let app = app.clone();
            let static_data = static_data.clone();
            Box::pin(async move { app.handle_http(&request, &static_data).await })
        }),
    };

    middlewares.into_iter().rev().fold(terminal, |next, mw| Next {
        inner: Arc::new(move |request: HttpRequest| {
            let mw = mw.clone();
            let next = next.clone();
            Box::pin(async move { mw.handle(request, next).await })
        }),
    })
}

/// Snapshot published atomically on every reload: `endpointId -> middleware
/// chain`. Separate from [`crate::route::RouteRegistry`] because the chain
/// is shared by every route within an endpoint, while routing is per-route.
pub struct MiddlewareRegistry {
    snapshot: arc_swap::ArcSwap<HashMap<String, Vec<Arc<dyn Middleware>>>>,
}

impl Default for MiddlewareRegistry {
    fn default() -> Self {
        Self {
            snapshot: arc_swap::ArcSwap::new(Arc::new(HashMap::new())),
        }
    }
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, chains: HashMap<String, Vec<Arc<dyn Middleware>>>) {
        self.snapshot.store(Arc::new(chains));
    }

    pub fn get(&self, endpoint_id: &str) -> Vec<Arc<dyn Middleware>> {
        self.snapshot.load().get(endpoint_id).cloned().unwrap_or_default()
    }
}
