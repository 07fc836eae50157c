pub mod app;
pub mod middleware;
pub mod route;

pub use app::{App, AppRegistry, AppRegistryHandle};
pub use middleware::{build_chain, Middleware, MiddlewareRegistry, Next};
pub use route::{CompiledRoute, EndpointTable, RouteRegistry};

use bytes::Bytes;

/// Request/response bodies are fully buffered — apps and middleware in this
/// gateway operate on complete in-memory bodies rather than streams, which
/// keeps the onion contract (inspect/modify before and after `next`) simple
/// for the handler kinds this gateway ships (echo, header rewriting,
/// logging). A streaming app would bypass this by reading the request body
/// itself before `firelynx-listener` ever buffers it — out of scope here.
pub type Body = Bytes;
pub type HttpRequest = http::Request<Body>;
pub type HttpResponse = http::Response<Body>;
pub type StaticData = firelynx_core::route::StaticData;
pub type FirelynxError = firelynx_core::error::FirelynxError;
