pub mod console_logger;
pub mod headers;

pub use console_logger::ConsoleLoggerMiddleware;
pub use headers::HeadersMiddleware;
