//! Middleware layer.
//!
//! A middleware is a function from one [`Handler`](crate::Handler) to
//! another. It sees every request before the wrapped handler does and every
//! response after, which makes it the place for cross-cutting concerns.
//!
//! Built-in middleware:
//! - [`access_log`]: one line per request with method, path and latency,
//!   with exact, prefix and static-asset filters.

pub mod access_log;

pub use access_log::{AccessLog, Config, LogSink, TracingSink};
