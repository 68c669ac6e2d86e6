//! # accesslogs
//!
//! Access-log middleware for async HTTP services, plus the small
//! tokio/hyper host it plugs into.
//!
//! Every request that is not filtered out produces one line:
//!
//! ```text
//! [accesslogs] m=GET p=/users?id=5 t=412
//! ```
//!
//! Health checks, static assets and internal endpoints are usually noise.
//! Drop them by exact path, by prefix, or by the presence of a `.` in the
//! path. See [`middleware::access_log`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use accesslogs::middleware::AccessLog;
//! use accesslogs::{Method, Request, Response, Router, Server, StatusCode};
//!
//! #[tokio::main]
//! async fn main() {
//!     tracing_subscriber::fmt::init();
//!
//!     let app = Router::new()
//!         .on(Method::GET,  "/users/{id}", get_user)
//!         .on(Method::POST, "/users",      create_user)
//!         .on(Method::GET,  "/healthz",    healthz)
//!         .into_handler();
//!
//!     let app = AccessLog::new()
//!         .with_colors()
//!         .skip_paths_with_dots()
//!         .ignore_paths(["/healthz"])
//!         .wrap(app);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#))
//! }
//!
//! async fn create_user(req: Request) -> Response {
//!     if req.body().is_empty() {
//!         return Response::status(StatusCode::BAD_REQUEST);
//!     }
//!     Response::builder()
//!         .status(StatusCode::CREATED)
//!         .header("location", "/users/99")
//!         .json(r#"{"id":"99"}"#)
//! }
//!
//! async fn healthz(_req: Request) -> &'static str {
//!     "ok"
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;

pub use error::Error;
pub use handler::Handler;
pub use http::{Method, StatusCode};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
