//! Small JSON API behind the access-log middleware.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42?fields=name   # logged
//!   curl -X POST http://localhost:3000/users -d '{"name":"alice"}'
//!   curl http://localhost:3000/healthz                 # not logged
//!   curl http://localhost:3000/favicon.ico             # not logged, 404
//!   curl http://localhost:3000/internal/stats          # not logged

use accesslogs::middleware::AccessLog;
use accesslogs::{Method, Request, Response, Router, Server, StatusCode};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let app = Router::new()
        .on(Method::GET,    "/users/{id}",     get_user)
        .on(Method::POST,   "/users",          create_user)
        .on(Method::DELETE, "/users/{id}",     delete_user)
        .on(Method::GET,    "/healthz",        healthz)
        .on(Method::GET,    "/internal/stats", stats)
        .into_handler();

    let app = AccessLog::new()
        .with_colors()
        .skip_paths_with_dots()
        .ignore_paths(["/healthz"])
        .ignore_path_prefixes(["/internal/"])
        .wrap(app);

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#))
}

async fn create_user(req: Request) -> Response {
    if req.body().is_empty() {
        return Response::status(StatusCode::BAD_REQUEST);
    }

    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(r#"{"id":"99","name":"new_user"}"#)
}

async fn delete_user(_req: Request) -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn healthz(_req: Request) -> &'static str {
    "ok"
}

async fn stats(_req: Request) -> Response {
    Response::json(r#"{"requests":0}"#)
}
