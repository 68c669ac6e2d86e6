//! The handler abstraction every request flows through.
//!
//! Route handlers, the router itself and the access-log middleware all look
//! the same from the server's side: something that takes a [`Request`] and
//! eventually produces a [`Response`]. That shape is [`Handler`].
//!
//! Middleware composes by erasing the wrapped handler and closing over it:
//!
//! ```text
//! async fn list_users(req: Request) -> Response { … }
//!        ↓ AccessLog::new().wrap(list_users)
//! list_users.into_boxed_handler()        ← Arc<dyn ErasedHandler>
//!        ↓
//! move |req| { …; next.call(req).await } ← itself a Handler
//! ```
//!
//! Each layer costs one `Arc` clone and one virtual call per request.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future resolving to a [`Response`].
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` because it shows up in the signature of
/// [`Handler::into_boxed_handler`].
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared by every concurrent request.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid request handler.
///
/// Satisfied automatically by any function or closure shaped like
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// including the handlers returned by [`Router::into_handler`] and
/// [`AccessLog::wrap`], so layers nest freely. The trait is sealed.
///
/// [`Router::into_handler`]: crate::Router::into_handler
/// [`AccessLog::wrap`]: crate::middleware::AccessLog::wrap
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Bridges a concrete handler `F` to [`ErasedHandler`].
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}
