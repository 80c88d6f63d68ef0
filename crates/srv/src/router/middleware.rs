use super::Next;
use crate::handler::HandlerResult;
use crate::request::Request;
use crate::responder::Responder;
use async_trait::async_trait;
use std::fmt;

/// A stack entry that wraps everything after it.
///
/// A middleware may answer on its own, call `next.run(request)` with the same or a derived
/// request and post-process what comes back, or return `Outcome::Skip` to hand the
/// request to the entry after the enclosing router.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn call(&self, request: Request, next: Next) -> HandlerResult;
}

/// a [`Middleware`] backed by an async fn taking the request and the continuation
pub struct FnMiddleware<F> {
    f: F,
}

pub fn middleware_fn<F, Fut, R>(f: F) -> FnMiddleware<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: Responder + 'static,
{
    FnMiddleware { f }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnMiddleware")
    }
}

#[async_trait]
impl<F, Fut, R> Middleware for FnMiddleware<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: Responder + 'static,
{
    async fn call(&self, request: Request, next: Next) -> HandlerResult {
        (self.f)(request, next).await.into_result()
    }
}
