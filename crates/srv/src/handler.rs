use crate::error::Rejection;
use crate::request::Request;
use crate::responder::Responder;
use crate::response::Outcome;
use async_trait::async_trait;
use std::fmt;

/// What every handler, route, router and middleware produces.
pub type HandlerResult = Result<Outcome, Rejection>;

/// The leaf of the routing stack: turns a request into an [`Outcome`].
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, request: Request) -> HandlerResult;
}

/// a [`RequestHandler`] backed by an async fn
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F, Fut, R>(f: F) -> FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: Responder + 'static,
{
    FnHandler { f }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnHandler")
    }
}

#[async_trait]
impl<F, Fut, R> RequestHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: Responder + 'static,
{
    async fn invoke(&self, request: Request) -> HandlerResult {
        (self.f)(request).await.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpError;
    use crate::response::Response;
    use bytes::Bytes;
    use http_body_util::Empty;

    fn assert_is_handler<T: RequestHandler>(_handler: &T) {
        // no op
    }

    fn request() -> Request {
        Request::from_http(http::Request::builder().uri("/").body(Empty::<Bytes>::new()).unwrap())
    }

    async fn hello(_request: Request) -> Response {
        Response::text("hello")
    }

    async fn decline(_request: Request) -> Option<Response> {
        None
    }

    async fn fail(_request: Request) -> Result<Response, HttpError> {
        Err(HttpError::bad_request("bad"))
    }

    #[test]
    fn fn_is_handler() {
        assert_is_handler(&handler_fn(hello));
        assert_is_handler(&handler_fn(|_request: Request| async { Response::text("closure") }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn invoke_converts_return_values() {
        let outcome = handler_fn(hello).invoke(request()).await.unwrap();
        assert!(outcome.response().is_some());

        assert!(handler_fn(decline).invoke(request()).await.unwrap().is_skip());
        assert!(matches!(handler_fn(fail).invoke(request()).await, Err(Rejection::Http(_))));
    }
}
