use crate::error::{HttpError, Rejection, ResponseDefect};
use crate::handler::HandlerResult;
use crate::request::Request;
use crate::response::{Outcome, Response};
use crate::router::{Middleware, Next};
use crate::status;
use async_trait::async_trait;
use futures::FutureExt;
use http::{Method, StatusCode};
use std::any::Any;
use std::error::Error;
use std::fmt;
use std::io;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

/// Receives every server error the boundary turns into a response.
pub type ErrorReporter = Arc<dyn Fn(StatusCode, &(dyn Error + 'static)) + Send + Sync>;

/// Turns every failure of the entries after it into an error response.
///
/// - a `Rejection::Response` is returned as is
/// - an [`HttpError`] keeps its status, the message is sent only if exposed
/// - an [`io::Error`] of kind `NotFound` anywhere in the source chain becomes `404`
/// - anything else, including a panic, becomes `500`
///
/// Unexposed errors answer with `"<code> <reason phrase>"`. Server errors (`5xx`) are
/// reported once, through `tracing` or the reporter given to [`ErrorBoundary::on_server_error`].
/// An `HttpError` status above 599 is answered as `500`.
///
/// A response that can't be delivered (status above 599, stream already consumed), whether
/// handled or thrown, is replaced with a `500` describing the offending handler.
#[derive(Clone)]
pub struct ErrorBoundary {
    log_server_errors: bool,
    reporter: Option<ErrorReporter>,
}

impl ErrorBoundary {
    pub fn new() -> Self {
        Self { log_server_errors: true, reporter: None }
    }

    /// Turns reporting of server errors on or off.
    #[must_use]
    pub fn log_server_errors(mut self, enabled: bool) -> Self {
        self.log_server_errors = enabled;
        self
    }

    /// Reports server errors to `reporter` instead of the `tracing` log.
    #[must_use]
    pub fn on_server_error<F>(mut self, reporter: F) -> Self
    where
        F: Fn(StatusCode, &(dyn Error + 'static)) + Send + Sync + 'static,
    {
        self.reporter = Some(Arc::new(reporter));
        self
    }

    /// Converts a rejection into the response sent to the client.
    pub fn recover(&self, rejection: Rejection) -> Response {
        self.settle(None, rejection)
    }

    fn settle(&self, origin: Option<(&Method, &str)>, rejection: Rejection) -> Response {
        match rejection {
            Rejection::Response(response) => self.deliverable(origin, response),
            Rejection::Http(e) => self.respond_with(&e),
            Rejection::Other(e) => self.respond_with(&*e),
        }
    }

    fn deliverable(&self, origin: Option<(&Method, &str)>, response: Response) -> Response {
        match response.defect() {
            Some(defect) => self.malformed(origin, &response, defect),
            None => response,
        }
    }

    fn respond_with(&self, error: &(dyn Error + 'static)) -> Response {
        let (status, exposed) = classify(error);
        if status.is_server_error() {
            self.report(status, error);
        }
        let text = exposed.unwrap_or_else(|| status::status_text(status));
        Response::text_status(status, text)
    }

    fn report(&self, status: StatusCode, error: &(dyn Error + 'static)) {
        if !self.log_server_errors {
            return;
        }
        match &self.reporter {
            Some(reporter) => reporter(status, error),
            None => error!(status = status.as_u16(), cause = %chain(error), detail = ?error, "server error"),
        }
    }

    fn malformed(&self, origin: Option<(&Method, &str)>, response: &Response, defect: ResponseDefect) -> Response {
        self.report(StatusCode::INTERNAL_SERVER_ERROR, &defect);
        let handler = match origin {
            Some((method, url)) => format!("the handler for {method} {url}"),
            None => String::from("a handler"),
        };
        let message = format!("Internal error: {handler} produced a malformed response ({defect}): {response:?}");
        Response::text_status(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl Default for ErrorBoundary {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ErrorBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorBoundary")
            .field("log_server_errors", &self.log_server_errors)
            .field("custom_reporter", &self.reporter.is_some())
            .finish()
    }
}

#[async_trait]
impl Middleware for ErrorBoundary {
    async fn call(&self, request: Request, next: Next) -> HandlerResult {
        let method = request.method().clone();
        let url = request.url().to_owned();
        let origin = Some((&method, url.as_str()));

        match AssertUnwindSafe(next.run(request)).catch_unwind().await {
            Ok(Ok(Outcome::Handled(response))) => Ok(Outcome::Handled(self.deliverable(origin, response))),
            Ok(Ok(Outcome::Skip)) => Ok(Outcome::Skip),
            Ok(Err(rejection)) => Ok(Outcome::Handled(self.settle(origin, rejection))),
            Err(payload) => {
                let panicked = Panicked::from_payload(payload.as_ref());
                Ok(Outcome::Handled(self.respond_with(&panicked)))
            }
        }
    }
}

#[derive(Debug, Error)]
#[error("request handler panicked: {message}")]
struct Panicked {
    message: String,
}

impl Panicked {
    fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| String::from("non-string panic payload"));
        Self { message }
    }
}

fn classify(error: &(dyn Error + 'static)) -> (StatusCode, Option<String>) {
    if let Some(http_error) = error.downcast_ref::<HttpError>() {
        if http_error.status().as_u16() > 599 {
            return (StatusCode::INTERNAL_SERVER_ERROR, None);
        }
        let exposed = http_error.is_exposed().then(|| http_error.message().to_owned());
        return (http_error.status(), exposed);
    }
    if is_not_found(error) {
        return (StatusCode::NOT_FOUND, None);
    }
    (StatusCode::INTERNAL_SERVER_ERROR, None)
}

fn is_not_found(error: &(dyn Error + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(e) = current {
        if e.downcast_ref::<io::Error>().is_some_and(|io_error| io_error.kind() == io::ErrorKind::NotFound) {
            return true;
        }
        current = e.source();
    }
    false
}

fn chain(error: &(dyn Error + 'static)) -> String {
    let mut text = error.to_string();
    let mut current = error.source();
    while let Some(e) = current {
        text.push_str(": ");
        text.push_str(&e.to_string());
        current = e.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BodyError;
    use crate::response::Body;

    fn text_of(response: &Response) -> &str {
        std::str::from_utf8(response.body().and_then(Body::as_buffer).unwrap()).unwrap()
    }

    #[test]
    fn early_responses_pass_through() {
        let early = Response::json_with(401_u16, &serde_json::json!({"failed": true})).unwrap();
        let response = ErrorBoundary::new().recover(Rejection::from(early));
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(text_of(&response), r#"{"failed":true}"#);
    }

    #[test]
    fn exposed_http_errors_show_their_message() {
        let response = ErrorBoundary::new().recover(HttpError::unauthorized("Unauthorized!!").into());
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(text_of(&response), "Unauthorized!!");
    }

    #[test]
    fn hidden_http_errors_show_status_text() {
        let boundary = ErrorBoundary::new().log_server_errors(false);

        let response = boundary.recover(HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, "db password wrong").into());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(text_of(&response), "500 Internal Server Error");

        let response = boundary.recover(HttpError::new(StatusCode::FORBIDDEN, "secret").with_expose(false).into());
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(text_of(&response), "403 Forbidden");
    }

    #[test]
    fn boxed_http_errors_are_recognized() {
        let rejection = Rejection::other(HttpError::new(StatusCode::CONFLICT, "taken"));
        let response = ErrorBoundary::new().recover(rejection);
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(text_of(&response), "taken");
    }

    #[test]
    fn missing_files_are_not_found() {
        let direct = Rejection::from(io::Error::new(io::ErrorKind::NotFound, "no such file"));
        let response = ErrorBoundary::new().recover(direct);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(text_of(&response), "404 Not Found");

        let nested = Rejection::from(BodyError::read(io::Error::new(io::ErrorKind::NotFound, "gone")));
        assert_eq!(ErrorBoundary::new().recover(nested).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn other_errors_are_internal_and_reported() {
        let reported = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&reported);
        let boundary = ErrorBoundary::new().on_server_error(move |status, error| {
            sink.lock().unwrap().push((status, error.to_string()));
        });

        let response = boundary.recover(Rejection::from(io::Error::other("disk on fire")));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(text_of(&response), "500 Internal Server Error");

        boundary.recover(HttpError::bad_request("client problem").into());

        let reported = reported.lock().unwrap();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0], (StatusCode::INTERNAL_SERVER_ERROR, String::from("disk on fire")));
    }

    #[test]
    fn reporting_can_be_disabled() {
        let reported = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&reported);
        let boundary = ErrorBoundary::new()
            .on_server_error(move |_, _| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            })
            .log_server_errors(false);

        boundary.recover(Rejection::from(io::Error::other("quiet")));
        assert_eq!(reported.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn out_of_range_statuses_become_internal_errors() {
        let reported = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&reported);
        let boundary = ErrorBoundary::new().on_server_error(move |status, _| {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        let status = StatusCode::from_u16(700).unwrap();
        let response = boundary.recover(HttpError::new(status, "beyond").with_expose(true).into());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(text_of(&response), "500 Internal Server Error");
        assert_eq!(response.defect(), None);
        assert_eq!(reported.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn thrown_responses_are_checked() {
        let consumed = Response::stream(http_body_util::Empty::<bytes::Bytes>::new());
        let Some(Body::Stream(stream)) = consumed.body() else { panic!("expected a stream body") };
        let _taken = stream.take().unwrap();

        let response = ErrorBoundary::new().log_server_errors(false).recover(Rejection::from(consumed));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(text_of(&response).starts_with("Internal error: a handler produced a malformed response"));
    }

    #[test]
    fn panic_payloads() {
        let boxed: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(Panicked::from_payload(boxed.as_ref()).message, "static message");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(Panicked::from_payload(boxed.as_ref()).message, "owned message");

        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(Panicked::from_payload(boxed.as_ref()).message, "non-string panic payload");
    }

    #[test]
    fn error_chain_text() {
        let error = HttpError::new(StatusCode::BAD_GATEWAY, "upstream failed").with_source(io::Error::other("refused"));
        assert_eq!(chain(&error), "upstream failed: refused");
    }
}
