//! Adapts a handler stack to transport-level requests and responses.

use crate::body::ResponseBody;
use crate::error::{ApplyError, BoxError, Rejection};
use crate::middleware::ErrorBoundary;
use crate::request::Request;
use crate::response::{Outcome, Response};
use crate::router::{Entry, Router};
use bytes::Bytes;
use http_body::Body as HttpBody;
use thiserror::Error;
use tracing::{debug, error};

/// The entry point a transport calls for every request.
///
/// By default the stack is `[ErrorBoundary, entrypoint]`. A request nobody handles is
/// answered with `404 Not Found`.
#[derive(Debug, Clone)]
pub struct Service {
    stack: Router,
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("request was not handled: {0}")]
    Unhandled(#[source] Rejection),

    #[error(transparent)]
    Apply(#[from] ApplyError),
}

impl Service {
    pub fn new<E: Into<Entry>>(entrypoint: E) -> Self {
        Self::builder(entrypoint).build()
    }

    pub fn builder<E: Into<Entry>>(entrypoint: E) -> ServiceBuilder {
        ServiceBuilder {
            entrypoint: entrypoint.into(),
            skip_default_middlewares: false,
            error_boundary: ErrorBoundary::new(),
        }
    }

    /// The router holding the default middlewares and the entrypoint.
    pub fn stack(&self) -> &Router {
        &self.stack
    }

    /// Runs the stack, answering unhandled requests with `404 Not Found`.
    pub async fn dispatch(&self, request: Request) -> Result<Response, Rejection> {
        match self.stack.call(request.clone()).await? {
            Outcome::Handled(response) => Ok(response),
            Outcome::Skip => {
                debug!(method = %request.method(), url = request.url(), "no entry handled the request");
                Ok(Response::not_found(&request))
            }
        }
    }

    /// Handles one transport request.
    ///
    /// Fails only if a failure escapes the stack, which requires the default error boundary
    /// to be skipped, or if the response can't be applied.
    pub async fn handle<B>(&self, request: http::Request<B>) -> Result<http::Response<ResponseBody>, ServiceError>
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let response = self.dispatch(Request::from_http(request)).await.map_err(|rejection| {
            error!(cause = %rejection, "request escaped the handler stack");
            ServiceError::Unhandled(rejection)
        })?;

        response.into_http().map_err(|e| {
            error!(cause = %e, "can't apply response");
            ServiceError::Apply(e)
        })
    }
}

pub struct ServiceBuilder {
    entrypoint: Entry,
    skip_default_middlewares: bool,
    error_boundary: ErrorBoundary,
}

impl ServiceBuilder {
    /// Leaves the error boundary out, so failures reach [`Service::handle`] as [`ServiceError::Unhandled`].
    #[must_use]
    pub fn skip_default_middlewares(mut self, skip: bool) -> Self {
        self.skip_default_middlewares = skip;
        self
    }

    #[must_use]
    pub fn log_server_errors(mut self, enabled: bool) -> Self {
        self.error_boundary = self.error_boundary.log_server_errors(enabled);
        self
    }

    /// Replaces the default error boundary.
    #[must_use]
    pub fn error_boundary(mut self, error_boundary: ErrorBoundary) -> Self {
        self.error_boundary = error_boundary;
        self
    }

    pub fn build(self) -> Service {
        let mut entries = Vec::with_capacity(2);
        if !self.skip_default_middlewares {
            entries.push(Entry::middleware(self.error_boundary));
        }
        entries.push(self.entrypoint);
        let stack = Router::new(entries);
        debug!("creating service with {stack}");
        Service { stack }
    }
}

impl std::fmt::Debug for ServiceBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceBuilder")
            .field("entrypoint", &self.entrypoint)
            .field("skip_default_middlewares", &self.skip_default_middlewares)
            .field("error_boundary", &self.error_boundary)
            .finish()
    }
}
