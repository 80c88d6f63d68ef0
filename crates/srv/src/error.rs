//! Error types used across the crate.
//!
//! - [`HttpError`]: an error carrying an explicit HTTP status
//! - [`Rejection`]: the closed failure type of request handlers and middlewares
//! - [`ArgumentError`]: invalid arguments passed to a response factory
//! - [`PathError`]: a path template that can't be compiled
//! - [`BodyError`]: a body that can't be read
//! - [`ApplyError`]: a response that can't be handed to the transport

use crate::response::Response;
use crate::status;
use http::StatusCode;
use std::io;
use thiserror::Error;

/// A type-erased error that can cross task boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An error with an explicit HTTP status.
///
/// When it reaches the error boundary the status becomes the response status. The
/// message is only shown to the client if the error is marked as exposed, which is
/// the default for client errors (`4xx`).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HttpError {
    status: StatusCode,
    message: String,
    expose: bool,
    #[source]
    source: Option<BoxError>,
}

impl HttpError {
    pub fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self { status, message: message.into(), expose: status.is_client_error(), source: None }
    }

    /// Creates an error whose message is the reason phrase of `status`.
    pub fn from_status(status: StatusCode) -> Self {
        Self::new(status, status::reason_phrase(status))
    }

    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    #[must_use]
    pub fn with_expose(mut self, expose: bool) -> Self {
        self.expose = expose;
        self
    }

    #[must_use]
    pub fn with_source<E: Into<BoxError>>(mut self, source: E) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the message may be sent to the client.
    pub fn is_exposed(&self) -> bool {
        self.expose
    }
}

/// Why a handler or middleware did not produce an [`Outcome`](crate::Outcome).
///
/// Returning `Err(Rejection::Response(..))` is the supported way to answer early from
/// deep inside a handler stack: the error boundary passes such responses through
/// untouched. Every other variant is classified into an error response.
#[derive(Debug, Error)]
pub enum Rejection {
    #[error("early response with status {}", .0.status())]
    Response(Response),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Other(#[from] BoxError),
}

impl Rejection {
    pub fn other<E: Into<BoxError>>(error: E) -> Self {
        Self::Other(error.into())
    }
}

impl From<Response> for Rejection {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

impl From<io::Error> for Rejection {
    fn from(e: io::Error) -> Self {
        Self::Other(Box::new(e))
    }
}

impl From<BodyError> for Rejection {
    fn from(e: BodyError) -> Self {
        Self::Other(Box::new(e))
    }
}

impl From<ArgumentError> for Rejection {
    fn from(e: ArgumentError) -> Self {
        Self::Other(Box::new(e))
    }
}

impl From<serde_json::Error> for Rejection {
    fn from(e: serde_json::Error) -> Self {
        Self::Other(Box::new(e))
    }
}

#[derive(Debug, Error)]
pub enum ArgumentError {
    #[error("invalid status code: {code}")]
    InvalidStatus {
        code: u16,
        #[source]
        source: http::status::InvalidStatusCode,
    },

    #[error("response headers given without a status code")]
    HeadersWithoutStatus,

    #[error("invalid header value: {source}")]
    InvalidHeader {
        #[from]
        source: http::header::InvalidHeaderValue,
    },

    #[error("value can't be encoded as json: {source}")]
    Unserializable {
        #[from]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum PathError {
    #[error("unbalanced group at position {position} in path template '{template}'")]
    UnbalancedGroup { template: String, position: usize },

    #[error("empty group at position {position} in path template '{template}'")]
    EmptyGroup { template: String, position: usize },

    #[error("invalid pattern in path template '{template}': {source}")]
    InvalidPattern {
        template: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Error)]
pub enum BodyError {
    #[error("body has been consumed")]
    Consumed,

    #[error("read body error: {source}")]
    Read { source: BoxError },
}

impl BodyError {
    pub fn read<E: Into<BoxError>>(e: E) -> Self {
        Self::Read { source: e.into() }
    }
}

/// A response that can't be delivered as it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResponseDefect {
    #[error("status {0} is outside of 100..=599")]
    StatusOutOfRange(u16),

    #[error("stream body has already been consumed")]
    ConsumedStream,
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("can't apply the {status} response: {source}")]
    ConsumedStream {
        status: StatusCode,
        #[source]
        source: BodyError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_exposed_by_default() {
        assert!(HttpError::unauthorized("go away").is_exposed());
        assert!(!HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, "boom").is_exposed());
        assert!(HttpError::new(StatusCode::BAD_GATEWAY, "upstream").with_expose(true).is_exposed());
    }

    #[test]
    fn from_status_uses_reason_phrase() {
        let error = HttpError::from_status(StatusCode::FORBIDDEN);
        assert_eq!(error.message(), "Forbidden");
        assert_eq!(error.to_string(), "Forbidden");
    }

    #[test]
    fn source_is_kept() {
        let error = HttpError::not_found("no such user").with_source(io::Error::other("db"));
        let source = std::error::Error::source(&error).unwrap();
        assert_eq!(source.to_string(), "db");
    }

    #[test]
    fn io_errors_become_other() {
        let rejection = Rejection::from(io::Error::new(io::ErrorKind::NotFound, "missing"));
        assert!(matches!(rejection, Rejection::Other(_)));
        assert_eq!(rejection.to_string(), "missing");
    }
}
