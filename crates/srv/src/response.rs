//! Immutable response values and their factories.
//!
//! Every factory comes in two flavors: a short one producing a `200 OK`
//! (`Response::text("hi")`) and a `_with` variant taking a [`ResponseInit`],
//! which is either a status or a status with extra headers:
//!
//! ```
//! use http::{HeaderMap, StatusCode};
//! use srv::Response;
//!
//! let created = Response::json_with(StatusCode::CREATED, &["a", "b"]).unwrap();
//! assert_eq!(created.status(), StatusCode::CREATED);
//!
//! let mut headers = HeaderMap::new();
//! headers.insert("cache-control", "no-store".parse().unwrap());
//! let uncached = Response::text_with((200_u16, headers), "fresh").unwrap();
//! assert_eq!(uncached.headers()["cache-control"], "no-store");
//! ```
//!
//! Headers given by the caller override the defaults a factory sets.

use crate::body::{ResponseBody, SharedBody};
use crate::error::{ApplyError, ArgumentError, BoxError, ResponseDefect};
use crate::request::Request;
use crate::status;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body::Body as HttpBody;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf8";
const TEXT_HTML_UTF8: &str = "text/html; charset=utf8";
const APPLICATION_JSON_UTF8: &str = "application/json; charset=utf8";
const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";

/// The payload of a [`Response`].
#[derive(Debug, Clone)]
pub enum Body {
    Buffer(Bytes),
    Stream(SharedBody),
}

impl Body {
    pub fn as_buffer(&self) -> Option<&Bytes> {
        match self {
            Body::Buffer(bytes) => Some(bytes),
            Body::Stream(_) => None,
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Body::Stream(_))
    }
}

/// The result of running a handler: a response, or a signal that the handler declined.
#[derive(Debug, Clone)]
pub enum Outcome {
    Handled(Response),
    Skip,
}

impl Outcome {
    pub const fn skip() -> Self {
        Outcome::Skip
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Outcome::Skip)
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            Outcome::Handled(response) => Some(response),
            Outcome::Skip => None,
        }
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            Outcome::Handled(response) => Some(response),
            Outcome::Skip => None,
        }
    }
}

impl From<Response> for Outcome {
    fn from(response: Response) -> Self {
        Outcome::Handled(response)
    }
}

/// Status and headers for a response factory.
///
/// Headers without a status are rejected with [`ArgumentError::HeadersWithoutStatus`].
#[derive(Debug, Clone, Default)]
pub struct ResponseInit {
    pub status: Option<u16>,
    pub headers: Option<HeaderMap>,
}

impl ResponseInit {
    fn resolve(self) -> Result<(StatusCode, HeaderMap), ArgumentError> {
        match (self.status, self.headers) {
            (None, None) => Ok((StatusCode::OK, HeaderMap::new())),
            (None, Some(_)) => Err(ArgumentError::HeadersWithoutStatus),
            (Some(code), headers) => {
                let status = StatusCode::from_u16(code).map_err(|source| ArgumentError::InvalidStatus { code, source })?;
                Ok((status, headers.unwrap_or_default()))
            }
        }
    }
}

impl From<u16> for ResponseInit {
    fn from(status: u16) -> Self {
        Self { status: Some(status), headers: None }
    }
}

impl From<StatusCode> for ResponseInit {
    fn from(status: StatusCode) -> Self {
        Self::from(status.as_u16())
    }
}

impl From<(u16, HeaderMap)> for ResponseInit {
    fn from((status, headers): (u16, HeaderMap)) -> Self {
        Self { status: Some(status), headers: Some(headers) }
    }
}

impl From<(StatusCode, HeaderMap)> for ResponseInit {
    fn from((status, headers): (StatusCode, HeaderMap)) -> Self {
        Self::from((status.as_u16(), headers))
    }
}

/// An immutable HTTP response. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: Arc<HeaderMap>,
    body: Option<Body>,
}

impl Response {
    /// Creates a response as is, only adding `content-length` to buffer bodies that lack it.
    pub fn new(status: StatusCode, mut headers: HeaderMap, body: Option<Body>) -> Self {
        if let Some(Body::Buffer(bytes)) = &body
            && !headers.contains_key(CONTENT_LENGTH)
        {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
        }
        Self { status, headers: Arc::new(headers), body }
    }

    /// A response without body.
    pub fn empty(status: StatusCode) -> Self {
        Self::new(status, HeaderMap::new(), None)
    }

    pub fn binary<B: Into<Bytes>>(bytes: B) -> Self {
        Self::with_content_type(StatusCode::OK, APPLICATION_OCTET_STREAM, HeaderMap::new(), Body::Buffer(bytes.into()))
    }

    pub fn binary_with<I, B>(init: I, bytes: B) -> Result<Self, ArgumentError>
    where
        I: Into<ResponseInit>,
        B: Into<Bytes>,
    {
        let (status, headers) = init.into().resolve()?;
        Ok(Self::with_content_type(status, APPLICATION_OCTET_STREAM, headers, Body::Buffer(bytes.into())))
    }

    /// A json response. Fails if `value` can't be serialized.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ArgumentError> {
        Self::json_with(StatusCode::OK, value)
    }

    pub fn json_with<I, T>(init: I, value: &T) -> Result<Self, ArgumentError>
    where
        I: Into<ResponseInit>,
        T: Serialize + ?Sized,
    {
        let (status, headers) = init.into().resolve()?;
        let bytes = serde_json::to_vec(value)?;
        Ok(Self::with_content_type(status, APPLICATION_JSON_UTF8, headers, Body::Buffer(bytes.into())))
    }

    /// A text response, served as html when the text starts like an html document.
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self::text_status(StatusCode::OK, text.into())
    }

    pub fn text_with<I, S>(init: I, text: S) -> Result<Self, ArgumentError>
    where
        I: Into<ResponseInit>,
        S: Into<String>,
    {
        let (status, headers) = init.into().resolve()?;
        let text = text.into();
        let content_type = text_content_type(&text);
        Ok(Self::with_content_type(status, content_type, headers, Body::Buffer(text.into())))
    }

    /// A streamed response. No `content-type` or `content-length` is set.
    pub fn stream<B>(body: B) -> Self
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Self::new(StatusCode::OK, HeaderMap::new(), Some(Body::Stream(SharedBody::new(body))))
    }

    pub fn stream_with<I, B>(init: I, body: B) -> Result<Self, ArgumentError>
    where
        I: Into<ResponseInit>,
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (status, headers) = init.into().resolve()?;
        Ok(Self::new(status, headers, Some(Body::Stream(SharedBody::new(body)))))
    }

    /// `404 Not Found` naming the requested url.
    pub fn not_found(request: &Request) -> Self {
        Self::text_status(StatusCode::NOT_FOUND, format!("Not found: {}", request.url()))
    }

    /// `302 Found` pointing at `url`. Fails if `url` is not a valid header value.
    pub fn redirect(url: &str) -> Result<Self, ArgumentError> {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_str(url)?);
        Self::text_with((StatusCode::FOUND, headers), format!("Redirecting to {url}."))
    }

    pub(crate) fn text_status(status: StatusCode, text: String) -> Self {
        let content_type = text_content_type(&text);
        Self::with_content_type(status, content_type, HeaderMap::new(), Body::Buffer(text.into()))
    }

    fn with_content_type(status: StatusCode, content_type: &'static str, overrides: HeaderMap, body: Body) -> Self {
        let mut headers = HeaderMap::with_capacity(overrides.len() + 2);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers.extend(overrides);
        Self::new(status, headers, Some(body))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Starts building a copy of this response with some fields replaced.
    pub fn derive(&self) -> DeriveResponse {
        DeriveResponse { response: self.clone(), body_replaced: false, explicit_length: false }
    }

    /// Checks whether this response can be delivered.
    pub fn defect(&self) -> Option<ResponseDefect> {
        if self.status.as_u16() > 599 {
            return Some(ResponseDefect::StatusOutOfRange(self.status.as_u16()));
        }
        match &self.body {
            Some(Body::Stream(stream)) if stream.is_consumed() => Some(ResponseDefect::ConsumedStream),
            _ => None,
        }
    }

    /// Converts into the form a transport writes to the wire.
    pub fn into_http(self) -> Result<http::Response<ResponseBody>, ApplyError> {
        let status = self.status;
        match (&self.body, status::is_body_forbidden(status)) {
            (Some(_), true) => warn!(status = status.as_u16(), "body defined on a response that must not carry one"),
            (None, false) => debug!(status = status.as_u16(), "no response body defined"),
            _ => {}
        }

        let body = match self.body {
            None => ResponseBody::empty(),
            Some(Body::Buffer(bytes)) => ResponseBody::once(bytes),
            Some(Body::Stream(stream)) => {
                ResponseBody::stream(stream.take().map_err(|source| ApplyError::ConsumedStream { status, source })?)
            }
        };

        let mut response = http::Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = Arc::unwrap_or_clone(self.headers);
        Ok(response)
    }
}

fn text_content_type(text: &str) -> &'static str {
    let starts_with = |prefix: &str| text.get(..prefix.len()).is_some_and(|head| head.eq_ignore_ascii_case(prefix));
    if starts_with("<!doctype html>") || starts_with("<html>") || starts_with("<html ") {
        TEXT_HTML_UTF8
    } else {
        TEXT_PLAIN_UTF8
    }
}

/// Builder returned by [`Response::derive`]. The source response is left untouched.
///
/// Replacing the body recomputes `content-length`, unless it was set explicitly on the builder.
#[derive(Debug)]
#[must_use]
pub struct DeriveResponse {
    response: Response,
    body_replaced: bool,
    explicit_length: bool,
}

impl DeriveResponse {
    pub fn status(mut self, status: StatusCode) -> Self {
        self.response.status = status;
        self
    }

    /// Sets one header, replacing any previous values.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        if name == CONTENT_LENGTH {
            self.explicit_length = true;
        }
        Arc::make_mut(&mut self.response.headers).insert(name, value);
        self
    }

    /// Removes every value of one header.
    pub fn remove_header(mut self, name: &HeaderName) -> Self {
        Arc::make_mut(&mut self.response.headers).remove(name);
        self
    }

    /// Replaces the whole header map.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.explicit_length = headers.contains_key(CONTENT_LENGTH);
        self.response.headers = Arc::new(headers);
        self
    }

    pub fn body(mut self, body: Option<Body>) -> Self {
        self.response.body = body;
        self.body_replaced = true;
        self
    }

    pub fn buffer<B: Into<Bytes>>(self, bytes: B) -> Self {
        self.body(Some(Body::Buffer(bytes.into())))
    }

    pub fn finish(mut self) -> Response {
        if self.body_replaced && !self.explicit_length {
            let headers = Arc::make_mut(&mut self.response.headers);
            match &self.response.body {
                Some(Body::Buffer(bytes)) => {
                    headers.insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
                }
                _ => {
                    headers.remove(CONTENT_LENGTH);
                }
            }
        }
        self.response
    }
}
