//! The immutable request value handed through the routing stack.
//!
//! A [`Request`] wraps the parts of an incoming `http::Request` together with the path
//! parameters captured by routes and the extensions added by middlewares. It is never
//! mutated: [`Request::derive`] produces a copy with some fields replaced, and every copy
//! shares the same body slot.

use crate::body::{BoxBody, SharedBody};
use crate::error::{BodyError, BoxError};
use crate::query::Query;
use crate::route::PathParams;
use bytes::Bytes;
use http::uri::PathAndQuery;
use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method, Uri, Version};
use http_body::Body as HttpBody;
use once_cell::sync::OnceCell;
use std::borrow::Cow;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

/// Facts about the connection a request arrived on.
///
/// A transport puts this into the extensions of the `http::Request` it hands over;
/// [`Request::from_http`] picks it up from there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    encrypted: bool,
    remote_addr: Option<SocketAddr>,
    local_addr: Option<SocketAddr>,
}

impl ConnectionInfo {
    pub fn new(remote_addr: Option<SocketAddr>, local_addr: Option<SocketAddr>) -> Self {
        Self { encrypted: false, remote_addr, local_addr }
    }

    #[must_use]
    pub fn with_encrypted(mut self, encrypted: bool) -> Self {
        self.encrypted = encrypted;
        self
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

/// An immutable HTTP request. Cloning is cheap, all fields are shared.
#[derive(Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    version: Version,
    headers: Arc<HeaderMap>,
    params: Arc<PathParams>,
    extensions: Arc<Extensions>,
    connection: ConnectionInfo,
    body: SharedBody,
    query: Arc<OnceCell<Query>>,
}

impl Request {
    /// Wraps a raw transport request.
    pub fn from_http<B>(request: http::Request<B>) -> Self
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (mut parts, body) = request.into_parts();
        let connection = parts.extensions.remove::<ConnectionInfo>().unwrap_or_default();
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: Arc::new(parts.headers),
            params: Arc::default(),
            extensions: Arc::new(parts.extensions),
            connection,
            body: SharedBody::new(body),
            query: Arc::default(),
        }
    }

    /// Starts building a copy of this request with some fields replaced.
    pub fn derive(&self) -> DeriveRequest {
        DeriveRequest { request: self.clone() }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The request target as received: path plus query string.
    pub fn url(&self) -> &str {
        self.uri.path_and_query().map_or_else(|| self.uri.path(), PathAndQuery::as_str)
    }

    /// The path component, without the query string.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// The decoded query string. Decoded once on first access.
    pub fn query(&self) -> &Query {
        self.query.get_or_init(|| Query::parse(self.uri.query().unwrap_or_default()))
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The last value of header `name`, looked up case-insensitively.
    ///
    /// `referer` and `referrer` are interchangeable, `referrer` wins when both are present.
    /// Bytes that are not valid UTF-8 are replaced with `U+FFFD`.
    pub fn get(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get_all(name).pop()
    }

    /// Every value of header `name` in arrival order, empty if the header is absent.
    pub fn get_all(&self, name: &str) -> Vec<Cow<'_, str>> {
        let name = name.to_ascii_lowercase();
        match name.as_str() {
            "referer" | "referrer" => {
                let values = self.header_values("referrer");
                if values.is_empty() { self.header_values("referer") } else { values }
            }
            other => self.header_values(other),
        }
    }

    fn header_values(&self, name: &str) -> Vec<Cow<'_, str>> {
        self.headers.get_all(name).iter().map(|value| String::from_utf8_lossy(value.as_bytes())).collect()
    }

    /// The path parameters captured by the routes this request passed through.
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// A value previously attached with [`DeriveRequest::extension`].
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn connection(&self) -> &ConnectionInfo {
        &self.connection
    }

    pub fn is_encrypted(&self) -> bool {
        self.connection.encrypted
    }

    /// Reads the whole body. The body can be consumed only once across all derived requests.
    pub async fn buffer(&self) -> Result<Bytes, BodyError> {
        self.body.collect().await
    }

    /// Takes the body as a stream. The body can be consumed only once across all derived requests.
    pub fn stream(&self) -> Result<BoxBody, BodyError> {
        self.body.take()
    }

    pub fn is_body_consumed(&self) -> bool {
        self.body.is_consumed()
    }
}

impl<B> From<http::Request<B>> for Request
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    fn from(request: http::Request<B>) -> Self {
        Self::from_http(request)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("version", &self.version)
            .field("headers", &self.headers)
            .field("params", &self.params)
            .field("connection", &self.connection)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

/// Builder returned by [`Request::derive`]. The source request is left untouched.
#[derive(Debug)]
#[must_use]
pub struct DeriveRequest {
    request: Request,
}

impl DeriveRequest {
    pub fn method(mut self, method: Method) -> Self {
        self.request.method = method;
        self
    }

    pub fn uri(mut self, uri: Uri) -> Self {
        self.request.uri = uri;
        self.request.query = Arc::default();
        self
    }

    /// Replaces the whole header map.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.request.headers = Arc::new(headers);
        self
    }

    /// Sets one header, replacing any previous values.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        Arc::make_mut(&mut self.request.headers).insert(name, value);
        self
    }

    pub fn params(mut self, params: PathParams) -> Self {
        self.request.params = Arc::new(params);
        self
    }

    /// Attaches a typed value for downstream handlers, see [`Request::extension`].
    pub fn extension<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        Arc::make_mut(&mut self.request.extensions).insert(value);
        self
    }

    /// Gives the derived request its own body, detached from the source request.
    pub fn body<B>(mut self, body: B) -> Self
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        self.request.body = SharedBody::new(body);
        self
    }

    pub fn finish(self) -> Request {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{Empty, Full};
    use std::io;

    fn request(method: Method, uri: &str) -> Request {
        Request::from_http(http::Request::builder().method(method).uri(uri).body(Empty::<Bytes>::new()).unwrap())
    }

    #[test]
    fn basic_accessors() {
        let request = request(Method::GET, "/users/1?sort=asc&tag=a&tag=b");

        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.path(), "/users/1");
        assert_eq!(request.url(), "/users/1?sort=asc&tag=a&tag=b");
        assert_eq!(request.query().first("sort"), Some("asc"));
        assert_eq!(request.query().get_all("tag"), ["a", "b"]);
        assert!(request.params().is_empty());
        assert!(!request.is_encrypted());
    }

    #[test]
    fn query_is_decoded_once() {
        let request = request(Method::GET, "/?a=1");
        let first: *const Query = request.query();
        let second: *const Query = request.query();
        assert_eq!(first, second);

        let copy = request.clone();
        assert!(std::ptr::eq(copy.query(), request.query()));
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let raw = http::Request::builder()
            .uri("/")
            .header("X-Forwarded-For", "10.0.0.1")
            .header("accept", "text/html")
            .header("accept", "application/json")
            .body(Empty::<Bytes>::new())
            .unwrap();
        let request = Request::from_http(raw);

        assert_eq!(request.get("x-forwarded-for").as_deref(), Some("10.0.0.1"));
        assert_eq!(request.get("X-FORWARDED-FOR").as_deref(), Some("10.0.0.1"));
        assert_eq!(request.get("Accept").as_deref(), Some("application/json"));
        assert_eq!(request.get_all("accept"), ["text/html", "application/json"]);
        assert_eq!(request.get("missing").as_deref(), None);
        assert!(request.get_all("missing").is_empty());
    }

    #[test]
    fn header_values_outside_visible_ascii_are_kept() {
        let raw = http::Request::builder()
            .uri("/")
            .header("x-name", "plain")
            .header("x-name", HeaderValue::from_bytes(b"caf\xe9").unwrap())
            .body(Empty::<Bytes>::new())
            .unwrap();
        let request = Request::from_http(raw);

        assert_eq!(request.get("x-name").as_deref(), Some("caf\u{fffd}"));
        assert_eq!(request.get_all("x-name"), ["plain", "caf\u{fffd}"]);
    }

    #[test]
    fn referrer_aliases() {
        let only_referer = Request::from_http(
            http::Request::builder().uri("/").header("referer", "http://a/").body(Empty::<Bytes>::new()).unwrap(),
        );
        assert_eq!(only_referer.get("referrer").as_deref(), Some("http://a/"));
        assert_eq!(only_referer.get("Referer").as_deref(), Some("http://a/"));

        let both = Request::from_http(
            http::Request::builder()
                .uri("/")
                .header("referer", "http://a/")
                .header("referrer", "http://b/")
                .body(Empty::<Bytes>::new())
                .unwrap(),
        );
        assert_eq!(both.get("referer").as_deref(), Some("http://b/"));
        assert_eq!(both.get("referrer").as_deref(), Some("http://b/"));
    }

    #[test]
    fn derive_leaves_source_untouched() {
        let source = request(Method::GET, "/a?x=1");
        let derived = source
            .derive()
            .method(Method::POST)
            .uri(Uri::from_static("/b?y=2"))
            .header(HeaderName::from_static("x-trace"), HeaderValue::from_static("abc"))
            .extension(42_u32)
            .finish();

        assert_eq!(source.method(), Method::GET);
        assert_eq!(source.path(), "/a");
        assert_eq!(source.query().first("x"), Some("1"));
        assert_eq!(source.get("x-trace").as_deref(), None);
        assert_eq!(source.extension::<u32>(), None);

        assert_eq!(derived.method(), Method::POST);
        assert_eq!(derived.path(), "/b");
        assert_eq!(derived.query().first("y"), Some("2"));
        assert_eq!(derived.query().first("x"), None);
        assert_eq!(derived.get("x-trace").as_deref(), Some("abc"));
        assert_eq!(derived.extension::<u32>(), Some(&42));
    }

    #[test]
    fn connection_info_is_taken_from_extensions() {
        let remote: SocketAddr = "10.1.2.3:5555".parse().unwrap();
        let mut raw = http::Request::builder().uri("/").body(Empty::<Bytes>::new()).unwrap();
        raw.extensions_mut().insert(ConnectionInfo::new(Some(remote), None).with_encrypted(true));

        let request = Request::from_http(raw);
        assert!(request.is_encrypted());
        assert_eq!(request.connection().remote_addr(), Some(remote));
        assert_eq!(request.extension::<ConnectionInfo>(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn body_is_shared_by_derived_requests() {
        let raw = http::Request::builder().method(Method::POST).uri("/").body(Full::new(Bytes::from("hello"))).unwrap();
        let request = Request::from_http(raw);
        let derived = request.derive().header(http::header::HOST, HeaderValue::from_static("x")).finish();

        assert_eq!(derived.buffer().await.unwrap(), Bytes::from("hello"));
        assert!(request.is_body_consumed());
        assert!(matches!(request.buffer().await, Err(BodyError::Consumed)));
        assert!(matches!(request.stream(), Err(BodyError::Consumed)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn derived_body_is_detached() {
        let request = request(Method::POST, "/");
        let derived = request.derive().body(Full::new(Bytes::from("replaced"))).finish();

        assert_eq!(derived.buffer().await.unwrap(), Bytes::from("replaced"));
        assert!(!request.is_body_consumed());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn body_read_failure() {
        let frames: Vec<Result<http_body::Frame<Bytes>, io::Error>> =
            vec![Err(io::Error::new(io::ErrorKind::UnexpectedEof, "eof"))];
        let body = http_body_util::StreamBody::new(futures::stream::iter(frames));
        let request = Request::from_http(http::Request::builder().uri("/").body(body).unwrap());

        assert!(matches!(request.buffer().await, Err(BodyError::Read { .. })));
    }
}
