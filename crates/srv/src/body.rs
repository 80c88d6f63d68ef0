use crate::error::{BodyError, BoxError};
use bytes::Bytes;
use http_body::Body as HttpBody;
use http_body::{Frame, SizeHint};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty};
use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

/// A boxed body stream, the form every body takes once it enters the crate.
pub type BoxBody = UnsyncBoxBody<Bytes, BoxError>;

/// A body slot shared by every value derived from the same request or response.
///
/// The underlying stream can be taken exactly once. Afterwards every clone of the
/// slot reports [`BodyError::Consumed`].
#[derive(Clone)]
pub struct SharedBody {
    inner: Arc<Mutex<Option<BoxBody>>>,
}

impl SharedBody {
    pub fn new<B>(body: B) -> Self
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let body: BoxBody = body.map_err(Into::into).boxed_unsync();
        Self { inner: Arc::new(Mutex::new(Some(body))) }
    }

    pub fn empty() -> Self {
        Self::new(Empty::<Bytes>::new())
    }

    /// Takes the stream out of the slot, leaving it consumed.
    pub fn take(&self) -> Result<BoxBody, BodyError> {
        self.lock().take().ok_or(BodyError::Consumed)
    }

    pub fn is_consumed(&self) -> bool {
        self.lock().is_none()
    }

    /// Reads the whole stream into one contiguous buffer.
    pub async fn collect(&self) -> Result<Bytes, BodyError> {
        let body = self.take()?;
        let collected = body.collect().await.map_err(BodyError::read)?;
        Ok(collected.to_bytes())
    }

    fn lock(&self) -> MutexGuard<'_, Option<BoxBody>> {
        // the slot only ever holds an Option, a poisoned guard is still consistent
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SharedBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBody").field("consumed", &self.is_consumed()).finish()
    }
}

/// The body handed to the transport once a response has been applied.
pub struct ResponseBody {
    inner: Kind,
}

enum Kind {
    Once(Option<Bytes>),
    Stream(BoxBody),
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self { inner: Kind::Once(None) }
    }

    pub fn once(bytes: Bytes) -> Self {
        if bytes.is_empty() { Self::empty() } else { Self { inner: Kind::Once(Some(bytes)) } }
    }

    pub fn stream(body: BoxBody) -> Self {
        Self { inner: Kind::Stream(body) }
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Kind::Once(bytes) => f.debug_tuple("Once").field(bytes).finish(),
            Kind::Stream(_) => f.write_str("Stream"),
        }
    }
}

impl HttpBody for ResponseBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match &mut self.get_mut().inner {
            Kind::Once(option_bytes) => Poll::Ready(option_bytes.take().map(|bytes| Ok(Frame::data(bytes)))),
            Kind::Stream(box_body) => Pin::new(box_body).poll_frame(cx),
        }
    }

    fn is_end_stream(&self) -> bool {
        match &self.inner {
            Kind::Once(option_bytes) => option_bytes.is_none(),
            Kind::Stream(box_body) => box_body.is_end_stream(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.inner {
            Kind::Once(None) => SizeHint::with_exact(0),
            Kind::Once(Some(bytes)) => SizeHint::with_exact(bytes.len() as u64),
            Kind::Stream(box_body) => box_body.size_hint(),
        }
    }
}
