use crate::error::{BindError, BoxError};
use bytes::Bytes;
use http_body::Body as HttpBody;
use http_body::{Frame, SizeHint};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::Mutex;

/// The request body handed over by the transport
pub type ReqBody = UnsyncBoxBody<Bytes, BoxError>;

/// Creates a request body holding `bytes`
pub fn full_body(bytes: impl Into<Bytes>) -> ReqBody {
    Full::new(bytes.into()).map_err(|never| match never {}).boxed_unsync()
}

/// Creates an empty request body
pub fn empty_body() -> ReqBody {
    Empty::<Bytes>::new().map_err(|never| match never {}).boxed_unsync()
}

/// Holds the request body until somebody consumes it, the body can only be read once
pub struct OptionReqBody {
    inner: Mutex<Option<ReqBody>>,
}

impl From<ReqBody> for OptionReqBody {
    fn from(body: ReqBody) -> Self {
        OptionReqBody { inner: Mutex::new(Some(body)) }
    }
}

impl fmt::Debug for OptionReqBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionReqBody").finish_non_exhaustive()
    }
}

impl OptionReqBody {
    pub async fn can_consume(&self) -> bool {
        let guard = self.inner.lock().await;
        guard.is_some()
    }

    /// Reads the whole body, fails when it has been consumed before
    pub async fn collect_bytes(&self) -> Result<Bytes, BindError> {
        let req_body = self.inner.lock().await.take();
        let Some(req_body) = req_body else {
            return Err(BindError::malformed_body("body has been consumed"));
        };

        req_body
            .collect()
            .await
            .map(|collected| collected.to_bytes())
            .map_err(|e| BindError::malformed_body(format!("read body error: {e}")))
    }
}

pub struct ResponseBody {
    inner: Kind,
}

enum Kind {
    Once(Option<Bytes>),
    Stream(UnsyncBoxBody<Bytes, BoxError>),
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self { inner: Kind::Once(None) }
    }

    pub fn once(bytes: Bytes) -> Self {
        if bytes.is_empty() {
            Self::empty()
        } else {
            Self { inner: Kind::Once(Some(bytes)) }
        }
    }

    pub fn stream<B>(body: B) -> Self
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Self { inner: Kind::Stream(body.map_err(Into::into).boxed_unsync()) }
    }

    /// Returns the bytes of a non-streaming body
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match &self.inner {
            Kind::Once(option_bytes) => option_bytes.as_ref(),
            Kind::Stream(_) => None,
        }
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Kind::Once(option_bytes) => f.debug_tuple("ResponseBody::Once").field(option_bytes).finish(),
            Kind::Stream(_) => f.debug_tuple("ResponseBody::Stream").finish(),
        }
    }
}

impl From<String> for ResponseBody {
    fn from(value: String) -> Self {
        Self::once(Bytes::from(value))
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(value: Vec<u8>) -> Self {
        Self::once(Bytes::from(value))
    }
}

impl From<Bytes> for ResponseBody {
    fn from(value: Bytes) -> Self {
        Self::once(value)
    }
}

impl From<()> for ResponseBody {
    fn from((): ()) -> Self {
        Self::empty()
    }
}

impl From<Option<Bytes>> for ResponseBody {
    fn from(option: Option<Bytes>) -> Self {
        match option {
            Some(bytes) => Self::once(bytes),
            None => Self::empty(),
        }
    }
}

impl From<&'static str> for ResponseBody {
    fn from(value: &'static str) -> Self {
        Self::once(Bytes::from_static(value.as_bytes()))
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
            Kind::Once(option_bytes) => SizeHint::with_exact(option_bytes.as_ref().map_or(0, |bytes| bytes.len() as u64)),
            Kind::Stream(box_body) => box_body.size_hint(),
        }
    }
}
