//! Response body capture.
//!
//! [`CaptureBody`] decorates a response body: each data frame is appended to
//! an in-memory copy and then handed on untouched. Size hints and
//! end-of-stream flags are forwarded, so the server frames the response
//! exactly as it would the undecorated body.

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use http_body::{Body as HttpBody, Frame, SizeHint};

type OnComplete = Box<dyn FnOnce(Bytes) + Send>;

/// Body wrapper that tees every frame into a buffer.
///
/// The completion callback receives the captured bytes exactly once: when
/// the stream ends, or when the body is dropped early (client disconnect,
/// empty body never polled).
pub struct CaptureBody {
    inner: Body,
    captured: Vec<u8>,
    on_complete: Option<OnComplete>,
}

impl CaptureBody {
    pub fn new(inner: Body, on_complete: impl FnOnce(Bytes) + Send + 'static) -> Self {
        Self {
            inner,
            captured: Vec::new(),
            on_complete: Some(Box::new(on_complete)),
        }
    }

    fn complete(&mut self) {
        if let Some(on_complete) = self.on_complete.take() {
            on_complete(Bytes::from(std::mem::take(&mut self.captured)));
        }
    }
}

impl HttpBody for CaptureBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = &mut *self;
        let polled = Pin::new(&mut this.inner).poll_frame(cx);

        match &polled {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.captured.extend_from_slice(data);
                }
            }
            Poll::Ready(None) => this.complete(),
            _ => {}
        }

        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for CaptureBody {
    fn drop(&mut self) {
        self.complete();
    }
}
