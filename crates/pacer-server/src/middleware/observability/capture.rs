//! In-memory capture of a one-way HTTP body.
//!
//! [`BodyCapture`] drains a body into ordered chunks so it can be inspected,
//! then hands the exact same frames back as a new [`Body`] with
//! [`BodyCapture::flush_to`]. Everything is buffered for forwarding; only
//! the logged read-back is size-gated.

use std::collections::VecDeque;
use std::pin::{Pin, pin};
use std::task::{Context, Poll};

use axum::BoxError;
use axum::body::Body;
use axum::http::HeaderMap;
use bytes::{Bytes, BytesMut};
use http_body::{Body as HttpBody, Frame, SizeHint};
use http_body_util::BodyExt;

/// Frames of a body read to completion (or to its first error).
#[derive(Debug, Default)]
pub struct BodyCapture {
    chunks: VecDeque<Bytes>,
    trailers: Option<HeaderMap>,
    error: Option<BoxError>,
    len: u64,
}

impl BodyCapture {
    /// Creates an empty capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `body` until it ends or fails.
    ///
    /// A stream error stops the read and is kept so it can be replayed to
    /// the consumer after the data that preceded it.
    pub async fn read<B>(body: B) -> Self
    where
        B: HttpBody<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        let mut capture = Self::new();
        let mut body = pin!(body);

        while let Some(frame) = body.frame().await {
            match frame {
                Ok(frame) => capture.write_frame(frame),
                Err(error) => {
                    capture.error = Some(error.into());
                    break;
                }
            }
        }

        capture
    }

    /// Appends a data chunk. Empty chunks are dropped.
    pub fn write(&mut self, chunk: Bytes) {
        if chunk.is_empty() {
            return;
        }

        self.len += chunk.len() as u64;
        self.chunks.push_back(chunk);
    }

    fn write_frame(&mut self, frame: Frame<Bytes>) {
        match frame.into_data() {
            Ok(data) => self.write(data),
            Err(frame) => {
                if let Ok(trailers) = frame.into_trailers() {
                    match &mut self.trailers {
                        Some(existing) => existing.extend(trailers),
                        None => self.trailers = Some(trailers),
                    }
                }
            }
        }
    }

    /// Number of data bytes captured.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The error that ended the stream, if any.
    #[must_use]
    pub fn error(&self) -> Option<&BoxError> {
        self.error.as_ref()
    }

    #[must_use]
    pub fn trailers(&self) -> Option<&HeaderMap> {
        self.trailers.as_ref()
    }

    /// Returns the captured data as one contiguous buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        match self.chunks.len() {
            0 => Bytes::new(),
            1 => self.chunks[0].clone(),
            _ => {
                let mut buffer = BytesMut::with_capacity(self.len as usize);
                for chunk in &self.chunks {
                    buffer.extend_from_slice(chunk);
                }
                buffer.freeze()
            }
        }
    }

    /// Returns the body as text for a log record.
    ///
    /// `None` when the body is empty, at or above `max_len` bytes, or only
    /// whitespace. Invalid UTF-8 is converted lossily.
    #[must_use]
    pub fn loggable(&self, max_len: u64) -> Option<String> {
        if self.is_empty() || self.len >= max_len {
            return None;
        }

        let text = String::from_utf8_lossy(&self.to_bytes()).into_owned();
        (!text.trim().is_empty()).then_some(text)
    }

    /// Forwards every captured frame, in order, as a new body.
    #[must_use]
    pub fn flush_to(self) -> Body {
        Body::new(CapturedBody::from(self))
    }
}

impl From<BodyCapture> for Body {
    fn from(capture: BodyCapture) -> Self {
        capture.flush_to()
    }
}

/// Body replaying the frames of a [`BodyCapture`].
///
/// Data chunks come first, then the stream error if the original body
/// failed, otherwise the trailers.
#[derive(Debug)]
pub struct CapturedBody {
    chunks: VecDeque<Bytes>,
    trailers: Option<HeaderMap>,
    error: Option<BoxError>,
    remaining: u64,
}

impl From<BodyCapture> for CapturedBody {
    fn from(capture: BodyCapture) -> Self {
        Self {
            chunks: capture.chunks,
            trailers: capture.trailers,
            error: capture.error,
            remaining: capture.len,
        }
    }
}

impl HttpBody for CapturedBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();

        if let Some(chunk) = this.chunks.pop_front() {
            this.remaining -= chunk.len() as u64;
            return Poll::Ready(Some(Ok(Frame::data(chunk))));
        }

        if let Some(error) = this.error.take() {
            return Poll::Ready(Some(Err(error)));
        }

        Poll::Ready(this.trailers.take().map(|trailers| Ok(Frame::trailers(trailers))))
    }

    fn is_end_stream(&self) -> bool {
        self.chunks.is_empty() && self.error.is_none() && self.trailers.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        if self.error.is_some() {
            let mut hint = SizeHint::new();
            hint.set_lower(self.remaining);
            return hint;
        }

        SizeHint::with_exact(self.remaining)
    }
}
