//! HTTP transport layer.
//!
//! The client never touches sockets itself: every request is handed to an
//! [`HttpTransport`] as a fully prepared [`TransportRequest`]. The transport
//! is expected to honour the request's abort signal while in flight and to
//! report a fired signal as [`TransportError::Aborted`].

mod http;

pub use http::ReqwestTransport;

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::codec::MultipartForm;
use crate::config::{Headers, HttpMethod};

/// A response body stream.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// A request body stream. Uploads must also be `Sync` so transports can
/// share them with their connection tasks.
pub type UploadStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send + Sync>>;

/// Transport error types.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection error.
    #[error("Connection error: {message}")]
    Connection {
        /// Error message.
        message: String,
    },

    /// The request could not be built.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Error message.
        message: String,
    },

    /// Invalid response.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Error message.
        message: String,
    },

    /// The abort signal fired before the transport settled.
    #[error("Request aborted")]
    Aborted,
}

/// A body ready for the wire.
pub enum WireBody {
    /// No body.
    Empty,
    /// Raw bytes.
    Bytes(Bytes),
    /// UTF-8 text.
    Text(String),
    /// A multipart form; the transport chooses the boundary.
    Multipart(MultipartForm),
    /// A body streamed without buffering.
    Stream(UploadStream),
}

impl WireBody {
    /// Returns true if there is no body.
    pub fn is_empty(&self) -> bool {
        matches!(self, WireBody::Empty)
    }
}

impl fmt::Debug for WireBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireBody::Empty => f.write_str("Empty"),
            WireBody::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            WireBody::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            WireBody::Multipart(form) => f.debug_tuple("Multipart").field(&form.parts().len()).finish(),
            WireBody::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// A fully prepared request.
#[derive(Debug)]
pub struct TransportRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute or relative URL, already including the query string.
    pub url: String,
    /// Flattened request headers.
    pub headers: Headers,
    /// Request body.
    pub body: WireBody,
    /// Abort signal, present when a cancel token is attached.
    pub signal: Option<CancellationToken>,
    /// Expose the body unbuffered.
    pub streaming: bool,
}

/// A response as returned by a transport, body still unread.
#[derive(Debug)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Reason phrase.
    pub status_text: String,
    /// Response headers in arrival order.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: ResponseBody,
}

impl TransportResponse {
    /// Returns true if the status indicates success (2xx).
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// An unread response body.
pub struct ResponseBody {
    stream: ByteStream,
}

impl ResponseBody {
    /// Wraps a byte stream.
    pub fn from_stream(stream: ByteStream) -> Self {
        Self { stream }
    }

    /// Wraps an already buffered body.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self::from_stream(Box::pin(futures::stream::once(async move {
            Ok::<_, TransportError>(bytes)
        })))
    }

    /// An empty body.
    pub fn empty() -> Self {
        Self::from_stream(Box::pin(futures::stream::empty::<
            Result<Bytes, TransportError>,
        >()))
    }

    /// Reads the whole body.
    pub async fn bytes(mut self) -> Result<Bytes, TransportError> {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = self.stream.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }

    /// Reads the whole body as text, replacing invalid UTF-8.
    pub async fn text(self) -> Result<String, TransportError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Returns the raw stream without buffering.
    pub fn into_stream(self) -> ByteStream {
        self.stream
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResponseBody(..)")
    }
}

/// Ends a body stream with [`TransportError::Aborted`] once `signal` fires.
pub(crate) fn abort_on_signal(stream: ByteStream, signal: CancellationToken) -> ByteStream {
    Box::pin(futures::stream::unfold(
        Some((stream, signal)),
        |state| async move {
            let (mut stream, signal) = state?;
            tokio::select! {
                biased;
                () = signal.cancelled() => Some((Err(TransportError::Aborted), None)),
                item = stream.next() => item.map(|item| (item, Some((stream, signal)))),
            }
        },
    ))
}

/// HTTP transport trait.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a prepared request.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}
