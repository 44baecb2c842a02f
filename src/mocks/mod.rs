//! Mock transport for testing.
//!
//! Serves queued responses without touching the network and records every
//! request it receives. The abort signal is honoured like a real transport:
//! a fired signal, before or during the artificial delay, fails the call with
//! [`TransportError::Aborted`].

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;

use crate::codec::MultipartForm;
use crate::config::{Headers, HttpMethod};
use crate::transport::{
    abort_on_signal, HttpTransport, ResponseBody, TransportError, TransportRequest,
    TransportResponse, WireBody,
};

/// A request as seen by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Resolved URL.
    pub url: String,
    /// Request headers.
    pub headers: Headers,
    /// Body bytes; streamed bodies are read to the end.
    pub body: Option<Vec<u8>>,
    /// Multipart form, when one was sent.
    pub multipart: Option<MultipartForm>,
    /// Whether an abort signal was attached.
    pub has_signal: bool,
    /// Whether an unbuffered body was requested.
    pub streaming: bool,
}

impl RecordedRequest {
    /// Returns a header by name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        crate::config::get_header(&self.headers, name)
    }

    /// Returns the body as text.
    pub fn body_text(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|body| String::from_utf8_lossy(body).into_owned())
    }
}

/// A canned response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Vec<u8>,
}

impl MockResponse {
    /// Creates a successful JSON response.
    pub fn json<T: serde::Serialize>(value: &T) -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: serde_json::to_vec(value).unwrap_or_default(),
        }
    }

    /// Creates a successful text response.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
            body: body.into().into_bytes(),
        }
    }

    /// Creates an empty response with the given status.
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Creates an error response with a JSON body.
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(&serde_json::json!({ "error": { "message": message } })).with_status(status)
    }

    /// Sets the status.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Adds a header.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Mock HTTP transport for testing.
pub struct MockTransport {
    outcomes: Mutex<VecDeque<Result<MockResponse, TransportError>>>,
    default_response: Mutex<Option<MockResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
    delay: Mutex<Option<Duration>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            default_response: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            delay: Mutex::new(None),
        }
    }

    /// Queues a response.
    pub fn queue(&self, response: MockResponse) {
        lock(&self.outcomes).push_back(Ok(response));
    }

    /// Queues a JSON response.
    pub fn queue_json<T: serde::Serialize>(&self, value: &T) {
        self.queue(MockResponse::json(value));
    }

    /// Queues an error response.
    pub fn queue_error(&self, status: u16, message: &str) {
        self.queue(MockResponse::error(status, message));
    }

    /// Queues a transport failure.
    pub fn queue_failure(&self, error: TransportError) {
        lock(&self.outcomes).push_back(Err(error));
    }

    /// Sets the response served once the queue is empty.
    pub fn set_default(&self, response: MockResponse) {
        *lock(&self.default_response) = Some(response);
    }

    /// Delays every response.
    pub fn set_delay(&self, delay: Duration) {
        *lock(&self.delay) = Some(delay);
    }

    /// Gets all recorded requests.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    /// Gets the last recorded request.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        lock(&self.requests).last().cloned()
    }

    /// Clears recorded requests.
    pub fn clear_requests(&self) {
        lock(&self.requests).clear();
    }

    /// Returns the number of requests made.
    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    fn next_outcome(&self) -> Result<MockResponse, TransportError> {
        if let Some(outcome) = lock(&self.outcomes).pop_front() {
            return outcome;
        }
        Ok(lock(&self.default_response)
            .clone()
            .unwrap_or_else(|| MockResponse::error(500, "No mock response configured")))
    }

    async fn record(&self, request: TransportRequest) -> Result<(), TransportError> {
        let mut multipart = None;
        let body = match request.body {
            WireBody::Empty => None,
            WireBody::Bytes(bytes) => Some(bytes.to_vec()),
            WireBody::Text(text) => Some(text.into_bytes()),
            WireBody::Multipart(form) => {
                multipart = Some(form);
                None
            }
            WireBody::Stream(mut stream) => {
                let mut buffer = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buffer.extend_from_slice(&chunk?);
                }
                Some(buffer.to_vec())
            }
        };

        lock(&self.requests).push(RecordedRequest {
            method: request.method,
            url: request.url,
            headers: request.headers,
            body,
            multipart,
            has_signal: request.signal.is_some(),
            streaming: request.streaming,
        });
        Ok(())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("queued", &lock(&self.outcomes).len())
            .field("requests", &self.request_count())
            .finish()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let signal = request.signal.clone();
        let streaming = request.streaming;
        self.record(request).await?;

        let delay = *lock(&self.delay);
        match (&signal, delay) {
            (Some(signal), _) if signal.is_cancelled() => return Err(TransportError::Aborted),
            (Some(signal), Some(delay)) => {
                tokio::select! {
                    biased;
                    () = signal.cancelled() => return Err(TransportError::Aborted),
                    () = tokio::time::sleep(delay) => {}
                }
            }
            (None, Some(delay)) => tokio::time::sleep(delay).await,
            _ => {}
        }

        let response = self.next_outcome()?;
        let mut body = ResponseBody::from_bytes(Bytes::from(response.body));
        if let (true, Some(signal)) = (streaming, signal) {
            body = ResponseBody::from_stream(abort_on_signal(body.into_stream(), signal));
        }

        let status_text = http::StatusCode::from_u16(response.status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or_default()
            .to_string();

        Ok(TransportResponse {
            status: response.status,
            status_text,
            headers: response.headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    fn request(signal: Option<CancellationToken>) -> TransportRequest {
        TransportRequest {
            method: HttpMethod::Post,
            url: "https://api.example.com/items".to_string(),
            headers: Headers::new(),
            body: WireBody::Text("hi".to_string()),
            signal,
            streaming: false,
        }
    }

    #[tokio::test]
    async fn test_serves_queue_then_default() {
        let mock = MockTransport::new();
        mock.queue(MockResponse::text("first"));
        mock.set_default(MockResponse::empty(204));

        let first = mock.send(request(None)).await.unwrap();
        assert_eq!(first.status, 200);
        assert_eq!(first.body.text().await.unwrap(), "first");

        let second = mock.send(request(None)).await.unwrap();
        assert_eq!(second.status, 204);
        assert_eq!(second.status_text, "No Content");

        assert_eq!(mock.request_count(), 2);
        assert_eq!(mock.last_request().unwrap().body_text().as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn test_queued_failure() {
        let mock = MockTransport::new();
        mock.queue_failure(TransportError::Connection {
            message: "refused".to_string(),
        });

        let err = mock.send(request(None)).await.unwrap_err();
        assert!(matches!(err, TransportError::Connection { .. }));
    }

    #[tokio::test]
    async fn test_signal_aborts_during_delay() {
        let mock = MockTransport::new();
        mock.set_delay(Duration::from_secs(30));
        let signal = CancellationToken::new();

        let trigger = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let err = mock.send(request(Some(signal))).await.unwrap_err();
        assert!(matches!(err, TransportError::Aborted));
        assert_eq!(mock.request_count(), 1);
    }
}
