//! Request body encoding and data transformers.
//!
//! [`encode`] turns a [`Payload`] into the body handed to the transport,
//! setting or clearing the headers the payload implies. The payload's shape
//! is classified once into a [`PayloadKind`] and the encoding is an
//! exhaustive match over it.

mod forms;

pub use forms::{MultipartForm, MultipartPart, SearchParams, StreamingForm};

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::config::{has_header, remove_header, set_header, Headers};
use crate::errors::{codes, ClassifiedError, ErrorKind, HttpResult};
use crate::transport::WireBody;

/// Data attached to a request.
#[derive(Debug, Clone)]
pub enum Payload {
    /// A pre-encoded multipart stream.
    StreamingForm(StreamingForm),
    /// An in-memory multipart form.
    MemoryForm(MultipartForm),
    /// URL-encoded form fields.
    UrlEncoded(SearchParams),
    /// Raw bytes.
    Binary(Bytes),
    /// A JSON value. Objects and arrays are serialized; scalars are sent as
    /// text and `null` sends no body.
    Json(Value),
    /// Plain text.
    Text(String),
}

impl Payload {
    /// Serializes any value into a JSON payload.
    pub fn json<T: Serialize>(value: &T) -> HttpResult<Self> {
        Ok(Payload::Json(serde_json::to_value(value)?))
    }

    /// Returns the JSON value if this is a JSON payload.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the payload's classification.
    pub fn kind(&self) -> PayloadKind {
        PayloadKind::classify(self)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_owned())
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Binary(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Binary(Bytes::from(bytes))
    }
}

impl From<SearchParams> for Payload {
    fn from(params: SearchParams) -> Self {
        Payload::UrlEncoded(params)
    }
}

impl From<MultipartForm> for Payload {
    fn from(form: MultipartForm) -> Self {
        Payload::MemoryForm(form)
    }
}

impl From<StreamingForm> for Payload {
    fn from(form: StreamingForm) -> Self {
        Payload::StreamingForm(form)
    }
}

/// The encoding a payload receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// Streamed multipart; its own headers are merged in.
    StreamingForm,
    /// In-memory multipart; `Content-Type` is left to the transport.
    MemoryForm,
    /// `application/x-www-form-urlencoded`.
    UrlEncoded,
    /// Bytes passed through untouched.
    Binary,
    /// Serialized as `application/json`.
    JsonSerializable,
    /// Scalars and text passed through untouched.
    Raw,
}

impl PayloadKind {
    /// Classifies a payload.
    pub fn classify(payload: &Payload) -> Self {
        match payload {
            Payload::StreamingForm(_) => PayloadKind::StreamingForm,
            Payload::MemoryForm(_) => PayloadKind::MemoryForm,
            Payload::UrlEncoded(_) => PayloadKind::UrlEncoded,
            Payload::Binary(_) => PayloadKind::Binary,
            Payload::Json(Value::Object(_) | Value::Array(_)) => PayloadKind::JsonSerializable,
            Payload::Json(_) | Payload::Text(_) => PayloadKind::Raw,
        }
    }
}

/// Encodes a payload for the wire, adjusting `headers` as the payload
/// requires.
pub fn encode(payload: Payload, headers: &mut Headers) -> HttpResult<WireBody> {
    match PayloadKind::classify(&payload) {
        PayloadKind::StreamingForm => {
            if let Payload::StreamingForm(form) = &payload {
                for (name, value) in form.headers() {
                    set_header(headers, name, value);
                }
            }
        }
        PayloadKind::MemoryForm => {
            remove_header(headers, "Content-Type");
        }
        PayloadKind::UrlEncoded => {
            if !has_header(headers, "Content-Type") {
                set_header(
                    headers,
                    "Content-Type",
                    mime::APPLICATION_WWW_FORM_URLENCODED.as_ref(),
                );
            }
        }
        PayloadKind::JsonSerializable => {
            if !has_header(headers, "Content-Type") {
                set_header(headers, "Content-Type", mime::APPLICATION_JSON.as_ref());
            }
        }
        PayloadKind::Binary | PayloadKind::Raw => {}
    }

    into_wire(payload)
}

/// Converts a payload to a wire body without touching any header.
///
/// Used after request transformers, which own the headers.
pub fn into_wire(payload: Payload) -> HttpResult<WireBody> {
    let body = match payload {
        Payload::StreamingForm(form) => WireBody::Stream(form.take_stream().ok_or_else(|| {
            ClassifiedError::new(
                ErrorKind::Serialization,
                "streaming form body was already consumed",
            )
            .with_code(codes::ERR_SERIALIZATION)
        })?),
        Payload::MemoryForm(form) => WireBody::Multipart(form),
        Payload::UrlEncoded(params) => WireBody::Text(params.to_string()),
        Payload::Binary(bytes) => WireBody::Bytes(bytes),
        Payload::Json(Value::Null) => WireBody::Empty,
        Payload::Json(Value::String(text)) | Payload::Text(text) => WireBody::Text(text),
        Payload::Json(value @ (Value::Object(_) | Value::Array(_))) => {
            WireBody::Text(serde_json::to_string(&value)?)
        }
        Payload::Json(scalar) => WireBody::Text(scalar.to_string()),
    };
    Ok(body)
}

/// One `(data, headers) -> data` step.
pub type Transformer<D> = Arc<dyn Fn(D, &mut Headers) -> HttpResult<D> + Send + Sync>;

/// An ordered list of transformers applied left to right.
pub struct TransformChain<D> {
    steps: Vec<Transformer<D>>,
}

impl<D> TransformChain<D> {
    /// Creates an empty chain, which leaves data unchanged.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Creates a chain of one transformer.
    pub fn single<F>(step: F) -> Self
    where
        F: Fn(D, &mut Headers) -> HttpResult<D> + Send + Sync + 'static,
    {
        Self::new().then(step)
    }

    /// Appends a transformer.
    pub fn then<F>(mut self, step: F) -> Self
    where
        F: Fn(D, &mut Headers) -> HttpResult<D> + Send + Sync + 'static,
    {
        self.steps.push(Arc::new(step));
        self
    }

    /// Returns the number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the chain has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl<D> Default for TransformChain<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for TransformChain<D> {
    fn clone(&self) -> Self {
        Self {
            steps: self.steps.clone(),
        }
    }
}

impl<D> From<Vec<Transformer<D>>> for TransformChain<D> {
    fn from(steps: Vec<Transformer<D>>) -> Self {
        Self { steps }
    }
}

impl<D> fmt::Debug for TransformChain<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformChain")
            .field("steps", &self.steps.len())
            .finish()
    }
}

/// Runs `data` through every transformer in order.
pub fn apply_transformers<D>(
    data: D,
    headers: &mut Headers,
    chain: &TransformChain<D>,
) -> HttpResult<D> {
    let mut data = data;
    for step in &chain.steps {
        data = step(data, headers)?;
    }
    Ok(data)
}
