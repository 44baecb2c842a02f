//! Responses produced by the dispatcher.

use std::fmt;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{ConfigSnapshot, Headers};
use crate::errors::HttpResult;
use crate::transport::ByteStream;

/// Bytes tagged with the content type they arrived with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// The response `Content-Type`, empty when absent.
    pub content_type: String,
    /// Body bytes.
    pub bytes: Bytes,
}

/// Decoded response body.
pub enum ResponseData {
    /// Parsed JSON. HEAD and OPTIONS responses carry `Null`.
    Json(Value),
    /// Text, also used when a JSON body fails to parse.
    Text(String),
    /// Bytes with their content type.
    Blob(Blob),
    /// Raw bytes.
    ArrayBuffer(Bytes),
    /// The unbuffered body.
    Stream(ByteStream),
}

impl ResponseData {
    /// Returns the JSON value, if the data is JSON.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseData::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the text, if the data is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseData::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the bytes of blob or array buffer data.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            ResponseData::Blob(blob) => Some(&blob.bytes),
            ResponseData::ArrayBuffer(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns the body stream, if the data is a stream.
    pub fn into_stream(self) -> Option<ByteStream> {
        match self {
            ResponseData::Stream(stream) => Some(stream),
            _ => None,
        }
    }
}

impl fmt::Debug for ResponseData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseData::Json(value) => f.debug_tuple("Json").field(value).finish(),
            ResponseData::Text(text) => f.debug_tuple("Text").field(text).finish(),
            ResponseData::Blob(blob) => f
                .debug_struct("Blob")
                .field("content_type", &blob.content_type)
                .field("len", &blob.bytes.len())
                .finish(),
            ResponseData::ArrayBuffer(bytes) => {
                f.debug_tuple("ArrayBuffer").field(&bytes.len()).finish()
            }
            ResponseData::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Value> for ResponseData {
    fn from(value: Value) -> Self {
        ResponseData::Json(value)
    }
}

/// A completed response.
#[derive(Debug)]
pub struct Response {
    data: ResponseData,
    status: u16,
    status_text: String,
    headers: Headers,
    config: ConfigSnapshot,
    request: Option<String>,
}

impl Response {
    /// Creates a response with the canonical reason phrase for `status`.
    ///
    /// Interceptors use this to short-circuit or replace responses.
    pub fn new(status: u16, data: ResponseData) -> Self {
        let status_text = http::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or_default()
            .to_string();

        Self {
            data,
            status,
            status_text,
            headers: Headers::new(),
            config: ConfigSnapshot::default(),
            request: None,
        }
    }

    pub(crate) fn from_parts(
        data: ResponseData,
        status: u16,
        status_text: String,
        headers: Headers,
        config: ConfigSnapshot,
        request: String,
    ) -> Self {
        Self {
            data,
            status,
            status_text,
            headers,
            config,
            request: Some(request),
        }
    }

    /// Sets a header, builder style. Names are lower-cased.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Decoded body.
    pub fn data(&self) -> &ResponseData {
        &self.data
    }

    /// HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Reason phrase.
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Response headers, names lower-cased.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns a header by name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Sanitized config the request was made with.
    pub fn config(&self) -> &ConfigSnapshot {
        &self.config
    }

    /// Resolved request URL.
    pub fn request(&self) -> Option<&str> {
        self.request.as_deref()
    }

    /// Deserializes JSON data into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> HttpResult<T> {
        let value = match &self.data {
            ResponseData::Json(value) => value.clone(),
            ResponseData::Text(text) => serde_json::from_str(text)?,
            _ => Value::Null,
        };
        Ok(serde_json::from_value(value)?)
    }

    /// Consumes the response and returns its data.
    pub fn into_data(self) -> ResponseData {
        self.data
    }

    /// Replaces the data, keeping everything else.
    pub fn map_data<F>(self, f: F) -> Self
    where
        F: FnOnce(ResponseData) -> ResponseData,
    {
        Self {
            data: f(self.data),
            ..self
        }
    }
}
