//! Form payload shapes recognised by the codec.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::Headers;
use crate::transport::UploadStream;

/// An ordered list of URL-encoded key/value pairs.
///
/// Displays as `application/x-www-form-urlencoded` text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pairs: Vec<(String, String)>,
}

impl SearchParams {
    /// Creates an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pair.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    /// Appends a pair, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(name, value);
        self
    }

    /// Returns the first value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterates over the pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns true if there are no pairs.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl fmt::Display for SearchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish();
        f.write_str(&encoded)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SearchParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartPart {
    /// Text field.
    Text {
        /// Field name.
        name: String,
        /// Field value.
        value: String,
    },
    /// File field.
    File {
        /// Field name.
        name: String,
        /// File name.
        filename: String,
        /// Content type.
        content_type: String,
        /// File data.
        data: Vec<u8>,
    },
}

/// An in-memory multipart form. The transport picks the boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<MultipartPart>,
}

impl MultipartForm {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(MultipartPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Adds a file field.
    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        self.parts.push(MultipartPart::File {
            name: name.into(),
            filename: filename.into(),
            content_type: content_type.into(),
            data: data.into(),
        });
        self
    }

    /// Returns the parts.
    pub fn parts(&self) -> &[MultipartPart] {
        &self.parts
    }

    /// Consumes the form and returns its parts.
    pub fn into_parts(self) -> Vec<MultipartPart> {
        self.parts
    }
}

/// A multipart body produced elsewhere and streamed without buffering.
///
/// The producer owns the encoding; this type only carries the boundary it
/// used so the matching `Content-Type` can be sent. The stream can be taken
/// once; clones share it.
#[derive(Clone)]
pub struct StreamingForm {
    boundary: String,
    content_length: Option<u64>,
    body: Arc<Mutex<Option<UploadStream>>>,
}

impl StreamingForm {
    /// Wraps an already-encoded multipart stream using `boundary`.
    pub fn new(boundary: impl Into<String>, body: UploadStream) -> Self {
        Self {
            boundary: boundary.into(),
            content_length: None,
            body: Arc::new(Mutex::new(Some(body))),
        }
    }

    /// Generates a fresh boundary for producers that have not picked one.
    pub fn generate_boundary() -> String {
        format!("----formdata-{}", uuid::Uuid::new_v4().simple())
    }

    /// Records the encoded length, sent as `Content-Length`.
    pub fn with_content_length(mut self, length: u64) -> Self {
        self.content_length = Some(length);
        self
    }

    /// Returns the boundary.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// The headers this body requires.
    pub fn headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert(
            "Content-Type".to_string(),
            format!("multipart/form-data; boundary={}", self.boundary),
        );
        if let Some(length) = self.content_length {
            headers.insert("Content-Length".to_string(), length.to_string());
        }
        headers
    }

    /// Takes the body stream. Returns `None` once it has been taken.
    pub fn take_stream(&self) -> Option<UploadStream> {
        self.body
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl fmt::Debug for StreamingForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingForm")
            .field("boundary", &self.boundary)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}
