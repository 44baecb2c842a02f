//! HTTP transport implementation backed by reqwest.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder, Method};
use tracing::instrument;

use super::{
    abort_on_signal, ByteStream, HttpTransport, ResponseBody, TransportError, TransportRequest,
    TransportResponse, WireBody,
};
use crate::codec::{MultipartForm, MultipartPart};
use crate::config::{HttpMethod, DEFAULT_MAX_REDIRECTS};
use crate::observability::redact_url;

/// HTTP transport using reqwest.
///
/// Redirects are followed here, up to the limit given at construction.
pub struct ReqwestTransport {
    client: Client,
    max_redirects: u32,
}

impl ReqwestTransport {
    /// Creates a transport with the default redirect limit.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_max_redirects(DEFAULT_MAX_REDIRECTS)
    }

    /// Creates a transport following at most `max_redirects` redirects.
    pub fn with_max_redirects(max_redirects: u32) -> Result<Self, TransportError> {
        let policy = match max_redirects {
            0 => Policy::none(),
            limit => Policy::limited(usize::try_from(limit).unwrap_or(usize::MAX)),
        };

        let client = ClientBuilder::new()
            .redirect(policy)
            .pool_max_idle_per_host(10)
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| TransportError::Connection {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            max_redirects,
        })
    }

    /// Wraps a preconfigured reqwest client.
    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }

    fn method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Options => Method::OPTIONS,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
        }
    }

    fn build_form(form: MultipartForm) -> Result<reqwest::multipart::Form, TransportError> {
        let mut multipart = reqwest::multipart::Form::new();

        for part in form.into_parts() {
            multipart = match part {
                MultipartPart::Text { name, value } => multipart.text(name, value),
                MultipartPart::File {
                    name,
                    filename,
                    content_type,
                    data,
                } => {
                    let part = reqwest::multipart::Part::bytes(data)
                        .file_name(filename)
                        .mime_str(&content_type)
                        .map_err(|e| TransportError::InvalidRequest {
                            message: e.to_string(),
                        })?;
                    multipart.part(name, part)
                }
            };
        }

        Ok(multipart)
    }

    fn map_error(err: &reqwest::Error) -> TransportError {
        if err.is_connect() || err.is_timeout() {
            TransportError::Connection {
                message: err.to_string(),
            }
        } else if err.is_builder() {
            TransportError::InvalidRequest {
                message: err.to_string(),
            }
        } else {
            TransportError::InvalidResponse {
                message: err.to_string(),
            }
        }
    }

    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut req_builder = self
            .client
            .request(Self::method(request.method), &request.url);

        // Add headers
        for (name, value) in &request.headers {
            req_builder = req_builder.header(name.as_str(), value.as_str());
        }

        // Add body if present
        req_builder = match request.body {
            WireBody::Empty => req_builder,
            WireBody::Bytes(bytes) => req_builder.body(bytes),
            WireBody::Text(text) => req_builder.body(text),
            WireBody::Multipart(form) => req_builder.multipart(Self::build_form(form)?),
            WireBody::Stream(stream) => req_builder.body(reqwest::Body::wrap_stream(stream)),
        };

        // Execute request
        let response = req_builder.send().await.map_err(|e| Self::map_error(&e))?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();

        let body = if request.streaming {
            let stream: ByteStream = Box::pin(
                response
                    .bytes_stream()
                    .map(|chunk| chunk.map_err(|e| Self::map_error(&e))),
            );
            ResponseBody::from_stream(stream)
        } else {
            let bytes = response.bytes().await.map_err(|e| Self::map_error(&e))?;
            ResponseBody::from_bytes(bytes)
        };

        Ok(TransportResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    #[instrument(
        skip(self, request),
        fields(method = request.method.wire_name(), url = %redact_url(&request.url))
    )]
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let Some(signal) = request.signal.clone() else {
            return self.execute(request).await;
        };
        if signal.is_cancelled() {
            return Err(TransportError::Aborted);
        }

        let streaming = request.streaming;
        let response = tokio::select! {
            biased;
            () = signal.cancelled() => return Err(TransportError::Aborted),
            response = self.execute(request) => response?,
        };

        if streaming {
            let TransportResponse {
                status,
                status_text,
                headers,
                body,
            } = response;
            return Ok(TransportResponse {
                status,
                status_text,
                headers,
                body: ResponseBody::from_stream(abort_on_signal(body.into_stream(), signal)),
            });
        }

        Ok(response)
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("max_redirects", &self.max_redirects)
            .finish_non_exhaustive()
    }
}
