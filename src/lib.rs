//! Promise-style HTTP Client
//!
//! A request/response pipeline with per-verb methods, request and response
//! interceptors, cancellation tokens and automatic body handling. Network I/O
//! is delegated to a pluggable [`HttpTransport`]; a reqwest-backed transport
//! is used by default.
//!
//! # Features
//!
//! - **Layered configuration**: library defaults, client defaults and
//!   per-call options merge with headers combined key by key
//! - **Interceptors**: async continuations around every request, ejectable
//!   by id
//! - **Cancellation**: tokens fail requests before they are sent or abort
//!   them in flight
//! - **Body handling**: JSON, URL-encoded and multipart payloads are encoded
//!   with the matching `Content-Type`; responses decode as JSON, text, bytes
//!   or a stream
//! - **Classified errors**: timeouts, rejected statuses and invalid URLs carry
//!   a code and a sanitized copy of the request config
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use integrations_http_client::{HttpClient, RequestConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpClient::builder()
//!         .base_url("https://httpbin.org")
//!         .build()?;
//!
//!     let response = client.get("/get", RequestConfig::new().param("q", "rust")).await?;
//!     println!("{} {:?}", response.status(), response.data());
//!     Ok(())
//! }
//! ```
//!
//! # Cancellation
//!
//! ```rust,no_run
//! use integrations_http_client::{is_cancel, CancelToken, HttpClient, RequestConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpClient::new()?;
//!     let source = CancelToken::source();
//!
//!     let request = client.get(
//!         "https://httpbin.org/delay/10",
//!         RequestConfig::new().cancel_token(source.token.clone()),
//!     );
//!     source.cancel(Some("no longer needed"));
//!
//!     match request.await {
//!         Err(err) if is_cancel(&err) => println!("{err}"),
//!         other => println!("{other:?}"),
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cancel;
pub mod client;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod interceptors;
pub mod observability;
pub mod response;
pub mod transport;
pub mod url_builder;

// Re-exports for convenience
pub use cancel::{is_cancel, Cancel, CancelToken, CancelTokenSource, Canceller};
pub use client::{all, spread, HttpClient, HttpClientBuilder};
pub use codec::{MultipartForm, Payload, PayloadKind, SearchParams, StreamingForm, TransformChain};
pub use config::{
    BasicAuth, ConfigSnapshot, HeaderConfig, Headers, HttpMethod, QueryParams, RequestConfig,
    ResponseType, ValidateStatus,
};
pub use errors::{ClassifiedError, ErrorKind, HttpClientError, HttpResult};
pub use interceptors::{Interceptor, InterceptorId, InterceptorManager, Interceptors};
pub use response::{Blob, Response, ResponseData};
pub use transport::{HttpTransport, ReqwestTransport, TransportError};

/// Mock implementations for testing.
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
