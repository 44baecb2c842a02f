//! The dispatch step: turns a merged config into one transport call.
//!
//! A request moves through these stages:
//!
//! ```text
//! Created -> UrlBuilt -> AuthApplied -> BodyEncoded -> InFlight
//!     InFlight -> Resolved | RejectedHttp | RejectedTimeout
//!               | RejectedCancelled | RejectedTransport
//! ```
//!
//! A token that is already cancelled fails the call before the URL is built
//! and the transport is never invoked. Cancellation is checked again once the
//! transport settles.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::{debug, instrument, warn};

use crate::cancel::{Cancel, CancelToken};
use crate::codec::{apply_transformers, encode, into_wire};
use crate::config::{get_header, set_header, Headers, RequestConfig, ResponseType};
use crate::errors::{codes, ClassifiedError, ErrorKind, HttpClientError, HttpResult};
use crate::observability::{redact_headers, redact_url};
use crate::response::{Blob, Response, ResponseData};
use crate::transport::{HttpTransport, TransportError, TransportRequest, WireBody};
use crate::url_builder::build_url;

/// Counts a live timeout timer for as long as it is held.
struct TimerGuard(Arc<AtomicUsize>);

impl TimerGuard {
    fn start(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A response head with its decoded body.
struct Exchange {
    status: u16,
    status_text: String,
    headers: Headers,
    data: ResponseData,
}

/// Sends requests through a transport.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn HttpTransport>,
    active_timers: Arc<AtomicUsize>,
}

impl Dispatcher {
    /// Creates a dispatcher over `transport`.
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            active_timers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The transport requests are sent through.
    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    /// Number of timeout timers currently running.
    pub fn active_timers(&self) -> usize {
        self.active_timers.load(Ordering::SeqCst)
    }

    /// Sends one request described by a fully merged config.
    #[instrument(skip(self, config), fields(method = %config.effective_method()))]
    pub async fn dispatch(&self, mut config: RequestConfig) -> HttpResult<Response> {
        if let Some(token) = &config.cancel_token {
            token.throw_if_requested()?;
        }

        let snapshot = config.snapshot();
        let method = config.effective_method();
        let url = build_url(
            config.base_url.as_deref(),
            config.url.as_deref().unwrap_or_default(),
            config.params.as_ref(),
        )
        .map_err(|e| e.with_context(&snapshot, None))?;
        debug!(url = %redact_url(&url), "URL built");

        let mut headers = config.headers.flatten(method);
        if let Some(auth) = &config.auth {
            let credentials = STANDARD.encode(format!("{}:{}", auth.username, auth.password()));
            set_header(&mut headers, "Authorization", format!("Basic {credentials}"));
        }

        let body = match config.data.take() {
            Some(data) if method.sends_body() => {
                let encoded = match &config.transform_request {
                    Some(chain) => {
                        apply_transformers(data, &mut headers, chain).and_then(into_wire)
                    }
                    None => encode(data, &mut headers),
                };
                encoded.map_err(|e| e.with_context(&snapshot, Some(&url)))?
            }
            _ => WireBody::Empty,
        };
        debug!(body = ?body, headers = ?redact_headers(&headers), "Body encoded");

        let response_type = config.effective_response_type();
        let request = TransportRequest {
            method,
            url: url.clone(),
            headers,
            body,
            signal: config.cancel_token.as_ref().map(CancelToken::signal),
            streaming: response_type == ResponseType::Stream,
        };

        let outcome = match effective_timeout(&config) {
            Some(timeout) => {
                let _timer = TimerGuard::start(&self.active_timers);
                tokio::select! {
                    outcome = self.exchange(request, response_type) => Some(outcome),
                    () = tokio::time::sleep(timeout) => None,
                }
            }
            None => Some(self.exchange(request, response_type).await),
        };

        let Some(outcome) = outcome else {
            let millis = config.timeout.map_or(0, |timeout| timeout.as_millis());
            debug!(timeout_ms = %millis, "Request timed out");
            return Err(ClassifiedError::new(
                ErrorKind::Timeout,
                format!("timeout of {millis}ms exceeded"),
            )
            .with_code(codes::ECONNABORTED)
            .with_config(snapshot)
            .with_request(url)
            .into());
        };

        let exchange = outcome.map_err(|e| transport_failure(e, config.cancel_token.as_ref()))?;

        if let Some(reason) = config.cancel_token.as_ref().and_then(CancelToken::reason) {
            return Err(HttpClientError::Cancelled(reason.clone()));
        }

        let Exchange {
            status,
            status_text,
            mut headers,
            data,
        } = exchange;

        let data = match &config.transform_response {
            Some(chain) => apply_transformers(data, &mut headers, chain)
                .map_err(|e| e.with_context(&snapshot, Some(&url)))?,
            None => data,
        };

        let accepted = config
            .validate_status
            .as_ref()
            .map_or_else(|| (200..300).contains(&status), |policy| policy.accepts(status));
        let response = Response::from_parts(
            data,
            status,
            status_text,
            headers,
            snapshot.clone(),
            url.clone(),
        );

        if accepted {
            debug!(status, "Request resolved");
            return Ok(response);
        }

        debug!(status, "Status rejected");
        let code = if (400..500).contains(&status) {
            codes::ERR_BAD_REQUEST
        } else {
            codes::ERR_BAD_RESPONSE
        };
        Err(ClassifiedError::new(
            ErrorKind::Status,
            format!("Request failed with status code {status}"),
        )
        .with_code(code)
        .with_config(snapshot)
        .with_request(url)
        .with_response(response)
        .into())
    }

    /// Runs the transport call and decodes the body.
    async fn exchange(
        &self,
        request: TransportRequest,
        response_type: ResponseType,
    ) -> Result<Exchange, TransportError> {
        let method = request.method;
        let response = self.transport.send(request).await?;

        let mut headers = Headers::new();
        for (name, value) in response.headers {
            headers
                .entry(name.to_ascii_lowercase())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }

        let data = if method.skips_response_body() {
            match response_type {
                ResponseType::Json => ResponseData::Json(serde_json::Value::Null),
                _ => ResponseData::Text(String::new()),
            }
        } else {
            let body = response.body;
            match response_type {
                ResponseType::Stream => ResponseData::Stream(body.into_stream()),
                ResponseType::Json => decode_json(&body.bytes().await?),
                ResponseType::Text => ResponseData::Text(body.text().await?),
                ResponseType::ArrayBuffer => ResponseData::ArrayBuffer(body.bytes().await?),
                ResponseType::Blob => ResponseData::Blob(Blob {
                    content_type: get_header(&headers, "content-type")
                        .unwrap_or_default()
                        .to_string(),
                    bytes: body.bytes().await?,
                }),
            }
        };

        Ok(Exchange {
            status: response.status,
            status_text: response.status_text,
            headers,
            data,
        })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("active_timers", &self.active_timers())
            .finish_non_exhaustive()
    }
}

/// Parses a JSON body, falling back to text when it does not parse. An empty
/// body does not parse.
fn decode_json(bytes: &[u8]) -> ResponseData {
    match serde_json::from_slice(bytes) {
        Ok(value) => ResponseData::Json(value),
        Err(e) => {
            warn!(error = %e, "Response body is not valid JSON, returning text");
            ResponseData::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Maps a transport failure; a token with a reason wins over the error.
fn transport_failure(err: TransportError, token: Option<&CancelToken>) -> HttpClientError {
    if let Some(reason) = token.and_then(CancelToken::reason) {
        return HttpClientError::Cancelled(reason.clone());
    }
    match err {
        TransportError::Aborted => HttpClientError::Cancelled(Cancel::new(None)),
        other => {
            debug!(error = %other, "Transport failed");
            HttpClientError::Transport(other)
        }
    }
}

/// The configured timeout; zero disables it.
fn effective_timeout(config: &RequestConfig) -> Option<Duration> {
    config.timeout.filter(|timeout| !timeout.is_zero())
}
