//! Request configuration.
//!
//! A [`RequestConfig`] is a value: merging returns a new config and never
//! mutates either input. Configurations merge in three layers, library
//! defaults, then client defaults, then per-call overrides. Later layers
//! win except for headers, which merge key by key.

mod headers;
pub mod merge;

pub use headers::{
    find_header_key, get_header, has_header, merge_header_maps, remove_header, set_header,
    HeaderConfig, Headers,
};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cancel::CancelToken;
use crate::codec::{Payload, SearchParams, TransformChain};
use crate::errors::{HttpClientError, HttpResult};
use crate::response::ResponseData;

/// Default `Accept` header sent with every request.
pub const DEFAULT_ACCEPT: &str = "application/json, text/plain, */*";

/// Default redirect limit handed to the transport.
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;

/// Placeholder that replaces passwords in sanitized configs.
pub const REDACTED: &str = "[REDACTED]";

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    /// GET request.
    #[default]
    Get,
    /// DELETE request.
    Delete,
    /// HEAD request.
    Head,
    /// OPTIONS request.
    Options,
    /// POST request.
    Post,
    /// PUT request.
    Put,
    /// PATCH request.
    Patch,
}

impl HttpMethod {
    /// Every supported method.
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
    ];

    /// Lower-case name used inside configs.
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Delete => "delete",
            HttpMethod::Head => "head",
            HttpMethod::Options => "options",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
        }
    }

    /// Upper-case name sent on the wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
        }
    }

    /// Returns true if a request body is sent with this method.
    pub fn sends_body(self) -> bool {
        !matches!(self, HttpMethod::Get | HttpMethod::Head)
    }

    /// Returns true if the response body is never read for this method.
    pub fn skips_response_body(self) -> bool {
        matches!(self, HttpMethod::Head | HttpMethod::Options)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = HttpClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| HttpClientError::configuration(format!("Unsupported method '{s}'")))
    }
}

/// How the response body is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Parse JSON, falling back to text on malformed bodies.
    #[default]
    Json,
    /// UTF-8 text.
    Text,
    /// Bytes tagged with the response content type.
    Blob,
    /// Raw bytes.
    ArrayBuffer,
    /// The unbuffered body stream.
    Stream,
}

impl FromStr for ResponseType {
    type Err = HttpClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ResponseType::Json),
            "text" => Ok(ResponseType::Text),
            "blob" => Ok(ResponseType::Blob),
            "arraybuffer" => Ok(ResponseType::ArrayBuffer),
            "stream" => Ok(ResponseType::Stream),
            other => Err(HttpClientError::configuration(format!(
                "Unsupported response type '{other}'"
            ))),
        }
    }
}

/// HTTP basic credentials.
#[derive(Clone)]
pub struct BasicAuth {
    /// User name.
    pub username: String,
    password: SecretString,
}

impl BasicAuth {
    /// Creates basic credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::new(password.into()),
        }
    }

    /// Returns the password (exposing the secret).
    pub(crate) fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &REDACTED)
            .finish()
    }
}

/// Status acceptance policy.
#[derive(Clone, Default)]
pub enum ValidateStatus {
    /// Accept `200..=299`.
    #[default]
    Default,
    /// Accept every status.
    AcceptAll,
    /// Accept the statuses for which the function returns true.
    Custom(Arc<dyn Fn(u16) -> bool + Send + Sync>),
}

impl ValidateStatus {
    /// Wraps a predicate.
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(u16) -> bool + Send + Sync + 'static,
    {
        ValidateStatus::Custom(Arc::new(predicate))
    }

    /// Returns true if the status is accepted.
    pub fn accepts(&self, status: u16) -> bool {
        match self {
            ValidateStatus::Default => (200..300).contains(&status),
            ValidateStatus::AcceptAll => true,
            ValidateStatus::Custom(predicate) => predicate(status),
        }
    }
}

impl fmt::Debug for ValidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidateStatus::Default => f.write_str("Default"),
            ValidateStatus::AcceptAll => f.write_str("AcceptAll"),
            ValidateStatus::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Query parameters appended to the request URL.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParams {
    /// A JSON object; arrays repeat as `key[]=value`.
    Map(Map<String, Value>),
    /// Pre-encoded parameters, stringified as-is.
    Encoded(SearchParams),
}

impl From<Map<String, Value>> for QueryParams {
    fn from(map: Map<String, Value>) -> Self {
        QueryParams::Map(map)
    }
}

impl From<SearchParams> for QueryParams {
    fn from(params: SearchParams) -> Self {
        QueryParams::Encoded(params)
    }
}

/// Options for one request or for a client's defaults.
///
/// Every field is optional so that configs can be layered with
/// [`RequestConfig::merge`].
///
/// # Example
///
/// ```rust
/// use integrations_http_client::{BasicAuth, RequestConfig, ResponseType};
/// use std::time::Duration;
///
/// let config = RequestConfig::new()
///     .base_url("https://api.example.com")
///     .url("/users")
///     .header("X-Trace", "abc")
///     .param("page", 2)
///     .timeout(Duration::from_secs(5))
///     .response_type(ResponseType::Json)
///     .auth(BasicAuth::new("alice", "secret"));
///
/// assert_eq!(config.snapshot().auth.unwrap().password, "[REDACTED]");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Prefix for relative request URLs.
    pub base_url: Option<String>,
    /// Request URL, absolute or relative to `base_url`.
    pub url: Option<String>,
    /// HTTP method; GET when unset.
    pub method: Option<HttpMethod>,
    /// Layered headers.
    pub headers: HeaderConfig,
    /// Query parameters.
    pub params: Option<QueryParams>,
    /// Request payload.
    pub data: Option<Payload>,
    /// Time limit for the transport call; zero disables it.
    pub timeout: Option<Duration>,
    /// How the response body is decoded.
    pub response_type: Option<ResponseType>,
    /// Replaces the default body encoding when set.
    pub transform_request: Option<TransformChain<Payload>>,
    /// Runs over the decoded response data.
    pub transform_response: Option<TransformChain<ResponseData>>,
    /// Status acceptance policy.
    pub validate_status: Option<ValidateStatus>,
    /// Basic credentials.
    pub auth: Option<BasicAuth>,
    /// Cancellation token.
    pub cancel_token: Option<CancelToken>,
    /// Redirect limit; enforced by the transport.
    pub max_redirects: Option<u32>,
}

impl RequestConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// The library defaults every client starts from.
    pub fn library_defaults() -> Self {
        let mut headers = HeaderConfig::new();
        headers.set_common("Accept", DEFAULT_ACCEPT);
        Self {
            headers,
            timeout: Some(Duration::ZERO),
            response_type: Some(ResponseType::Json),
            validate_status: Some(ValidateStatus::Default),
            max_redirects: Some(DEFAULT_MAX_REDIRECTS),
            ..Self::default()
        }
    }

    /// Reads client defaults from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `HTTP_CLIENT_BASE_URL` (optional): base URL for relative requests
    /// - `HTTP_CLIENT_TIMEOUT_MS` (optional): timeout in milliseconds
    /// - `HTTP_CLIENT_MAX_REDIRECTS` (optional): redirect limit
    pub fn from_env() -> HttpResult<Self> {
        let mut config = Self::new();

        if let Ok(base_url) = std::env::var("HTTP_CLIENT_BASE_URL") {
            config.base_url = Some(base_url);
        }

        if let Ok(timeout) = std::env::var("HTTP_CLIENT_TIMEOUT_MS") {
            let millis = timeout.trim().parse::<u64>().map_err(|_| {
                HttpClientError::configuration(format!(
                    "HTTP_CLIENT_TIMEOUT_MS must be a non-negative integer, got '{timeout}'"
                ))
            })?;
            config.timeout = Some(Duration::from_millis(millis));
        }

        if let Ok(redirects) = std::env::var("HTTP_CLIENT_MAX_REDIRECTS") {
            let limit = redirects.trim().parse::<u32>().map_err(|_| {
                HttpClientError::configuration(format!(
                    "HTTP_CLIENT_MAX_REDIRECTS must be a non-negative integer, got '{redirects}'"
                ))
            })?;
            config.max_redirects = Some(limit);
        }

        Ok(config)
    }

    /// Builds a configuration from a JSON document.
    ///
    /// Recognised keys use either camelCase or snake_case. Unknown and
    /// denylisted keys are ignored. Fails if the document is not an object,
    /// if `timeout` is not a non-negative integer, or if a value has the
    /// wrong shape.
    pub fn from_value(value: &Value) -> HttpResult<Self> {
        let Value::Object(object) = merge::sanitize(value) else {
            return Err(HttpClientError::configuration(
                "request config must be an object",
            ));
        };

        let mut config = Self::new();
        for (key, value) in &object {
            match key.as_str() {
                "baseURL" | "baseUrl" | "base_url" => {
                    config.base_url = Some(expect_string(key, value)?);
                }
                "url" => config.url = Some(expect_string(key, value)?),
                "method" => config.method = Some(expect_string(key, value)?.parse()?),
                "headers" => config.headers = headers_from_value(value)?,
                "params" => match value {
                    Value::Object(map) => config.params = Some(QueryParams::Map(map.clone())),
                    Value::Null => {}
                    _ => return Err(wrong_shape(key, "an object")),
                },
                "data" => config.data = Some(Payload::Json(value.clone())),
                "timeout" => {
                    let millis = value
                        .as_u64()
                        .ok_or_else(|| wrong_shape(key, "a non-negative integer"))?;
                    config.timeout = Some(Duration::from_millis(millis));
                }
                "responseType" | "response_type" => {
                    config.response_type = Some(expect_string(key, value)?.parse()?);
                }
                "validateStatus" | "validate_status" => match value {
                    Value::Bool(false) => config.validate_status = Some(ValidateStatus::AcceptAll),
                    Value::Null => {}
                    _ => return Err(wrong_shape(key, "false or null")),
                },
                "auth" => {
                    let username = value.get("username").and_then(Value::as_str);
                    let password = value.get("password").and_then(Value::as_str);
                    match (username, password) {
                        (Some(username), Some(password)) => {
                            config.auth = Some(BasicAuth::new(username, password));
                        }
                        _ => return Err(wrong_shape(key, "{username, password}")),
                    }
                }
                "maxRedirects" | "max_redirects" => {
                    let limit = value
                        .as_u64()
                        .and_then(|limit| u32::try_from(limit).ok())
                        .ok_or_else(|| wrong_shape(key, "a non-negative integer"))?;
                    config.max_redirects = Some(limit);
                }
                other => tracing::debug!(key = other, "Ignoring unrecognised config key"),
            }
        }

        Ok(config)
    }

    /// Merges `over` on top of `self`.
    pub fn merge(&self, over: &RequestConfig) -> RequestConfig {
        RequestConfig {
            base_url: over.base_url.clone().or_else(|| self.base_url.clone()),
            url: over.url.clone().or_else(|| self.url.clone()),
            method: over.method.or(self.method),
            headers: self.headers.merge(&over.headers),
            params: over.params.clone().or_else(|| self.params.clone()),
            data: over.data.clone().or_else(|| self.data.clone()),
            timeout: over.timeout.or(self.timeout),
            response_type: over.response_type.or(self.response_type),
            transform_request: over
                .transform_request
                .clone()
                .or_else(|| self.transform_request.clone()),
            transform_response: over
                .transform_response
                .clone()
                .or_else(|| self.transform_response.clone()),
            validate_status: over
                .validate_status
                .clone()
                .or_else(|| self.validate_status.clone()),
            auth: over.auth.clone().or_else(|| self.auth.clone()),
            cancel_token: over.cancel_token.clone().or_else(|| self.cancel_token.clone()),
            max_redirects: over.max_redirects.or(self.max_redirects),
        }
    }

    /// Checks that a merged config can be dispatched.
    pub fn validate(&self) -> HttpResult<()> {
        if self.url.is_none() && self.base_url.is_none() {
            return Err(HttpClientError::configuration(
                "request URL is required when no base URL is configured",
            ));
        }
        Ok(())
    }

    /// The method to send, GET when unset.
    pub fn effective_method(&self) -> HttpMethod {
        self.method.unwrap_or_default()
    }

    /// The response type to decode, JSON when unset.
    pub fn effective_response_type(&self) -> ResponseType {
        self.response_type.unwrap_or_default()
    }

    /// A deep, serializable copy safe to attach to errors and responses.
    pub fn snapshot(&self) -> ConfigSnapshot {
        let method = self.effective_method();
        ConfigSnapshot {
            base_url: self.base_url.clone(),
            url: self.url.clone(),
            method,
            headers: self.headers.flatten(method),
            params: self.params.as_ref().map(|params| match params {
                QueryParams::Map(map) => Value::Object(map.clone()),
                QueryParams::Encoded(encoded) => Value::String(encoded.to_string()),
            }),
            data: self.data.as_ref().and_then(Payload::as_json).cloned(),
            timeout_ms: self
                .timeout
                .map(|timeout| u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)),
            response_type: self.effective_response_type(),
            auth: self.auth.as_ref().map(|auth| AuthSnapshot {
                username: auth.username.clone(),
                password: REDACTED.to_string(),
            }),
            max_redirects: self.max_redirects,
        }
    }

    /// Sets the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the request URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the method.
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets a per-request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Replaces the query parameters.
    pub fn params(mut self, params: impl Into<QueryParams>) -> Self {
        self.params = Some(params.into());
        self
    }

    /// Adds one query parameter to a map of params.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut map = match self.params.take() {
            Some(QueryParams::Map(map)) => map,
            _ => Map::new(),
        };
        map.insert(name.into(), value.into());
        self.params = Some(QueryParams::Map(map));
        self
    }

    /// Sets the request payload.
    pub fn data(mut self, data: impl Into<Payload>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Sets the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the timeout in milliseconds.
    pub fn timeout_ms(self, millis: u64) -> Self {
        self.timeout(Duration::from_millis(millis))
    }

    /// Sets the response type.
    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    /// Sets the request transformers.
    pub fn transform_request(mut self, chain: TransformChain<Payload>) -> Self {
        self.transform_request = Some(chain);
        self
    }

    /// Sets the response transformers.
    pub fn transform_response(mut self, chain: TransformChain<ResponseData>) -> Self {
        self.transform_response = Some(chain);
        self
    }

    /// Sets the status acceptance policy.
    pub fn validate_status(mut self, policy: ValidateStatus) -> Self {
        self.validate_status = Some(policy);
        self
    }

    /// Sets basic credentials.
    pub fn auth(mut self, auth: BasicAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Attaches a cancellation token.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    /// Sets the redirect limit.
    pub fn max_redirects(mut self, limit: u32) -> Self {
        self.max_redirects = Some(limit);
        self
    }
}

fn expect_string(key: &str, value: &Value) -> HttpResult<String> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| wrong_shape(key, "a string"))
}

fn wrong_shape(key: &str, expected: &str) -> HttpClientError {
    HttpClientError::configuration(format!("'{key}' must be {expected}"))
}

fn header_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn header_map(value: &Value) -> Headers {
    let mut headers = Headers::new();
    if let Value::Object(map) = value {
        for (name, value) in map {
            if let Some(value) = header_value(value) {
                set_header(&mut headers, name.clone(), value);
            }
        }
    }
    headers
}

fn headers_from_value(value: &Value) -> HttpResult<HeaderConfig> {
    let Value::Object(map) = value else {
        return Err(wrong_shape("headers", "an object"));
    };

    let mut config = HeaderConfig::new();
    for (name, value) in map {
        if name == "common" {
            config.common = header_map(value);
        } else if let (Ok(method), Value::Object(_)) = (name.parse::<HttpMethod>(), value) {
            config.per_method.insert(method, header_map(value));
        } else if let Some(value) = header_value(value) {
            config.set(name.clone(), value);
        }
    }
    Ok(config)
}

/// Credentials as they appear in a sanitized config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthSnapshot {
    /// User name.
    pub username: String,
    /// Always [`REDACTED`].
    pub password: String,
}

/// A sanitized, serializable copy of a request config.
///
/// Attached to responses and errors; passwords are always redacted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigSnapshot {
    /// Base URL.
    pub base_url: Option<String>,
    /// Request URL as configured.
    pub url: Option<String>,
    /// Method.
    pub method: HttpMethod,
    /// Flattened headers for `method`.
    pub headers: Headers,
    /// Query parameters.
    pub params: Option<Value>,
    /// JSON payload, if the payload was JSON.
    pub data: Option<Value>,
    /// Timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Response type.
    pub response_type: ResponseType,
    /// Redacted credentials.
    pub auth: Option<AuthSnapshot>,
    /// Redirect limit.
    pub max_redirects: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_method_parse_is_case_insensitive() {
        assert_eq!("POST".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert_eq!("delete".parse::<HttpMethod>().unwrap(), HttpMethod::Delete);
        assert!("TRACE".parse::<HttpMethod>().is_err());
        assert_eq!(HttpMethod::Patch.wire_name(), "PATCH");
        assert_eq!(HttpMethod::Patch.to_string(), "patch");
    }

    #[test]
    fn test_merge_override_wins_and_headers_combine() {
        let defaults = RequestConfig::library_defaults()
            .base_url("https://api.example.com")
            .header("X-Client", "1")
            .timeout_ms(1000);
        let call = RequestConfig::new().url("/users").header("X-Call", "2");

        let merged = defaults.merge(&call);

        assert_eq!(merged.base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(merged.url.as_deref(), Some("/users"));
        assert_eq!(merged.timeout, Some(Duration::from_secs(1)));
        assert_eq!(merged.headers.get("x-client"), Some("1"));
        assert_eq!(merged.headers.get("x-call"), Some("2"));
        assert_eq!(merged.headers.common["Accept"], DEFAULT_ACCEPT);
    }

    #[test]
    fn test_merge_params_override_wholesale() {
        let base = RequestConfig::new().param("a", 1).param("b", 1);
        let over = RequestConfig::new().param("b", 2);

        let merged = base.merge(&over);
        assert_eq!(
            merged.params,
            Some(QueryParams::Map(json!({"b": 2}).as_object().cloned().unwrap()))
        );

        let kept = base.merge(&RequestConfig::new());
        assert_eq!(kept.params, base.params);
    }

    #[test]
    fn test_from_value_reads_known_keys() {
        let config = RequestConfig::from_value(&json!({
            "baseURL": "https://h",
            "url": "/x",
            "method": "PUT",
            "timeout": 250,
            "responseType": "text",
            "validateStatus": false,
            "auth": {"username": "u", "password": "p"},
            "maxRedirects": 2,
            "headers": {"common": {"Accept": "a"}, "post": {"X-Post": "1"}, "X-Flat": 7},
            "params": {"q": "s"},
            "__proto__": {"polluted": true}
        }))
        .unwrap();

        assert_eq!(config.base_url.as_deref(), Some("https://h"));
        assert_eq!(config.method, Some(HttpMethod::Put));
        assert_eq!(config.timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.response_type, Some(ResponseType::Text));
        assert!(config.validate_status.unwrap().accepts(503));
        assert_eq!(config.auth.unwrap().username, "u");
        assert_eq!(config.max_redirects, Some(2));
        assert_eq!(config.headers.common["Accept"], "a");
        assert_eq!(config.headers.per_method[&HttpMethod::Post]["X-Post"], "1");
        assert_eq!(config.headers.get("x-flat"), Some("7"));
    }

    #[test]
    fn test_from_value_rejects_bad_shapes() {
        assert!(RequestConfig::from_value(&json!(null)).is_err());
        assert!(RequestConfig::from_value(&json!("https://h")).is_err());
        assert!(RequestConfig::from_value(&json!({"timeout": -1})).is_err());
        assert!(RequestConfig::from_value(&json!({"timeout": "10"})).is_err());
        assert!(RequestConfig::from_value(&json!({"timeout": 1.5})).is_err());
        assert!(RequestConfig::from_value(&json!({"method": "brew"})).is_err());
    }

    #[test]
    fn test_snapshot_redacts_password() {
        let config = RequestConfig::new()
            .url("/x")
            .auth(BasicAuth::new("alice", "hunter2"));

        let snapshot = config.snapshot();
        assert_eq!(snapshot.auth.as_ref().unwrap().password, REDACTED);
        assert!(!serde_json::to_string(&snapshot).unwrap().contains("hunter2"));
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn test_validate_requires_some_url() {
        assert!(RequestConfig::new().validate().is_err());
        assert!(RequestConfig::new().url("/x").validate().is_ok());
        assert!(RequestConfig::new().base_url("https://h").validate().is_ok());
    }

    #[test]
    fn test_validate_status_policies() {
        assert!(ValidateStatus::Default.accepts(200));
        assert!(ValidateStatus::Default.accepts(299));
        assert!(!ValidateStatus::Default.accepts(300));
        assert!(!ValidateStatus::Default.accepts(199));
        assert!(ValidateStatus::AcceptAll.accepts(500));
        assert!(ValidateStatus::custom(|s| s < 500).accepts(404));
    }
}
