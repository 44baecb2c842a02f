//! The HTTP client.
//!
//! Each call merges the client's defaults with the call's config, then runs
//! a chain of steps: request interceptors (last registered first), the
//! dispatch step, and response interceptors (first registered first). The
//! chain is folded over a `Result`, so a failure skips to the next rejection
//! handler and a rejection handler may recover.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tracing::instrument;

use crate::codec::Payload;
use crate::config::{HttpMethod, RequestConfig, DEFAULT_MAX_REDIRECTS};
use crate::dispatch::Dispatcher;
use crate::errors::{HttpClientError, HttpResult};
use crate::interceptors::{Interceptor, Interceptors};
use crate::response::Response;
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::url_builder::build_url;

/// One link of the call chain.
enum Step {
    Request(Interceptor<RequestConfig>),
    Dispatch,
    Response(Interceptor<Response>),
}

/// The value threaded through the chain.
enum Stage {
    Config(HttpResult<RequestConfig>),
    Done(HttpResult<Response>),
}

struct ClientInner {
    /// Defaults as the client was built; `create` merges over these.
    initial_defaults: RequestConfig,
    defaults: RwLock<RequestConfig>,
    interceptors: Interceptors,
    dispatcher: Dispatcher,
}

/// A promise-style HTTP client.
///
/// Cloning is cheap; clones share defaults, interceptors and transport.
///
/// # Example
///
/// ```rust,no_run
/// use integrations_http_client::{HttpClient, RequestConfig};
/// use serde_json::json;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = HttpClient::builder()
///         .base_url("https://api.example.com")
///         .header("X-Client", "docs")
///         .build()?;
///
///     client.interceptors().request.use_fn(|config| Ok(config.header("X-Trace", "1")));
///
///     let user = client.get("/users/1", None).await?;
///     println!("{:?}", user.data());
///
///     let created = client
///         .post("/users", json!({"name": "Ada"}), RequestConfig::new().timeout_ms(5_000))
///         .await?;
///     println!("{}", created.status());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<ClientInner>,
}

impl HttpClient {
    /// Creates a new client builder.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    /// Creates a client with library defaults and the reqwest transport.
    pub fn new() -> HttpResult<Self> {
        HttpClientBuilder::new().build()
    }

    /// Creates a client from environment variables.
    ///
    /// Reads `HTTP_CLIENT_BASE_URL`, `HTTP_CLIENT_TIMEOUT_MS` and
    /// `HTTP_CLIENT_MAX_REDIRECTS`, all optional.
    pub fn from_env() -> HttpResult<Self> {
        HttpClientBuilder::from_env()?.build()
    }

    /// Creates a client with library defaults over `transport`.
    pub fn with_transport(transport: Arc<dyn HttpTransport>) -> Self {
        Self::from_parts(RequestConfig::library_defaults(), Dispatcher::new(transport))
    }

    fn from_parts(defaults: RequestConfig, dispatcher: Dispatcher) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                initial_defaults: defaults.clone(),
                defaults: RwLock::new(defaults),
                interceptors: Interceptors::default(),
                dispatcher,
            }),
        }
    }

    /// Creates a child client.
    ///
    /// The child's defaults are `config` merged over the defaults this client
    /// was built with; later [`update_defaults`](Self::update_defaults) edits
    /// are not inherited. It shares the transport but starts with no
    /// interceptors.
    pub fn create(&self, config: RequestConfig) -> HttpClient {
        let defaults = self.inner.initial_defaults.merge(&config);
        let transport = Arc::clone(self.inner.dispatcher.transport());
        Self::from_parts(defaults, Dispatcher::new(transport))
    }

    /// Returns a copy of the defaults.
    pub fn defaults(&self) -> RequestConfig {
        self.inner
            .defaults
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Edits the defaults. Calls already in flight are unaffected.
    ///
    /// `f` runs on a copy, so it may read the client freely; the copy
    /// replaces the defaults once `f` returns.
    pub fn update_defaults<F>(&self, f: F)
    where
        F: FnOnce(&mut RequestConfig),
    {
        let mut updated = self.defaults();
        f(&mut updated);
        *self
            .inner
            .defaults
            .write()
            .unwrap_or_else(PoisonError::into_inner) = updated;
    }

    /// Returns the interceptor registries.
    pub fn interceptors(&self) -> &Interceptors {
        &self.inner.interceptors
    }

    /// Number of timeout timers currently running.
    pub fn active_timers(&self) -> usize {
        self.inner.dispatcher.active_timers()
    }

    /// Resolves the URL a config would be sent to, without sending it.
    pub fn get_uri(&self, config: &RequestConfig) -> HttpResult<String> {
        let merged = self.defaults().merge(config);
        build_url(
            merged.base_url.as_deref(),
            merged.url.as_deref().unwrap_or_default(),
            merged.params.as_ref(),
        )
    }

    /// Sends a request.
    ///
    /// Fails with [`HttpClientError::Configuration`] before any interceptor
    /// runs if the merged config has neither a URL nor a base URL.
    #[instrument(skip(self, config), fields(url = config.url.as_deref().unwrap_or_default()))]
    pub async fn request(&self, config: RequestConfig) -> HttpResult<Response> {
        let mut merged = self.defaults().merge(&config);
        merged.method = Some(merged.effective_method());
        merged.validate()?;

        let mut chain = VecDeque::from([Step::Dispatch]);
        for interceptor in self.inner.interceptors.request.snapshot() {
            chain.push_front(Step::Request(interceptor));
        }
        for interceptor in self.inner.interceptors.response.snapshot() {
            chain.push_back(Step::Response(interceptor));
        }

        let mut stage = Stage::Config(Ok(merged));
        for step in chain {
            stage = self.run_step(step, stage).await;
        }

        match stage {
            Stage::Done(result) => result,
            Stage::Config(result) => result.and_then(|_| {
                Err(HttpClientError::configuration(
                    "request chain ended before dispatch",
                ))
            }),
        }
    }

    async fn run_step(&self, step: Step, stage: Stage) -> Stage {
        match (step, stage) {
            (Step::Request(interceptor), Stage::Config(state)) => {
                Stage::Config(interceptor.apply(state).await)
            }
            (Step::Dispatch, Stage::Config(Ok(config))) => {
                Stage::Done(self.inner.dispatcher.dispatch(config).await)
            }
            (Step::Dispatch, Stage::Config(Err(err))) => Stage::Done(Err(err)),
            (Step::Response(interceptor), Stage::Done(state)) => {
                Stage::Done(interceptor.apply(state).await)
            }
            (_, stage) => stage,
        }
    }

    /// Sends a request to `url`.
    pub async fn request_url(
        &self,
        url: impl Into<String>,
        config: impl Into<Option<RequestConfig>>,
    ) -> HttpResult<Response> {
        let config = config.into().unwrap_or_default().url(url);
        self.request(config).await
    }

    async fn without_body(
        &self,
        method: HttpMethod,
        url: String,
        config: Option<RequestConfig>,
    ) -> HttpResult<Response> {
        let config = config.unwrap_or_default().url(url).method(method);
        self.request(config).await
    }

    async fn with_body(
        &self,
        method: HttpMethod,
        url: String,
        data: Payload,
        config: Option<RequestConfig>,
    ) -> HttpResult<Response> {
        let config = config.unwrap_or_default().url(url).method(method).data(data);
        self.request(config).await
    }

    /// Sends a GET request.
    pub async fn get(
        &self,
        url: impl Into<String>,
        config: impl Into<Option<RequestConfig>>,
    ) -> HttpResult<Response> {
        self.without_body(HttpMethod::Get, url.into(), config.into())
            .await
    }

    /// Sends a DELETE request.
    pub async fn delete(
        &self,
        url: impl Into<String>,
        config: impl Into<Option<RequestConfig>>,
    ) -> HttpResult<Response> {
        self.without_body(HttpMethod::Delete, url.into(), config.into())
            .await
    }

    /// Sends a HEAD request.
    pub async fn head(
        &self,
        url: impl Into<String>,
        config: impl Into<Option<RequestConfig>>,
    ) -> HttpResult<Response> {
        self.without_body(HttpMethod::Head, url.into(), config.into())
            .await
    }

    /// Sends an OPTIONS request.
    pub async fn options(
        &self,
        url: impl Into<String>,
        config: impl Into<Option<RequestConfig>>,
    ) -> HttpResult<Response> {
        self.without_body(HttpMethod::Options, url.into(), config.into())
            .await
    }

    /// Sends a POST request with `data`.
    pub async fn post(
        &self,
        url: impl Into<String>,
        data: impl Into<Payload>,
        config: impl Into<Option<RequestConfig>>,
    ) -> HttpResult<Response> {
        self.with_body(HttpMethod::Post, url.into(), data.into(), config.into())
            .await
    }

    /// Sends a PUT request with `data`.
    pub async fn put(
        &self,
        url: impl Into<String>,
        data: impl Into<Payload>,
        config: impl Into<Option<RequestConfig>>,
    ) -> HttpResult<Response> {
        self.with_body(HttpMethod::Put, url.into(), data.into(), config.into())
            .await
    }

    /// Sends a PATCH request with `data`.
    pub async fn patch(
        &self,
        url: impl Into<String>,
        data: impl Into<Payload>,
        config: impl Into<Option<RequestConfig>>,
    ) -> HttpResult<Response> {
        self.with_body(HttpMethod::Patch, url.into(), data.into(), config.into())
            .await
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("defaults", &self.defaults().snapshot())
            .field("interceptors", &self.inner.interceptors)
            .finish_non_exhaustive()
    }
}

/// Waits for every request, failing with the first error.
pub async fn all<I, F, T>(requests: I) -> HttpResult<Vec<T>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = HttpResult<T>>,
{
    futures::future::try_join_all(requests).await
}

/// Adapts a function over a slice into one that takes the vector produced by
/// [`all`].
pub fn spread<T, R, F>(f: F) -> impl Fn(Vec<T>) -> R
where
    F: Fn(&[T]) -> R,
{
    move |values| f(&values)
}

/// Builder for [`HttpClient`].
pub struct HttpClientBuilder {
    defaults: RequestConfig,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl HttpClientBuilder {
    /// Creates a new client builder.
    pub fn new() -> Self {
        Self {
            defaults: RequestConfig::new(),
            transport: None,
        }
    }

    /// Creates a builder seeded from environment variables.
    pub fn from_env() -> HttpResult<Self> {
        Ok(Self::new().defaults(RequestConfig::from_env()?))
    }

    /// Merges `config` into the client defaults.
    pub fn defaults(mut self, config: RequestConfig) -> Self {
        self.defaults = self.defaults.merge(&config);
        self
    }

    /// Sets the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.defaults.base_url = Some(base_url.into());
        self
    }

    /// Sets the default timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.defaults.timeout = Some(timeout);
        self
    }

    /// Adds a header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.headers.set_common(name, value);
        self
    }

    /// Sets the redirect limit handed to the default transport.
    pub fn max_redirects(mut self, limit: u32) -> Self {
        self.defaults.max_redirects = Some(limit);
        self
    }

    /// Sets a custom transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the client.
    pub fn build(self) -> HttpResult<HttpClient> {
        let defaults = RequestConfig::library_defaults().merge(&self.defaults);

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(t) => t,
            None => Arc::new(
                ReqwestTransport::with_max_redirects(
                    defaults.max_redirects.unwrap_or(DEFAULT_MAX_REDIRECTS),
                )
                .map_err(|e| HttpClientError::configuration(e.to_string()))?,
            ),
        };

        Ok(HttpClient::from_parts(defaults, Dispatcher::new(transport)))
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HttpClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClientBuilder")
            .field("defaults", &self.defaults.snapshot())
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}
