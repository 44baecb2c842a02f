//! Request and response interceptors.
//!
//! An interceptor is a pair of optional async continuations: one runs when
//! the previous step succeeded, the other when it failed. A rejection handler
//! may recover by returning `Ok`.
//!
//! Managers keep interceptors in slots. Ejecting clears a slot without
//! shifting the others, so ids stay valid for the manager's lifetime.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::RequestConfig;
use crate::errors::{HttpClientError, HttpResult};
use crate::response::Response;

/// Future returned by interceptor handlers.
pub type InterceptorFuture<T> = Pin<Box<dyn Future<Output = HttpResult<T>> + Send>>;

/// Handler run on success.
pub type FulfilledHandler<T> = Arc<dyn Fn(T) -> InterceptorFuture<T> + Send + Sync>;

/// Handler run on failure.
pub type RejectedHandler<T> = Arc<dyn Fn(HttpClientError) -> InterceptorFuture<T> + Send + Sync>;

/// A pair of optional continuations.
pub struct Interceptor<T> {
    fulfilled: Option<FulfilledHandler<T>>,
    rejected: Option<RejectedHandler<T>>,
}

impl<T: Send + 'static> Interceptor<T> {
    /// Creates an interceptor that passes everything through.
    pub fn new() -> Self {
        Self {
            fulfilled: None,
            rejected: None,
        }
    }

    /// Sets the async success handler.
    pub fn on_fulfilled<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResult<T>> + Send + 'static,
    {
        self.fulfilled = Some(Arc::new(move |value| -> InterceptorFuture<T> {
            Box::pin(handler(value))
        }));
        self
    }

    /// Sets the async failure handler.
    pub fn on_rejected<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(HttpClientError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResult<T>> + Send + 'static,
    {
        self.rejected = Some(Arc::new(move |err| -> InterceptorFuture<T> {
            Box::pin(handler(err))
        }));
        self
    }

    /// Sets a synchronous success handler.
    pub fn map<F>(self, handler: F) -> Self
    where
        F: Fn(T) -> HttpResult<T> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        self.on_fulfilled(move |value| {
            let handler = Arc::clone(&handler);
            async move { handler(value) }
        })
    }

    /// Sets a synchronous failure handler.
    pub fn recover<F>(self, handler: F) -> Self
    where
        F: Fn(HttpClientError) -> HttpResult<T> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        self.on_rejected(move |err| {
            let handler = Arc::clone(&handler);
            async move { handler(err) }
        })
    }

    /// Returns true if a success handler is set.
    pub fn has_fulfilled(&self) -> bool {
        self.fulfilled.is_some()
    }

    /// Returns true if a failure handler is set.
    pub fn has_rejected(&self) -> bool {
        self.rejected.is_some()
    }

    /// Runs the handler matching `state`. A missing handler passes the
    /// state through unchanged.
    pub async fn apply(&self, state: HttpResult<T>) -> HttpResult<T> {
        match state {
            Ok(value) => match &self.fulfilled {
                Some(handler) => handler(value).await,
                None => Ok(value),
            },
            Err(err) => match &self.rejected {
                Some(handler) => handler(err).await,
                None => Err(err),
            },
        }
    }
}

impl<T: Send + 'static> Default for Interceptor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Interceptor<T> {
    fn clone(&self) -> Self {
        Self {
            fulfilled: self.fulfilled.clone(),
            rejected: self.rejected.clone(),
        }
    }
}

impl<T> fmt::Debug for Interceptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("fulfilled", &self.fulfilled.is_some())
            .field("rejected", &self.rejected.is_some())
            .finish()
    }
}

/// Identifies a registered interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterceptorId(usize);

/// An ordered registry of interceptors.
pub struct InterceptorManager<T> {
    slots: RwLock<Vec<Option<Interceptor<T>>>>,
}

impl<T: Send + 'static> InterceptorManager<T> {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
        }
    }

    /// Registers an interceptor and returns its id.
    pub fn use_interceptor(&self, interceptor: Interceptor<T>) -> InterceptorId {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.push(Some(interceptor));
        InterceptorId(slots.len() - 1)
    }

    /// Registers a synchronous success handler.
    pub fn use_fn<F>(&self, handler: F) -> InterceptorId
    where
        F: Fn(T) -> HttpResult<T> + Send + Sync + 'static,
    {
        self.use_interceptor(Interceptor::new().map(handler))
    }

    /// Registers an async success handler.
    pub fn use_async<F, Fut>(&self, handler: F) -> InterceptorId
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResult<T>> + Send + 'static,
    {
        self.use_interceptor(Interceptor::new().on_fulfilled(handler))
    }

    /// Removes an interceptor. Unknown or already ejected ids are ignored.
    pub fn eject(&self, id: InterceptorId) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get_mut(id.0) {
            *slot = None;
        }
    }

    /// Removes every interceptor. Previously issued ids are not reused.
    pub fn clear(&self) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        for slot in slots.iter_mut() {
            *slot = None;
        }
    }

    /// Calls `f` for each live interceptor in registration order.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&Interceptor<T>),
    {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        for interceptor in slots.iter().flatten() {
            f(interceptor);
        }
    }

    /// Clones the live interceptors in registration order.
    pub fn snapshot(&self) -> Vec<Interceptor<T>> {
        let mut live = Vec::new();
        self.for_each(|interceptor| live.push(interceptor.clone()));
        live
    }

    /// Number of live interceptors.
    pub fn len(&self) -> usize {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.iter().flatten().count()
    }

    /// Returns true if no interceptor is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Send + 'static> Default for InterceptorManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> fmt::Debug for InterceptorManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorManager")
            .field("live", &self.len())
            .finish()
    }
}

/// The two registries owned by a client.
#[derive(Debug, Default)]
pub struct Interceptors {
    /// Run before dispatch, last registered first.
    pub request: InterceptorManager<RequestConfig>,
    /// Run after dispatch, first registered first.
    pub response: InterceptorManager<Response>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ClassifiedError, ErrorKind};
    use crate::response::ResponseData;

    fn ids(manager: &InterceptorManager<u32>) -> Vec<u32> {
        let mut out = Vec::new();
        for interceptor in manager.snapshot() {
            let value = tokio_test::block_on(interceptor.apply(Ok(0))).unwrap();
            out.push(value);
        }
        out
    }

    #[test]
    fn test_eject_keeps_other_slots() {
        let manager = InterceptorManager::<u32>::new();
        let first = manager.use_fn(|_| Ok(1));
        let _second = manager.use_fn(|_| Ok(2));
        let third = manager.use_fn(|_| Ok(3));

        manager.eject(first);
        assert_eq!(ids(&manager), vec![2, 3]);

        manager.eject(first);
        assert_eq!(manager.len(), 2);

        manager.eject(third);
        assert_eq!(ids(&manager), vec![2]);
    }

    #[test]
    fn test_eject_unknown_id_is_silent() {
        let manager = InterceptorManager::<u32>::new();
        manager.use_fn(Ok);
        manager.eject(InterceptorId(42));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_clear_does_not_reuse_ids() {
        let manager = InterceptorManager::<u32>::new();
        let old = manager.use_fn(|_| Ok(1));
        manager.clear();
        assert!(manager.is_empty());

        let new = manager.use_fn(|_| Ok(2));
        assert_ne!(old, new);
        manager.eject(old);
        assert_eq!(ids(&manager), vec![2]);
    }

    #[tokio::test]
    async fn test_missing_handlers_pass_through() {
        let interceptor = Interceptor::<u32>::new();
        assert_eq!(interceptor.apply(Ok(5)).await.unwrap(), 5);

        let err = HttpClientError::configuration("boom");
        assert!(interceptor.apply(Err(err)).await.is_err());
    }

    #[tokio::test]
    async fn test_rejected_handler_can_recover() {
        let interceptor = Interceptor::<Response>::new().recover(|err| {
            err.into_response()
                .ok_or_else(|| HttpClientError::configuration("no response"))
        });

        let err: HttpClientError = ClassifiedError::new(ErrorKind::Status, "failed")
            .with_response(Response::new(404, ResponseData::Text("gone".to_string())))
            .into();

        let recovered = interceptor.apply(Err(err)).await.unwrap();
        assert_eq!(recovered.status(), 404);
    }

    #[tokio::test]
    async fn test_async_handler() {
        let manager = InterceptorManager::<RequestConfig>::new();
        manager.use_async(|config: RequestConfig| async move { Ok(config.header("X-Async", "1")) });

        let interceptor = manager.snapshot().remove(0);
        let config = interceptor.apply(Ok(RequestConfig::new())).await.unwrap();
        assert_eq!(config.headers.get("x-async"), Some("1"));
    }
}
