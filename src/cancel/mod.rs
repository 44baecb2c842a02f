//! Cooperative cancellation.
//!
//! A [`CancelToken`] pairs an abort signal (a
//! [`tokio_util::sync::CancellationToken`] handed to the transport) with a
//! reason that is set at most once. The dispatcher checks the reason before
//! building the URL and again after the transport settles; the transport
//! watches the signal while the request is in flight.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::errors::{HttpClientError, HttpResult};

/// The reason a request was cancelled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cancel {
    message: Option<String>,
}

impl Cancel {
    /// Creates a cancellation reason with an optional message.
    pub fn new(message: Option<String>) -> Self {
        Self { message }
    }

    /// Returns the message, if one was given.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for Cancel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "Cancel: {message}"),
            None => f.write_str("Cancel"),
        }
    }
}

impl std::error::Error for Cancel {}

/// Returns true if the error is a cancellation rather than a failure.
pub fn is_cancel(error: &HttpClientError) -> bool {
    error.is_cancel()
}

struct TokenInner {
    signal: CancellationToken,
    reason: OnceCell<Cancel>,
}

impl TokenInner {
    fn cancel(&self, message: Option<&str>) {
        if self
            .reason
            .set(Cancel::new(message.map(str::to_owned)))
            .is_ok()
        {
            tracing::debug!(message = ?message, "Cancel token fired");
            self.signal.cancel();
        }
    }
}

/// A one-shot cancellation token shared between a caller and its requests.
///
/// Cloning is cheap; all clones observe the same reason and signal.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

impl CancelToken {
    /// Creates a token and immediately runs `executor` with its canceller.
    ///
    /// # Example
    ///
    /// ```rust
    /// use integrations_http_client::CancelToken;
    ///
    /// let mut stash = None;
    /// let token = CancelToken::new(|cancel| stash = Some(cancel));
    ///
    /// stash.unwrap().cancel(Some("user left the page"));
    /// assert_eq!(token.reason().unwrap().message(), Some("user left the page"));
    /// ```
    pub fn new<F>(executor: F) -> Self
    where
        F: FnOnce(Canceller),
    {
        let inner = Arc::new(TokenInner {
            signal: CancellationToken::new(),
            reason: OnceCell::new(),
        });
        executor(Canceller {
            inner: Arc::clone(&inner),
        });
        Self { inner }
    }

    /// Creates a token together with its canceller.
    pub fn source() -> CancelTokenSource {
        let mut canceller = None;
        let token = CancelToken::new(|cancel| canceller = Some(cancel));
        let canceller = canceller.unwrap_or_else(|| Canceller {
            inner: Arc::clone(&token.inner),
        });
        CancelTokenSource { token, canceller }
    }

    /// Returns the cancellation reason once the token has fired.
    pub fn reason(&self) -> Option<&Cancel> {
        self.inner.reason.get()
    }

    /// Returns true once the token has fired.
    pub fn is_cancelled(&self) -> bool {
        self.inner.reason.get().is_some()
    }

    /// Returns the abort signal observed by transports.
    pub fn signal(&self) -> CancellationToken {
        self.inner.signal.clone()
    }

    /// Fails with the cancellation reason if the token has fired.
    pub fn throw_if_requested(&self) -> HttpResult<()> {
        match self.reason() {
            Some(reason) => Err(HttpClientError::Cancelled(reason.clone())),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("reason", &self.reason())
            .finish()
    }
}

/// The function side of a token: fires it with an optional message.
#[derive(Clone)]
pub struct Canceller {
    inner: Arc<TokenInner>,
}

impl Canceller {
    /// Fires the token. Only the first call has any effect.
    pub fn cancel(&self, message: Option<&str>) {
        self.inner.cancel(message);
    }
}

impl fmt::Debug for Canceller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canceller").finish_non_exhaustive()
    }
}

/// A token and its canceller, as returned by [`CancelToken::source`].
#[derive(Debug, Clone)]
pub struct CancelTokenSource {
    /// The token to attach to requests.
    pub token: CancelToken,
    /// The canceller that fires `token`.
    pub canceller: Canceller,
}

impl CancelTokenSource {
    /// Fires the token.
    pub fn cancel(&self, message: Option<&str>) {
        self.canceller.cancel(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executor_runs_synchronously() {
        let mut ran = false;
        let _token = CancelToken::new(|_| ran = true);
        assert!(ran);
    }

    #[test]
    fn test_first_cancel_wins() {
        let source = CancelToken::source();
        assert!(source.token.reason().is_none());

        source.cancel(Some("first"));
        source.cancel(Some("second"));

        assert_eq!(source.token.reason().unwrap().message(), Some("first"));
        assert!(source.token.signal().is_cancelled());
    }

    #[test]
    fn test_cancel_without_message() {
        let source = CancelToken::source();
        source.cancel(None);

        let reason = source.token.reason().unwrap();
        assert_eq!(reason.message(), None);
        assert_eq!(reason.to_string(), "Cancel");
    }

    #[test]
    fn test_throw_if_requested() {
        let source = CancelToken::source();
        assert!(source.token.throw_if_requested().is_ok());

        source.cancel(Some("stop"));
        let err = source.token.throw_if_requested().unwrap_err();
        assert!(is_cancel(&err));
        assert_eq!(err.to_string(), "Cancel: stop");
    }

    #[test]
    fn test_clones_share_state() {
        let source = CancelToken::source();
        let clone = source.token.clone();
        source.cancel(None);
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_is_cancel_rejects_other_errors() {
        let err = HttpClientError::configuration("bad");
        assert!(!is_cancel(&err));
    }
}
