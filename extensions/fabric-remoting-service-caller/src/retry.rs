use crate::{RemotingError, ResolveError};
use fabric_remoting::TransportErrorKind;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits for retrying a call after a retriable failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationRetrySettings {
    /// Retries after the first attempt; `0` disables retrying.
    pub max_retry_count: u32,
    pub max_retry_backoff_on_transient: Duration,
    pub max_retry_backoff_on_non_transient: Duration,
}

impl Default for OperationRetrySettings {
    fn default() -> Self {
        Self {
            max_retry_count: 10,
            max_retry_backoff_on_transient: Duration::from_secs(2),
            max_retry_backoff_on_non_transient: Duration::from_secs(5),
        }
    }
}

impl OperationRetrySettings {
    pub fn with_max_retry_count(mut self, max_retry_count: u32) -> Self {
        self.max_retry_count = max_retry_count;
        self
    }

    pub fn with_max_retry_backoff_on_transient(mut self, backoff: Duration) -> Self {
        self.max_retry_backoff_on_transient = backoff;
        self
    }

    pub fn with_max_retry_backoff_on_non_transient(mut self, backoff: Duration) -> Self {
        self.max_retry_backoff_on_non_transient = backoff;
        self
    }

    /// A random delay up to the configured maximum.
    pub fn backoff(&self, transient: bool) -> Duration {
        let max = if transient {
            self.max_retry_backoff_on_transient
        } else {
            self.max_retry_backoff_on_non_transient
        };
        let max_millis = max.as_millis().min(u64::MAX as u128) as u64;
        if max_millis == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=max_millis))
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Give up and surface the error.
    Throw,
    Retry {
        /// Resolve the partition again before the next attempt.
        re_resolve: bool,
        delay: Duration,
    },
}

/// Classifies a failure. Returning `None` defers to the next handler in the
/// chain; when no handler claims the error the call fails.
pub trait ExceptionHandler: Send + Sync {
    fn handle(
        &self,
        error: &RemotingError,
        settings: &OperationRetrySettings,
    ) -> Option<RetryDecision>;
}

/// Handles transport and resolution failures.
///
/// Application faults and cancellation are always thrown: the handler ran,
/// so running it again could repeat its side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExceptionHandler {
    /// Retry with re-resolution when the remote object did not know the
    /// interface or method, e.g. while a new version rolls out.
    pub retry_on_dispatch_miss: bool,
}

impl DefaultExceptionHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retry_on_dispatch_miss(mut self, retry: bool) -> Self {
        self.retry_on_dispatch_miss = retry;
        self
    }
}

impl ExceptionHandler for DefaultExceptionHandler {
    fn handle(
        &self,
        error: &RemotingError,
        settings: &OperationRetrySettings,
    ) -> Option<RetryDecision> {
        let retry = |re_resolve: bool, transient: bool| RetryDecision::Retry {
            re_resolve,
            delay: settings.backoff(transient),
        };

        let decision = match error {
            RemotingError::Application(_) | RemotingError::Canceled => RetryDecision::Throw,
            RemotingError::Transport(err) => match err.kind {
                TransportErrorKind::Timeout => retry(false, true),
                TransportErrorKind::EndpointUnreachable
                | TransportErrorKind::ConnectionFaulted
                | TransportErrorKind::ObjectClosed => retry(true, false),
                TransportErrorKind::MessageTooLarge | TransportErrorKind::Protocol => {
                    RetryDecision::Throw
                }
            },
            RemotingError::Resolution(ResolveError::Transient(_)) => retry(true, true),
            RemotingError::Resolution(ResolveError::NoMatchingEndpoint { .. }) => {
                retry(true, false)
            }
            RemotingError::Resolution(ResolveError::NotFound { .. }) => RetryDecision::Throw,
            RemotingError::InterfaceNotFound { .. } | RemotingError::MethodNotFound { .. }
                if self.retry_on_dispatch_miss =>
            {
                retry(true, false)
            }
            _ => return None,
        };

        Some(decision)
    }
}
