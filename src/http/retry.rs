// Retry policy for calls to the genomics service.
// Transient failures (connection errors, timeouts, 5xx) are retried with
// exponential backoff; every 4xx is final.

use reqwest_middleware::Error as MiddlewareError;
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::{default_on_request_failure, RetryTransientMiddleware, Retryable, RetryableStrategy};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt; zero disables retrying
    pub max_retries: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 4,
            min_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> ExponentialBackoff {
        let max_backoff = self.max_backoff.max(self.min_backoff);

        ExponentialBackoff::builder()
            .retry_bounds(self.min_backoff, max_backoff)
            .build_with_max_retries(self.max_retries)
    }

    pub fn middleware(&self) -> RetryTransientMiddleware<ExponentialBackoff, TransientServerErrors> {
        RetryTransientMiddleware::new_with_policy_and_strategy(self.policy(), TransientServerErrors)
    }
}

/// Retry network failures and 5xx responses only.
///
/// The stock strategy also retries 408 and 429; the genomics service never
/// uses those to signal back-pressure, so every 4xx is treated as final.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransientServerErrors;

impl RetryableStrategy for TransientServerErrors {
    fn handle(&self, res: &Result<reqwest::Response, MiddlewareError>) -> Option<Retryable> {
        match res {
            Ok(response) if response.status().is_server_error() => {
                warn!(status = %response.status(), url = %response.url(), "Retryable server error");
                Some(Retryable::Transient)
            }
            Ok(response) if response.status().is_success() => None,
            Ok(_) => Some(Retryable::Fatal),
            Err(error) => {
                let retryable = default_on_request_failure(error);
                if matches!(retryable, Some(Retryable::Transient)) {
                    warn!(error = %error, "Retryable request failure");
                }
                retryable
            }
        }
    }
}
