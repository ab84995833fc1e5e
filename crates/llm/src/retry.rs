//! Bounded retry with exponential backoff for provider calls.
//!
//! Transport failures and throttling (HTTP 429) or server errors (5xx) are
//! retried; other client errors fail immediately.

use scholar_core::{AppError, AppResult};
use std::future::Future;
use std::time::Duration;

/// Outcome classification for a single provider call attempt.
#[derive(Debug)]
pub enum CallError {
    /// Transient failure worth retrying (connection error, 429, 5xx)
    Retryable(AppError),

    /// Permanent failure (bad request, missing key, parse error)
    Fatal(AppError),
}

impl CallError {
    /// Classify an HTTP status plus error body into a call error.
    pub fn from_status(status: reqwest::StatusCode, error: AppError) -> Self {
        if status.as_u16() == 429 || status.is_server_error() {
            CallError::Retryable(error)
        } else {
            CallError::Fatal(error)
        }
    }

    fn into_inner(self) -> AppError {
        match self {
            CallError::Retryable(e) | CallError::Fatal(e) => e,
        }
    }
}

impl From<reqwest::Error> for CallError {
    fn from(err: reqwest::Error) -> Self {
        // Connection-level failures are always transient
        CallError::Retryable(AppError::Llm(format!("Request failed: {}", err)))
    }
}

/// Retry policy for provider calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts (including the first)
    pub max_attempts: u32,

    /// Initial backoff duration in milliseconds, doubled per attempt
    pub initial_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 200,
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds, fails fatally, or attempts are exhausted.
    ///
    /// # Arguments
    /// * `op_name` - Short label for log lines (e.g., "openai.complete")
    /// * `op` - The fallible call, invoked once per attempt
    pub async fn run<T, F, Fut>(&self, op_name: &str, mut op: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CallError>>,
    {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt < self.max_attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(CallError::Fatal(e)) => return Err(e),
                Err(CallError::Retryable(e)) => {
                    attempt += 1;
                    last_error = Some(e);

                    if attempt < self.max_attempts {
                        let backoff_ms = self.initial_backoff_ms * 2_u64.pow(attempt - 1);
                        tracing::warn!(
                            "{} failed (attempt {}/{}), retrying in {}ms",
                            op_name,
                            attempt,
                            self.max_attempts,
                            backoff_ms
                        );
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    }
                }
            }
        }

        Err(last_error
            .map(|e| AppError::Llm(format!("{} failed after {} attempts: {}", op_name, self.max_attempts, e)))
            .unwrap_or_else(|| AppError::Llm(format!("{} failed", op_name))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_first_attempt() {
        let policy = RetryPolicy::default();
        let result: AppResult<u32> = policy.run("test", || async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_backoff_ms: 1,
        };
        let calls = AtomicU32::new(0);

        let result: AppResult<u32> = policy
            .run("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(CallError::Retryable(AppError::Llm("boom".to_string())))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_error_stops_immediately() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff_ms: 1,
        };
        let calls = AtomicU32::new(0);

        let result: AppResult<u32> = policy
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(CallError::Fatal(AppError::Llm("bad request".to_string()))) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let policy = RetryPolicy {
            max_attempts: 2,
            initial_backoff_ms: 1,
        };

        let result: AppResult<u32> = policy
            .run("test", || async {
                Err(CallError::Retryable(AppError::Llm("overloaded".to_string())))
            })
            .await;

        let err = result.unwrap_err().to_string();
        assert!(err.contains("after 2 attempts"));
    }

    #[test]
    fn test_status_classification() {
        use reqwest::StatusCode;

        let retryable = CallError::from_status(
            StatusCode::TOO_MANY_REQUESTS,
            AppError::Llm("rate limited".to_string()),
        );
        assert!(matches!(retryable, CallError::Retryable(_)));

        let fatal = CallError::from_status(
            StatusCode::BAD_REQUEST,
            AppError::Llm("invalid".to_string()),
        );
        assert!(matches!(fatal, CallError::Fatal(_)));

        let server = CallError::from_status(
            StatusCode::SERVICE_UNAVAILABLE,
            AppError::Llm("down".to_string()),
        );
        assert!(matches!(server, CallError::Retryable(_)));
    }
}
