//! Fixed-interval retry policy shared by every outbound call
//!
//! The same [`RetryPolicy`] drives both execution paths: [`RetryPolicy::run_blocking`]
//! sleeps the calling thread between attempts, [`RetryPolicy::run`] yields to the
//! tokio scheduler instead. Every error is retry-eligible.

use crate::config::RetryConfig;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Callback invoked before every attempt after the first, with the attempt number
pub type OnRetry = Arc<dyn Fn(u32) + Send + Sync>;

/// Outcome of a call whose every attempt failed
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Fixed-interval retry policy
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    wait: Duration,
    on_retry: Option<OnRetry>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(10, Duration::from_secs(10))
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("wait", &self.wait)
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}

impl RetryPolicy {
    /// Create a policy. At least one attempt is always made.
    pub fn new(max_attempts: u32, wait: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            wait,
            on_retry: None,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.wait())
    }

    /// Register a callback fired before each retry
    pub fn with_on_retry<F>(mut self, callback: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(callback));
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }

    fn before_attempt(&self, attempt: u32) {
        if attempt > 1 {
            info!(attempt, "Retrying API call. Attempt #{}", attempt);
            if let Some(callback) = &self.on_retry {
                callback(attempt);
            }
        }
    }

    /// Run a blocking operation under this policy
    pub fn run_blocking<T, E, F>(&self, mut op: F) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut(u32) -> Result<T, E>,
        E: fmt::Display,
    {
        let mut attempt = 1;
        loop {
            self.before_attempt(attempt);

            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_attempts => {
                    return Err(RetryExhausted { attempts: attempt, last_error: e });
                }
                Err(e) => {
                    warn!(attempt, error = %e, "API call failed, retrying in {:?}", self.wait);
                    std::thread::sleep(self.wait);
                    attempt += 1;
                }
            }
        }
    }

    /// Run an async operation under this policy
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut attempt = 1;
        loop {
            self.before_attempt(attempt);

            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_attempts => {
                    return Err(RetryExhausted { attempts: attempt, last_error: e });
                }
                Err(e) => {
                    warn!(attempt, error = %e, "API call failed, retrying in {:?}", self.wait);
                    tokio::time::sleep(self.wait).await;
                    attempt += 1;
                }
            }
        }
    }
}
