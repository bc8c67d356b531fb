//! Bounded-concurrency request queue for AI calls.
//!
//! Every task acquires a permit, waits a fixed inter-request delay (to stay
//! under the provider's rate limits) and then runs. Rate-limited responses
//! are retried with exponential backoff plus jitter up to a retry cap, after
//! which the error is returned to the caller. Non-rate-limit errors pass
//! through immediately.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Semaphore;
use tracing::warn;

use super::provider::ProviderError;

pub struct RequestQueue {
    semaphore: Arc<Semaphore>,
    request_delay: Duration,
    max_retries: u32,
    base_backoff: Duration,
}

impl RequestQueue {
    pub fn new(max_concurrency: usize, request_delay_ms: u64, max_retries: u32) -> Self {
        Self::with_backoff(
            max_concurrency,
            request_delay_ms,
            max_retries,
            Duration::from_millis(1000),
        )
    }

    pub fn with_backoff(
        max_concurrency: usize,
        request_delay_ms: u64,
        max_retries: u32,
        base_backoff: Duration,
    ) -> Self {
        RequestQueue {
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
            request_delay: Duration::from_millis(request_delay_ms),
            max_retries,
            base_backoff,
        }
    }

    /// Run one task through the queue.
    pub async fn run<F, Fut, T>(&self, mut task: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        // The semaphore is never closed, so acquire cannot fail.
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("request queue semaphore closed");

        let mut attempt: u32 = 0;
        loop {
            tokio::time::sleep(self.request_delay).await;
            match task().await {
                Ok(value) => return Ok(value),
                Err(ProviderError::RateLimited) => {
                    if attempt >= self.max_retries {
                        warn!(
                            "AI request still rate limited after {} retries, giving up",
                            self.max_retries
                        );
                        return Err(ProviderError::RateLimited);
                    }
                    let backoff = self.base_backoff * 2u32.pow(attempt);
                    let jitter =
                        Duration::from_millis(rand::thread_rng().gen_range(0..=250));
                    warn!(
                        "AI request rate limited, retry {}/{} in {:?}",
                        attempt + 1,
                        self.max_retries,
                        backoff + jitter
                    );
                    tokio::time::sleep(backoff + jitter).await;
                    attempt += 1;
                }
                Err(other) => return Err(other),
            }
        }
    }
}
