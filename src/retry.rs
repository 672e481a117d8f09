//! リトライ制御
//!
//! 各試行は独立しており、失敗した試行の状態は次の試行へ持ち越さない。

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::backoff::BackoffPolicy;
use crate::error::{Result, ScraperError};
use crate::types::AttemptContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub per_attempt_timeout: Duration,
    pub backoff: BackoffPolicy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            per_attempt_timeout: Duration::from_millis(5000),
            backoff: BackoffPolicy::default(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, per_attempt_timeout: Duration) -> Self {
        Self {
            max_attempts,
            per_attempt_timeout,
            ..Default::default()
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}

/// `action` を最大 `max_attempts` 回実行
///
/// 成功した時点で即座に返す。失敗のたびに `backoff_for(attempt)` だけ待機し、
/// 全試行が失敗すると `RetriesExhausted` を返す。
pub async fn run_with_retries<T, F, Fut>(policy: &RetryPolicy, mut action: F) -> Result<T>
where
    F: FnMut(AttemptContext) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        let ctx = AttemptContext {
            attempt,
            max_attempts,
            per_attempt_timeout: policy.per_attempt_timeout,
        };

        match action(ctx).await {
            Ok(value) => {
                if attempt > 1 {
                    info!("Succeeded on attempt {}/{}", attempt, max_attempts);
                }
                return Ok(value);
            }
            Err(e) => {
                warn!(
                    "Attempt {}/{} failed at {:?} stage: {}",
                    attempt,
                    max_attempts,
                    e.stage(),
                    e
                );
                last_error = Some(e);
            }
        }

        if !ctx.is_last() {
            let backoff = policy.backoff.backoff_for(attempt);
            info!("Retrying in {:?}", backoff);
            sleep(backoff).await;
        }
    }

    Err(ScraperError::RetriesExhausted {
        attempts: max_attempts,
        last: Box::new(
            last_error.unwrap_or_else(|| ScraperError::Unclassified("no attempt was made".into())),
        ),
    })
}
