//! 人間らしい待機時間とリトライ間隔の計算
//!
//! どちらも待機時間を返すだけで、実際の待機は呼び出し側が行う。

use std::time::Duration;

use rand::Rng;

/// 線形＋上限のバックオフ（指数ではない）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(2),
            cap: Duration::from_secs(6),
        }
    }
}

impl BackoffPolicy {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// `min(base * attempt, cap)`
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(attempt).min(self.cap)
    }
}

/// 一様乱数のジッター範囲
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterPolicy {
    pub min: Duration,
    pub max: Duration,
}

impl Default for JitterPolicy {
    fn default() -> Self {
        Self::from_millis(1200, 2800)
    }
}

impl JitterPolicy {
    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min: Duration::from_millis(min_ms),
            max: Duration::from_millis(max_ms),
        }
    }

    /// クリック後の安定待ち
    pub fn settle() -> Self {
        Self::from_millis(1000, 2000)
    }

    pub fn sample(&self) -> Duration {
        delay_before_action(self.min, self.max)
    }
}

/// `[min, max]` から一様に選んだ待機時間
pub fn delay_before_action(min: Duration, max: Duration) -> Duration {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    let lo_ms = lo.as_millis() as u64;
    let hi_ms = hi.as_millis() as u64;
    Duration::from_millis(rand::thread_rng().gen_range(lo_ms..=hi_ms))
}
