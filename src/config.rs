use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::backoff::{BackoffPolicy, JitterPolicy};
use crate::network::DEFAULT_PREVIEW_LEN;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub max_retries: u32,
    /// 1試行あたりのタイムアウト
    pub timeout: Duration,
    pub max_pages: u32,
    pub headless: bool,
    pub backoff: BackoffPolicy,
    /// 「次へ」クリック前のジッター
    pub jitter: JitterPolicy,
    /// 「次へ」クリック後の安定待ち
    pub settle: JitterPolicy,
    pub body_preview_len: usize,
    pub chrome_path: Option<String>,
    pub user_agent: Option<String>,
    pub diagnostics_dir: Option<PathBuf>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            timeout: Duration::from_millis(5000),
            max_pages: 3,
            headless: true,
            backoff: BackoffPolicy::default(),
            jitter: JitterPolicy::default(),
            settle: JitterPolicy::settle(),
            body_preview_len: DEFAULT_PREVIEW_LEN,
            chrome_path: None,
            user_agent: None,
            diagnostics_dir: None,
        }
    }
}

impl ScraperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 環境変数で既定値を上書き
    ///
    /// `SCRAPER_MAX_RETRIES`, `SCRAPER_TIMEOUT_MS`, `SCRAPER_MAX_PAGES`,
    /// `SCRAPER_HEADLESS`, `SCRAPER_DIAGNOSTICS_DIR`, `CHROME_PATH`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();

        Self {
            max_retries: parsed(&lookup, "SCRAPER_MAX_RETRIES").unwrap_or(default.max_retries),
            timeout: parsed(&lookup, "SCRAPER_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(default.timeout),
            max_pages: parsed(&lookup, "SCRAPER_MAX_PAGES").unwrap_or(default.max_pages),
            headless: parsed(&lookup, "SCRAPER_HEADLESS").unwrap_or(default.headless),
            diagnostics_dir: lookup("SCRAPER_DIAGNOSTICS_DIR").map(PathBuf::from),
            chrome_path: lookup("CHROME_PATH").or_else(|| lookup("CHROMIUM_PATH")),
            ..default
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_jitter(mut self, jitter: JitterPolicy) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_settle(mut self, settle: JitterPolicy) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_body_preview_len(mut self, len: usize) -> Self {
        self.body_preview_len = len;
        self
    }

    pub fn with_chrome_path(mut self, path: impl Into<String>) -> Self {
        self.chrome_path = Some(path.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_diagnostics_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.diagnostics_dir = Some(dir.into());
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.timeout).with_backoff(self.backoff)
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}
