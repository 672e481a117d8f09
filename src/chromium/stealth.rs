//! 自動化検出対策の静的設定

use chromiumoxide::cdp::browser_protocol::network::{
    Headers, SetExtraHttpHeadersParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::Page;
use rand::seq::SliceRandom;
use tracing::info;

use crate::error::{Result, ScraperError};

pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.5 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
];

/// `navigator.webdriver` を隠す
pub const INIT_SCRIPT: &str =
    "Object.defineProperty(navigator, 'webdriver', {get: () => undefined});";

pub const LAUNCH_ARGS: &[&str] = &["--disable-blink-features=AutomationControlled", "--lang=en-US"];

pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

pub const WINDOW_SIZE: (u32, u32) = (1280, 800);

pub fn pick_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// ページに UA・言語ヘッダ・初期化スクリプトを適用
pub async fn apply(page: &Page, user_agent: &str) -> Result<()> {
    let ua_params = SetUserAgentOverrideParams::builder()
        .user_agent(user_agent)
        .accept_language(ACCEPT_LANGUAGE)
        .build()
        .map_err(ScraperError::BrowserInit)?;
    page.execute(ua_params)
        .await
        .map_err(|e| ScraperError::BrowserInit(format!("user agent: {}", e)))?;

    let headers = Headers::new(serde_json::json!({ "Accept-Language": ACCEPT_LANGUAGE }));
    page.execute(SetExtraHttpHeadersParams::new(headers))
        .await
        .map_err(|e| ScraperError::BrowserInit(format!("extra headers: {}", e)))?;

    page.execute(AddScriptToEvaluateOnNewDocumentParams::new(INIT_SCRIPT))
        .await
        .map_err(|e| ScraperError::BrowserInit(format!("init script: {}", e)))?;

    info!("Using UA: {}", user_agent);
    Ok(())
}
