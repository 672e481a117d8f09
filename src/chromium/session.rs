use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ScraperConfig;
use crate::error::{Result, ScraperError};

use super::driver::ChromiumDriver;
use super::stealth;

/// ブラウザ・ハンドラタスク・ページをまとめて所有するセッション
///
/// `close()` で明示的に解放する。それ以外の経路でも `Drop` でハンドラタスクを止め、
/// `Browser` 自身の drop が子プロセスを終了させる。
pub struct ChromiumSession {
    browser: Option<Browser>,
    handler: JoinHandle<()>,
    driver: ChromiumDriver,
}

impl ChromiumSession {
    pub async fn launch(config: &ScraperConfig) -> Result<Self> {
        info!("Initializing browser (headless={})...", config.headless);

        let (width, height) = stealth::WINDOW_SIZE;
        let mut builder = BrowserConfig::builder()
            .window_size(width, height)
            .request_timeout(Duration::from_secs(60))
            .args(stealth::LAUNCH_ARGS.iter().copied());

        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        let browser_config = builder
            .build()
            .map_err(|e| ScraperError::BrowserInit(format!("ブラウザ設定エラー: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {}", e);
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(ScraperError::BrowserInit(e.to_string()));
            }
        };

        let user_agent = user_agent_for(config);
        let session = Self {
            browser: Some(browser),
            handler,
            driver: ChromiumDriver::new(page),
        };
        stealth::apply(session.driver.page(), user_agent).await?;

        info!("Browser initialized successfully");
        Ok(session)
    }

    pub fn driver(&self) -> &ChromiumDriver {
        &self.driver
    }

    pub async fn close(mut self) -> Result<()> {
        info!("Closing browser...");
        if let Some(mut browser) = self.browser.take() {
            browser
                .close()
                .await
                .map_err(|e| ScraperError::BrowserInit(format!("close: {}", e)))?;
            if let Err(e) = browser.wait().await {
                warn!("Browser process did not exit cleanly: {}", e);
            }
        }
        self.handler.abort();
        Ok(())
    }
}

/// 設定のUAがなければプールから選ぶ
fn user_agent_for(config: &ScraperConfig) -> &str {
    config
        .user_agent
        .as_deref()
        .unwrap_or_else(|| stealth::pick_user_agent())
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}
