//! DOM準備待ち

use std::time::Duration;

use tokio::time::timeout;
use tracing::debug;

use crate::error::{Result, ScraperError};
use crate::traits::PageDriver;

/// `selector` に一致する要素が現れるまで待機
///
/// タイムアウトは `ElementTimeout` になり、ナビゲーション系の失敗とは区別される。
pub async fn await_elements<D: PageDriver>(
    driver: &D,
    selector: &str,
    wait: Duration,
) -> Result<()> {
    debug!("Waiting for elements: {} (timeout {:?})", selector, wait);

    let element_timeout = || ScraperError::ElementTimeout {
        selector: selector.to_string(),
        timeout_ms: wait.as_millis() as u64,
    };

    match timeout(wait, driver.wait_for_elements(selector, wait)).await {
        Ok(Ok(())) => {
            debug!("Elements ready: {}", selector);
            Ok(())
        }
        Ok(Err(ScraperError::ElementTimeout { .. })) | Err(_) => Err(element_timeout()),
        Ok(Err(e)) => Err(e),
    }
}
