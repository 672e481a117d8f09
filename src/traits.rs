use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, Instant};

use crate::error::{Result, ScraperError};
use crate::types::{MatchedResponse, NetworkExpectation};

/// 武装済みのレスポンス待機
pub type ResponseWatch = Pin<Box<dyn Future<Output = Result<MatchedResponse>> + Send>>;

const POLL_INITIAL_MS: u64 = 100;
const POLL_MAX_MS: u64 = 1000;

/// ブラウザ操作の能力セット
#[async_trait]
pub trait PageDriver: Send + Sync {
    type Element: Send + Sync;

    /// URLへ遷移
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// レスポンス待機を登録（ナビゲーション前に呼ぶこと）
    async fn arm_response(&self, expectation: &NetworkExpectation) -> Result<ResponseWatch>;

    /// 一致したレスポンスのボディ
    async fn response_body(&self, response: &MatchedResponse) -> Result<String>;

    async fn query_all(&self, selector: &str) -> Result<Vec<Self::Element>>;

    /// 要素配下で最初に一致する要素
    async fn find_within(
        &self,
        element: &Self::Element,
        selector: &str,
    ) -> Result<Option<Self::Element>>;

    async fn read_text(&self, element: &Self::Element) -> Result<String>;

    async fn read_attribute(&self, element: &Self::Element, name: &str) -> Result<Option<String>>;

    async fn click(&self, element: &Self::Element) -> Result<()>;

    /// フルページのPNG
    async fn screenshot(&self) -> Result<Vec<u8>>;

    async fn current_html(&self) -> Result<String>;

    /// `document.title`
    async fn title(&self) -> Result<String>;

    /// セレクタに一致する要素が1つ以上現れるまで待機
    ///
    /// 既定実装は `query_all` を100msから1sまで倍々の間隔でポーリングする。
    async fn wait_for_elements(&self, selector: &str, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let mut interval = Duration::from_millis(POLL_INITIAL_MS);

        loop {
            match self.query_all(selector).await {
                Ok(found) if !found.is_empty() => return Ok(()),
                Ok(_) => {}
                Err(e) => tracing::debug!("query_all({}) failed while waiting: {}", selector, e),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(ScraperError::ElementTimeout {
                    selector: selector.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }

            sleep(interval.min(deadline - now)).await;
            interval = (interval * 2).min(Duration::from_millis(POLL_MAX_MS));
        }
    }
}
