//! ネットワークゲート
//!
//! 確認レスポンスの待機をナビゲーション前に登録し、一致を待ってから先へ進む。

use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::error::{Result, ScraperError};
use crate::traits::PageDriver;
use crate::types::{ExtractionTarget, NetworkExpectation, ResponseInfo};

pub const DEFAULT_PREVIEW_LEN: usize = 200;

/// 確認レスポンス付きナビゲーション
///
/// 待機の登録 → 遷移 → 一致待ちの順で、全体を `expectation.timeout` で打ち切る。
/// ボディの読み取り失敗は空のプレビューに劣化させる。
pub async fn await_confirmed_navigation<D: PageDriver>(
    driver: &D,
    target: &ExtractionTarget,
    expectation: &NetworkExpectation,
    preview_len: usize,
) -> Result<ResponseInfo> {
    let deadline = Instant::now() + expectation.timeout;
    let timeout_ms = expectation.timeout.as_millis();

    let watch = driver.arm_response(expectation).await?;
    debug!("Response expectation armed for {}", target.url);

    driver.navigate(&target.url, expectation.timeout).await?;
    debug!("Navigation issued: {}", target.url);

    let matched = match timeout_at(deadline, watch).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(ScraperError::NavigationTimeout(format!(
                "no matching response for {} within {}ms",
                target.url, timeout_ms
            )))
        }
    };

    info!("Confirming response: {} (status {})", matched.url, matched.status);

    let body_preview = match driver.response_body(&matched).await {
        Ok(body) => preview(&body, preview_len),
        Err(e) => {
            warn!(
                "Could not read response body (status={}, url={}): {}",
                matched.status, matched.url, e
            );
            String::new()
        }
    };

    Ok(ResponseInfo {
        url: matched.url,
        status: matched.status,
        body_preview,
    })
}

/// 遷移後のページタイトルを確認
///
/// ブロックページやCAPTCHAは 200 を返すことがあるため、確認レスポンスとは別に見る。
pub async fn verify_title<D: PageDriver>(driver: &D, expected: &str) -> Result<()> {
    let actual = driver.title().await?;
    if actual.trim() != expected.trim() {
        return Err(ScraperError::TitleMismatch {
            expected: expected.to_string(),
            actual,
        });
    }
    debug!("Title confirmed: {}", actual);
    Ok(())
}

/// 先頭 `len` 文字（文字境界で切る）
pub fn preview(body: &str, len: usize) -> String {
    body.chars().take(len).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSite, ScriptedResponse};
    use std::time::Duration;

    const URL: &str = "https://quotes.toscrape.com/js/";

    fn target() -> ExtractionTarget {
        ExtractionTarget::new(URL, "div.quote")
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("日本語のボディ", 3), "日本語");
        assert_eq!(preview("short", 200), "short");
        assert_eq!(preview("", 10), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_matching_response_returns_preview() {
        let site = FakeSite::new().with_body("<html><body>quotes</body></html>");
        let exp = NetworkExpectation::document(URL);

        let info = await_confirmed_navigation(&site, &target(), &exp, 12)
            .await
            .unwrap();

        assert_eq!(info.url, URL);
        assert_eq!(info.status, 200);
        assert_eq!(info.body_preview, "<html><body>");
        assert_eq!(site.navigations(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_match_wins_in_arrival_order() {
        let site = FakeSite::new().with_responses(vec![
            ScriptedResponse::new("https://cdn.example.com/app.js", 200),
            ScriptedResponse::new("https://api.example.com/items?page=1", 200),
            ScriptedResponse::new("https://api.example.com/items?page=2", 200),
        ]);
        let exp = NetworkExpectation::url_contains("/items");

        let info = await_confirmed_navigation(&site, &target(), &exp, 50)
            .await
            .unwrap();
        assert_eq!(info.url, "https://api.example.com/items?page=1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_mismatch_times_out_instead_of_matching() {
        let site = FakeSite::new().with_responses(vec![ScriptedResponse::new(URL, 404)]);
        let exp = NetworkExpectation::document(URL).with_timeout(Duration::from_secs(5));

        let err = await_confirmed_navigation(&site, &target(), &exp, 200)
            .await
            .unwrap_err();
        assert!(matches!(err, ScraperError::NavigationTimeout(_)), "{err:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_body_degrades_to_empty_preview() {
        let site = FakeSite::new().with_unreadable_body();
        let exp = NetworkExpectation::document(URL);

        let info = await_confirmed_navigation(&site, &target(), &exp, 200)
            .await
            .unwrap();
        assert_eq!(info.status, 200);
        assert!(info.body_preview.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_is_navigation_error() {
        let site = FakeSite::new()
            .with_navigation_failure(ScraperError::Navigation("net::ERR_NAME_NOT_RESOLVED".into()));
        let exp = NetworkExpectation::document(URL);

        let err = await_confirmed_navigation(&site, &target(), &exp, 200)
            .await
            .unwrap_err();
        assert!(matches!(err, ScraperError::Navigation(_)));
    }

    #[tokio::test]
    async fn test_title_confirms_listing_page() {
        let site = FakeSite::new().with_title("All products | Books to Scrape - Sandbox");
        verify_title(&site, "All products | Books to Scrape - Sandbox")
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_block_page_title_is_rejected() {
        let site = FakeSite::new()
            .with_title("All products | Books to Scrape - Sandbox")
            .with_blocked_navigations(1);
        let exp = NetworkExpectation::document(URL);
        await_confirmed_navigation(&site, &target(), &exp, 200)
            .await
            .unwrap();

        let err = verify_title(&site, "All products | Books to Scrape - Sandbox")
            .await
            .unwrap_err();
        match err {
            ScraperError::TitleMismatch { actual, .. } => assert!(actual.contains("Attention")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
