//! ページネーション
//!
//! `Scraping` → `Advancing` → … → `Done` / `Failed` の状態機械。ページ番号と終了判定は
//! `PaginationState` が持つ。
//! 各ページの抽出と「次へ」の検索はリトライ制御で包み、失敗時も途中までのレコードは返す。

use tokio::time::sleep;
use tracing::{error, info};

use crate::config::ScraperConfig;
use crate::diagnostics::{report_failure, DiagnosticSink, TracingSink};
use crate::error::{Result, ScraperError};
use crate::extract::extract;
use crate::network::{await_confirmed_navigation, verify_title};
use crate::retry::{run_with_retries, RetryPolicy};
use crate::traits::PageDriver;
use crate::types::{
    AttemptContext, ErrorInfo, ExtractionTarget, NetworkExpectation, PageRecord, PaginationState,
    RunResult,
};
use crate::wait::await_elements;

#[derive(Debug)]
enum PageState {
    Scraping,
    Advancing,
    Done,
    Failed(ScraperError),
}

pub struct Paginator<'a, D: PageDriver> {
    driver: &'a D,
    config: &'a ScraperConfig,
    expectation: Option<NetworkExpectation>,
    sink: &'a dyn DiagnosticSink,
}

impl<'a, D: PageDriver> Paginator<'a, D> {
    pub fn new(driver: &'a D, config: &'a ScraperConfig) -> Self {
        Self {
            driver,
            config,
            expectation: None,
            sink: &TracingSink,
        }
    }

    /// 1ページ目の確認レスポンス条件（既定: 対象URLのドキュメントが 200）
    ///
    /// 待機時間は試行ごとのタイムアウトを超えない。
    pub fn with_expectation(mut self, expectation: NetworkExpectation) -> Self {
        self.expectation = Some(expectation);
        self
    }

    pub fn with_sink(mut self, sink: &'a dyn DiagnosticSink) -> Self {
        self.sink = sink;
        self
    }

    fn expectation_for(&self, target: &ExtractionTarget, ctx: &AttemptContext) -> NetworkExpectation {
        match &self.expectation {
            Some(expectation) => expectation
                .clone()
                .with_timeout(expectation.timeout.min(ctx.per_attempt_timeout)),
            None => NetworkExpectation::document(target.url.clone())
                .with_timeout(ctx.per_attempt_timeout),
        }
    }

    /// 全ページを巡回してレコードを集める
    pub async fn collect_all_pages(&self, target: &ExtractionTarget, max_pages: u32) -> RunResult {
        let policy = self.config.retry_policy();
        let mut pagination = PaginationState::new(max_pages);
        let mut result = RunResult::default();
        let mut state = PageState::Scraping;

        info!(
            "Collecting up to {} page(s) from {}",
            pagination.max_pages, target.url
        );

        loop {
            state = match state {
                PageState::Scraping => {
                    let page = pagination.current_page;
                    info!("Scraping page {}...", page);
                    match self.scrape_page(target, page, &policy).await {
                        Ok(records) => {
                            result.records.extend(records);
                            result.pages_visited += 1;
                            PageState::Advancing
                        }
                        Err(e) => PageState::Failed(e),
                    }
                }
                PageState::Advancing => {
                    if pagination.at_limit() {
                        info!("Reached page limit ({})", pagination.max_pages);
                        PageState::Done
                    } else {
                        let page = pagination.current_page;
                        match self.advance(target, page, &policy).await {
                            Ok(has_next) => {
                                pagination.has_next = has_next;
                                if has_next {
                                    pagination.advance();
                                }
                                if pagination.is_terminal() {
                                    info!("No next control on page {}, pagination complete", page);
                                    PageState::Done
                                } else {
                                    PageState::Scraping
                                }
                            }
                            Err(e) => PageState::Failed(e),
                        }
                    }
                }
                PageState::Done => {
                    result.succeeded = true;
                    break;
                }
                PageState::Failed(e) => {
                    error!(
                        "Pagination aborted after {} page(s): {}",
                        result.pages_visited, e
                    );
                    report_failure(self.driver, self.sink, &e).await;
                    result.last_error = Some(ErrorInfo::from(&e));
                    result.succeeded = false;
                    break;
                }
            };
        }

        info!(
            "Collected {} records from {} page(s)",
            result.records.len(),
            result.pages_visited
        );
        result
    }

    /// 1ページ分の抽出（リトライ付き）
    ///
    /// 1ページ目は確認レスポンス付きナビゲーションから、以降はDOM待機から始める。
    async fn scrape_page(
        &self,
        target: &ExtractionTarget,
        page: u32,
        policy: &RetryPolicy,
    ) -> Result<Vec<PageRecord>> {
        run_with_retries(policy, |ctx| async move {
            if page == 1 {
                let expectation = self.expectation_for(target, &ctx);
                let response = await_confirmed_navigation(
                    self.driver,
                    target,
                    &expectation,
                    self.config.body_preview_len,
                )
                .await?;
                if let Some(expected) = &target.expected_title {
                    verify_title(self.driver, expected).await?;
                }
                info!(
                    "[try {}/{}] document preview: {}",
                    ctx.attempt,
                    ctx.max_attempts,
                    if response.body_preview.is_empty() {
                        "(empty body preview)"
                    } else {
                        response.body_preview.as_str()
                    }
                );
            }

            await_elements(self.driver, &target.record_selector, ctx.per_attempt_timeout).await?;
            extract(self.driver, target).await
        })
        .await
    }

    /// 「次へ」があればクリックして `true`
    ///
    /// 検索はリトライする。クリックは再試行しない。
    async fn advance(
        &self,
        target: &ExtractionTarget,
        page: u32,
        policy: &RetryPolicy,
    ) -> Result<bool> {
        let controls = run_with_retries(policy, |_ctx| async move {
            self.driver
                .query_all(&target.next_selector)
                .await
                .map_err(|e| ScraperError::advancing(page, e))
        })
        .await?;
        let Some(next) = controls.first() else {
            return Ok(false);
        };

        sleep(self.config.jitter.sample()).await;
        self.driver
            .click(next)
            .await
            .map_err(|e| ScraperError::advancing(page, e))?;
        sleep(self.config.settle.sample()).await;
        Ok(true)
    }
}

/// [`Paginator`] の簡易呼び出し
pub async fn collect_all_pages<D: PageDriver>(
    driver: &D,
    config: &ScraperConfig,
    target: &ExtractionTarget,
    max_pages: u32,
) -> RunResult {
    Paginator::new(driver, config)
        .collect_all_pages(target, max_pages)
        .await
}
