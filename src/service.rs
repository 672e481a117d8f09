use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::Service;
use tracing::{info, warn};

use crate::chromium::ChromiumSession;
use crate::config::ScraperConfig;
use crate::diagnostics::{DiagnosticSink, DirectorySink, TracingSink};
use crate::error::ScraperError;
use crate::pagination::Paginator;
use crate::types::{ExtractionTarget, NetworkExpectation, RunResult};

/// スクレイピングリクエスト
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub target: ExtractionTarget,
    pub config: ScraperConfig,
    pub expectation: Option<NetworkExpectation>,
}

impl ScrapeRequest {
    pub fn new(target: ExtractionTarget) -> Self {
        Self {
            target,
            config: ScraperConfig::default(),
            expectation: None,
        }
    }

    pub fn with_config(mut self, config: ScraperConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// 1ページ目の確認レスポンス条件を差し替える
    pub fn with_expectation(mut self, expectation: NetworkExpectation) -> Self {
        self.expectation = Some(expectation);
        self
    }

    fn sink(&self) -> Box<dyn DiagnosticSink> {
        match &self.config.diagnostics_dir {
            Some(dir) => Box::new(DirectorySink::new(dir)),
            None => Box::new(TracingSink),
        }
    }
}

/// tower::Serviceを実装したスクレイパーサービス
///
/// 呼び出しごとに独立したブラウザセッションを起動する。
/// エラーとして返すのはセッション起動の失敗のみで、抽出の失敗は `RunResult` に入る。
#[derive(Debug, Clone, Default)]
pub struct ScraperService {}

impl ScraperService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Service<ScrapeRequest> for ScraperService {
    type Response = RunResult;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ScrapeRequest) -> Self::Future {
        info!("Scrape request received: url={}", req.target.url);

        Box::pin(async move {
            let session = ChromiumSession::launch(&req.config).await?;
            let sink = req.sink();

            let mut paginator = Paginator::new(session.driver(), &req.config).with_sink(sink.as_ref());
            if let Some(expectation) = req.expectation.clone() {
                paginator = paginator.with_expectation(expectation);
            }
            let result = paginator
                .collect_all_pages(&req.target, req.config.max_pages)
                .await;

            if let Err(e) = session.close().await {
                warn!("Failed to close browser: {}", e);
            }

            info!(
                "Scrape finished: succeeded={}, records={}, pages={}",
                result.succeeded,
                result.records.len(),
                result.pages_visited
            );
            Ok(result)
        })
    }
}
