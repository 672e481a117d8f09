//! 動的コンテンツ抽出エンジン
//!
//! JavaScriptで描画されるページを対象に、
//! - 確認レスポンスを待ってからDOMの出現を待機
//! - 要素群から構造化レコードを抽出
//! - 「次へ」リンクでページを巡回
//! - 一時的な失敗はバックオフ付きでリトライし、最終失敗時は診断ダンプを残す
//!
//! # 使用例
//!
//! ```rust,ignore
//! use dynamic_scraper::{ExtractionTarget, ScrapeRequest, ScraperService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let target = ExtractionTarget::new("http://books.toscrape.com/", "article.product_pod")
//!         .with_field("title", "h3 a@title")
//!         .with_field("price", ".price_color")
//!         .with_expected_count(20);
//!
//!     let mut service = ScraperService::new();
//!     let result = service
//!         .call(ScrapeRequest::new(target).with_max_pages(3))
//!         .await
//!         .unwrap();
//!     println!("records: {}, pages: {}", result.records.len(), result.pages_visited);
//! }
//! ```
//!
//! # ドライバを直接使う例
//!
//! ```rust,ignore
//! use dynamic_scraper::chromium::ChromiumSession;
//! use dynamic_scraper::{Paginator, ScraperConfig};
//!
//! let config = ScraperConfig::from_env();
//! let session = ChromiumSession::launch(&config).await?;
//! let result = Paginator::new(session.driver(), &config)
//!     .collect_all_pages(&target, config.max_pages)
//!     .await;
//! session.close().await?;
//! ```

pub mod backoff;
pub mod chromium;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod extract;
pub mod network;
pub mod pagination;
pub mod retry;
pub mod service;
pub mod traits;
pub mod types;
pub mod wait;

#[cfg(test)]
pub(crate) mod testing;

// 主要な型をリエクスポート
pub use backoff::{BackoffPolicy, JitterPolicy};
pub use config::ScraperConfig;
pub use diagnostics::{DiagnosticBundle, DiagnosticSink, DirectorySink, TracingSink};
pub use error::{FailureKind, ScraperError, Stage};
pub use pagination::{collect_all_pages, Paginator};
pub use retry::{run_with_retries, RetryPolicy};
pub use service::{ScrapeRequest, ScraperService};
pub use traits::PageDriver;
pub use types::{
    AttemptContext, ErrorInfo, ExtractionTarget, FieldSelector, NetworkExpectation, PageRecord,
    PaginationState, ResponseInfo, RunResult,
};
