//! books.toscrape.com のページ巡回
//!
//! 結果は `books.json` に保存し、失敗時の診断ダンプは `./debug` に出力する。
//!
//! 実行方法:
//! ```
//! SCRAPER_MAX_PAGES=5 cargo run --example books_pagination
//! ```

use dynamic_scraper::{ExtractionTarget, ScrapeRequest, ScraperConfig, ScraperService};
use tower::Service;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ログ設定
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let target = ExtractionTarget::new("http://books.toscrape.com/", "article.product_pod")
        .with_field("title", "h3 a@title")
        .with_field("price", ".price_color")
        .with_expected_count(20)
        .with_next_selector(".next a")
        .with_expected_title("All products | Books to Scrape - Sandbox");

    let mut config = ScraperConfig::from_env();
    if config.diagnostics_dir.is_none() {
        config = config.with_diagnostics_dir("./debug");
    }

    let result = ScraperService::new()
        .call(ScrapeRequest::new(target).with_config(config))
        .await?;

    println!(
        "Collected {} books from {} page(s) (succeeded={})",
        result.records.len(),
        result.pages_visited,
        result.succeeded
    );
    for book in result.records.iter().take(5) {
        println!(
            " - {} | {}",
            book.get("title").unwrap_or_default(),
            book.get("price").unwrap_or_default()
        );
    }

    if result.records.is_empty() {
        println!("No data to save.");
    } else {
        std::fs::write("books.json", serde_json::to_string_pretty(&result)?)?;
        println!("Saved {} rows to books.json", result.records.len());
    }

    if let Some(error) = &result.last_error {
        eprintln!("Last error ({:?} at {:?}): {}", error.cause, error.stage, error.message);
    }
    Ok(())
}
