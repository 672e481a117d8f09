//! quotes.toscrape.com/js/ の単一ページ抽出
//!
//! 実行方法:
//! ```
//! SCRAPER_HEADLESS=false SCRAPER_MAX_RETRIES=5 cargo run --example quotes_js
//! ```

use dynamic_scraper::{ExtractionTarget, ScrapeRequest, ScraperConfig, ScraperService};
use tower::Service;

#[tokio::main]
async fn main() {
    // ログ設定
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let url = std::env::var("SCRAPER_URL")
        .unwrap_or_else(|_| "https://quotes.toscrape.com/js/".to_string());

    let target = ExtractionTarget::new(url, "div.quote")
        .with_field("text", ".text")
        .with_field("author", ".author");

    let config = ScraperConfig::from_env().with_max_pages(1);
    let request = ScrapeRequest::new(target).with_config(config);

    println!("=== Quotes (JS) Scraper ===");

    match ScraperService::new().call(request).await {
        Ok(result) if result.succeeded => {
            println!("Collected {} quote blocks.", result.records.len());
            for (i, quote) in result.records.iter().take(3).enumerate() {
                let text = quote.get("text").unwrap_or_default();
                let trimmed: String = text.chars().take(117).collect();
                println!("  {:02}. {} ({})", i + 1, trimmed, quote.get("author").unwrap_or_default());
            }
        }
        Ok(result) => {
            eprintln!(
                "Failed after max retries: {:?}",
                result.last_error.map(|e| e.message)
            );
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("エラー: {}", e);
            std::process::exit(1);
        }
    }
}
