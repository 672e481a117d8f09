//! 失敗時の診断ダンプ
//!
//! 取得はベストエフォート。取得や保存の失敗はログに残すだけで伝播しない。
//! 保存先やファイル名はシンク側が決める。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::error::{FailureKind, Result, ScraperError, Stage};
use crate::traits::PageDriver;

/// 診断バンドル
#[derive(Debug, Clone)]
pub struct DiagnosticBundle {
    pub timestamp: DateTime<Utc>,
    pub stage: Stage,
    pub failure_kind: FailureKind,
    pub message: String,
    pub html_snapshot: String,
    pub screenshot: Vec<u8>,
}

impl DiagnosticBundle {
    /// ファイル名用タイムスタンプ (`20240131_235959`)
    pub fn file_stamp(&self) -> String {
        self.timestamp.format("%Y%m%d_%H%M%S").to_string()
    }
}

/// 現在のページからバンドルを作成
pub async fn capture<D: PageDriver>(driver: &D, failure: &ScraperError) -> DiagnosticBundle {
    let html_snapshot = driver.current_html().await.unwrap_or_else(|e| {
        warn!("Failed to capture HTML snapshot: {}", e);
        String::new()
    });
    let screenshot = driver.screenshot().await.unwrap_or_else(|e| {
        warn!("Failed to capture screenshot: {}", e);
        Vec::new()
    });

    DiagnosticBundle {
        timestamp: Utc::now(),
        stage: failure.stage(),
        failure_kind: failure.root_cause().kind(),
        message: failure.to_string(),
        html_snapshot,
        screenshot,
    }
}

#[async_trait]
pub trait DiagnosticSink: Send + Sync {
    async fn persist(&self, bundle: &DiagnosticBundle) -> Result<()>;
}

/// ログ出力のみ
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl DiagnosticSink for TracingSink {
    async fn persist(&self, bundle: &DiagnosticBundle) -> Result<()> {
        error!(
            "Diagnostic bundle: stage={:?} kind={:?} html={}bytes screenshot={}bytes: {}",
            bundle.stage,
            bundle.failure_kind,
            bundle.html_snapshot.len(),
            bundle.screenshot.len(),
            bundle.message
        );
        if !bundle.screenshot.is_empty() && tracing::enabled!(tracing::Level::DEBUG) {
            let encoded = base64::engine::general_purpose::STANDARD.encode(&bundle.screenshot);
            debug!("Failure screenshot: data:image/png;base64,{}", encoded);
        }
        Ok(())
    }
}

/// `{prefix}_screenshot_{ts}.png` と `{prefix}_dump_{ts}.html` を書き出す
///
/// 接頭辞を指定しなければ失敗の種別から決める（タイムアウトは `timeout`、それ以外は `unexpected`）。
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    prefix: Option<String>,
}

fn prefix_for(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::NavigationTimeout | FailureKind::ElementTimeout => "timeout",
        _ => "unexpected",
    }
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn paths_for(&self, bundle: &DiagnosticBundle) -> (PathBuf, PathBuf) {
        let stamp = bundle.file_stamp();
        let prefix = self
            .prefix
            .as_deref()
            .unwrap_or_else(|| prefix_for(bundle.failure_kind));
        (
            self.dir.join(format!("{}_screenshot_{}.png", prefix, stamp)),
            self.dir.join(format!("{}_dump_{}.html", prefix, stamp)),
        )
    }
}

#[async_trait]
impl DiagnosticSink for DirectorySink {
    async fn persist(&self, bundle: &DiagnosticBundle) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let (screenshot_path, html_path) = self.paths_for(bundle);

        if !bundle.screenshot.is_empty() {
            tokio::fs::write(&screenshot_path, &bundle.screenshot).await?;
        }
        tokio::fs::write(&html_path, bundle.html_snapshot.as_bytes()).await?;

        info!(
            "Saved debug artifacts: {:?}, {:?} ({:?})",
            screenshot_path, html_path, bundle.failure_kind
        );
        Ok(())
    }
}

/// バンドルを作成してシンクへ渡す（失敗はログのみ）
pub async fn report_failure<D: PageDriver>(
    driver: &D,
    sink: &dyn DiagnosticSink,
    failure: &ScraperError,
) {
    let bundle = capture(driver, failure).await;
    if let Err(e) = sink.persist(&bundle).await {
        warn!("Failed to persist diagnostic bundle: {}", e);
    }
}
