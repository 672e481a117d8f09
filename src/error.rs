use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScraperError>;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("ブラウザ初期化エラー: {0}")]
    BrowserInit(String),

    #[error("ナビゲーションタイムアウト: {0}")]
    NavigationTimeout(String),

    #[error("ナビゲーションエラー: {0}")]
    Navigation(String),

    #[error("要素待機タイムアウト: {selector} ({timeout_ms}ms)")]
    ElementTimeout { selector: String, timeout_ms: u64 },

    #[error("件数不一致: {selector} 期待={expected} 実際={actual}")]
    CardinalityMismatch {
        selector: String,
        expected: usize,
        actual: usize,
    },

    #[error("タイトル不一致: 期待={expected} 実際={actual}")]
    TitleMismatch { expected: String, actual: String },

    #[error("ページ送りエラー (ページ{page}): {source}")]
    Advance {
        page: u32,
        source: Box<ScraperError>,
    },

    #[error("リトライ上限到達 ({attempts}回): {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<ScraperError>,
    },

    #[error("分類不能なエラー: {0}")]
    Unclassified(String),

    #[error("ファイル操作エラー: {0}")]
    FileIO(#[from] std::io::Error),
}

/// 失敗の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    BrowserInit,
    NavigationTimeout,
    NavigationError,
    ElementTimeout,
    CardinalityMismatch,
    TitleMismatch,
    RetriesExhausted,
    UnclassifiedFailure,
    Io,
}

/// 失敗が発生した処理段階
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Session,
    Navigation,
    DomReadiness,
    Extraction,
    Pagination,
    Diagnostics,
}

impl ScraperError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::BrowserInit(_) => FailureKind::BrowserInit,
            Self::NavigationTimeout(_) => FailureKind::NavigationTimeout,
            Self::Navigation(_) => FailureKind::NavigationError,
            Self::ElementTimeout { .. } => FailureKind::ElementTimeout,
            Self::CardinalityMismatch { .. } => FailureKind::CardinalityMismatch,
            Self::TitleMismatch { .. } => FailureKind::TitleMismatch,
            Self::Advance { source, .. } => source.kind(),
            Self::RetriesExhausted { .. } => FailureKind::RetriesExhausted,
            Self::Unclassified(_) => FailureKind::UnclassifiedFailure,
            Self::FileIO(_) => FailureKind::Io,
        }
    }

    /// リトライ上限エラーの場合は最後の原因の段階を返す
    pub fn stage(&self) -> Stage {
        match self {
            Self::BrowserInit(_) => Stage::Session,
            Self::NavigationTimeout(_) | Self::Navigation(_) | Self::TitleMismatch { .. } => {
                Stage::Navigation
            }
            Self::ElementTimeout { .. } => Stage::DomReadiness,
            Self::CardinalityMismatch { .. } | Self::Unclassified(_) => Stage::Extraction,
            Self::Advance { .. } => Stage::Pagination,
            Self::RetriesExhausted { last, .. } => last.stage(),
            Self::FileIO(_) => Stage::Diagnostics,
        }
    }

    /// `RetriesExhausted` / `Advance` を剥がした根本原因
    pub fn root_cause(&self) -> &ScraperError {
        match self {
            Self::RetriesExhausted { last, .. } => last.root_cause(),
            Self::Advance { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// ページ送り中の失敗として包む
    pub fn advancing(page: u32, source: ScraperError) -> Self {
        Self::Advance {
            page,
            source: Box::new(source),
        }
    }

    /// ページ構造の変化を示唆する失敗か
    pub fn is_layout_change(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::ElementTimeout { .. }
                | Self::CardinalityMismatch { .. }
                | Self::TitleMismatch { .. }
        )
    }

    /// ネットワーク不安定を示唆する失敗か
    pub fn is_network_instability(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::NavigationTimeout(_) | Self::Navigation(_)
        )
    }
}
