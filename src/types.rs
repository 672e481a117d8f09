//! 抽出エンジンの型定義

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::error::{FailureKind, ScraperError, Stage};

/// 「次へ」リンクの既定セレクタ
pub const DEFAULT_NEXT_SELECTOR: &str = ".next a";

/// フィールドの解決方法
///
/// `".price_color"` はサブ要素のテキスト、`"h3 a@title"` はサブ要素の属性、
/// `"@href"` はレコード要素自身の属性、`""` はレコード要素自身のテキスト。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelector {
    pub sub_selector: Option<String>,
    pub attribute: Option<String>,
}

impl FieldSelector {
    pub fn parse(raw: &str) -> Self {
        let (selector, attribute) = match raw.rsplit_once('@') {
            Some((selector, attr)) if !attr.trim().is_empty() => {
                (selector.trim(), Some(attr.trim().to_string()))
            }
            _ => (raw.trim(), None),
        };

        Self {
            sub_selector: (!selector.is_empty()).then(|| selector.to_string()),
            attribute,
        }
    }

    pub fn text(selector: impl Into<String>) -> Self {
        Self {
            sub_selector: Some(selector.into()),
            attribute: None,
        }
    }

    pub fn attribute(selector: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            sub_selector: Some(selector.into()),
            attribute: Some(name.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub selector: FieldSelector,
}

/// 抽出対象の定義（1回の実行中は不変）
#[derive(Debug, Clone)]
pub struct ExtractionTarget {
    pub url: String,
    pub record_selector: String,
    pub fields: Vec<FieldSpec>,
    pub expected_count: Option<usize>,
    pub next_selector: String,
    /// 1ページ目の `document.title`（ブロックページとの区別に使う）
    pub expected_title: Option<String>,
}

impl ExtractionTarget {
    pub fn new(url: impl Into<String>, record_selector: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            record_selector: record_selector.into(),
            fields: Vec::new(),
            expected_count: None,
            next_selector: DEFAULT_NEXT_SELECTOR.to_string(),
            expected_title: None,
        }
    }

    /// フィールドを追加（セレクタは [`FieldSelector::parse`] の書式）
    pub fn with_field(mut self, name: impl Into<String>, selector: &str) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            selector: FieldSelector::parse(selector),
        });
        self
    }

    pub fn with_expected_count(mut self, count: usize) -> Self {
        self.expected_count = Some(count);
        self
    }

    pub fn with_next_selector(mut self, selector: impl Into<String>) -> Self {
        self.next_selector = selector.into();
        self
    }

    pub fn with_expected_title(mut self, title: impl Into<String>) -> Self {
        self.expected_title = Some(title.into());
        self
    }
}

pub type UrlPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;
pub type StatusPredicate = Arc<dyn Fn(u16) -> bool + Send + Sync>;

/// 確認レスポンスの条件
///
/// 観測したレスポンスを到着順に評価し、最初に一致したものを採用する。
/// 判定に使うのはURLとステータスのみでボディは読まない。
#[derive(Clone)]
pub struct NetworkExpectation {
    pub url_predicate: UrlPredicate,
    pub status_predicate: StatusPredicate,
    pub timeout: Duration,
}

impl NetworkExpectation {
    pub fn new(url_predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            url_predicate: Arc::new(url_predicate),
            status_predicate: Arc::new(|status| status == 200),
            timeout: Duration::from_millis(5000),
        }
    }

    /// メインドキュメント: URL完全一致かつ 200
    pub fn document(url: impl Into<String>) -> Self {
        let url = url.into();
        Self::new(move |candidate| candidate == url)
    }

    pub fn url_contains(fragment: impl Into<String>) -> Self {
        let fragment = fragment.into();
        Self::new(move |candidate| candidate.contains(&fragment))
    }

    /// 任意のレスポンス・任意のステータス
    pub fn any() -> Self {
        Self::new(|_| true).with_status(|_| true)
    }

    pub fn with_status(mut self, predicate: impl Fn(u16) -> bool + Send + Sync + 'static) -> Self {
        self.status_predicate = Arc::new(predicate);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn matches(&self, url: &str, status: u16) -> bool {
        (self.url_predicate)(url) && (self.status_predicate)(status)
    }
}

impl fmt::Debug for NetworkExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkExpectation")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// ドライバが検出した一致レスポンス
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedResponse {
    pub url: String,
    pub status: u16,
    pub request_id: String,
}

/// ネットワークゲートの結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseInfo {
    pub url: String,
    pub status: u16,
    pub body_preview: String,
}

/// 試行コンテキスト（リトライ制御のみが生成する）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptContext {
    pub attempt: u32,
    pub max_attempts: u32,
    pub per_attempt_timeout: Duration,
}

impl AttemptContext {
    pub fn is_last(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

/// 抽出した1レコード（フィールド名 → 値）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PageRecord(BTreeMap<String, String>);

impl PageRecord {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for PageRecord {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// ページネーションの進行状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    pub current_page: u32,
    pub max_pages: u32,
    pub has_next: bool,
}

impl PaginationState {
    pub fn new(max_pages: u32) -> Self {
        Self {
            current_page: 1,
            max_pages: max_pages.max(1),
            has_next: true,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !self.has_next || self.current_page > self.max_pages
    }

    pub fn at_limit(&self) -> bool {
        self.current_page >= self.max_pages
    }

    pub fn advance(&mut self) {
        self.current_page += 1;
    }
}

/// 失敗の要約
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub kind: FailureKind,
    /// `RetriesExhausted` の場合は最後の原因の種別
    pub cause: FailureKind,
    pub stage: Stage,
    pub attempts: Option<u32>,
    pub message: String,
}

impl From<&ScraperError> for ErrorInfo {
    fn from(err: &ScraperError) -> Self {
        let attempts = match err {
            ScraperError::RetriesExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        };
        Self {
            kind: err.kind(),
            cause: err.root_cause().kind(),
            stage: err.stage(),
            attempts,
            message: err.to_string(),
        }
    }
}

/// 1回の実行結果
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunResult {
    pub records: Vec<PageRecord>,
    pub pages_visited: u32,
    pub succeeded: bool,
    pub last_error: Option<ErrorInfo>,
}
