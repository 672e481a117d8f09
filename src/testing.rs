//! テスト用の疑似サイト
//!
//! ページ・レスポンス・描画遅延・失敗を台本として与え、`PageDriver` として振る舞う。

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::{Result, ScraperError};
use crate::traits::{PageDriver, ResponseWatch};
use crate::types::{MatchedResponse, NetworkExpectation};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FakeNode {
    text: String,
    attrs: HashMap<String, String>,
    children: HashMap<String, FakeNode>,
}

impl FakeNode {
    pub(crate) fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub(crate) fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub(crate) fn with_child(mut self, selector: &str, child: FakeNode) -> Self {
        self.children.insert(selector.to_string(), child);
        self
    }
}

/// books.toscrape.com 風の商品カード
pub(crate) fn book_nodes(page: usize, count: usize) -> Vec<FakeNode> {
    (1..=count)
        .map(|i| {
            FakeNode::text(format!("card {page}-{i}"))
                .with_child(
                    "h3 a",
                    FakeNode::text(format!("Book {page}-{i}..."))
                        .with_attr("title", &format!("Book {page}-{i}")),
                )
                .with_child(
                    ".price_color",
                    FakeNode::text(format!("£{}.{:02}", 9 + page, i)),
                )
        })
        .collect()
}

#[derive(Debug, Clone)]
pub(crate) struct ScriptedResponse {
    url: String,
    status: u16,
}

impl ScriptedResponse {
    pub(crate) fn new(url: &str, status: u16) -> Self {
        Self {
            url: url.to_string(),
            status,
        }
    }
}

type FakePage = HashMap<String, Vec<FakeNode>>;

struct FakeState {
    pages: Vec<FakePage>,
    current: usize,
    responses: Option<Vec<ScriptedResponse>>,
    listeners: Vec<mpsc::UnboundedSender<(String, u16)>>,
    navigation_failures: VecDeque<ScraperError>,
    body: Option<String>,
    render_delay: Duration,
    rendered_at: Instant,
    unrendered_navigations: u32,
    unrendered: bool,
    broken_capture: bool,
    title: String,
    blocked_navigations: u32,
    blocked: bool,
    lookup_failures: HashMap<String, u32>,
    click_failures: u32,
    navigations: u32,
    clicks: u32,
}

pub(crate) struct FakeSite {
    state: Mutex<FakeState>,
}

impl FakeSite {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                pages: Vec::new(),
                current: 0,
                responses: None,
                listeners: Vec::new(),
                navigation_failures: VecDeque::new(),
                body: Some("<html><head><title>Fake</title></head><body></body></html>".into()),
                render_delay: Duration::ZERO,
                rendered_at: Instant::now(),
                unrendered_navigations: 0,
                unrendered: false,
                broken_capture: false,
                title: "Fake".into(),
                blocked_navigations: 0,
                blocked: false,
                lookup_failures: HashMap::new(),
                click_failures: 0,
                navigations: 0,
                clicks: 0,
            }),
        }
    }

    fn edit(self, f: impl FnOnce(&mut FakeState)) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub(crate) fn with_page(self, selectors: Vec<(&str, Vec<FakeNode>)>) -> Self {
        let page: FakePage = selectors
            .into_iter()
            .map(|(selector, nodes)| (selector.to_string(), nodes))
            .collect();
        self.edit(|s| s.pages.push(page))
    }

    /// ナビゲーションごとに観測されるレスポンス（既定: 遷移先URLの 200）
    pub(crate) fn with_responses(self, responses: Vec<ScriptedResponse>) -> Self {
        self.edit(|s| s.responses = Some(responses))
    }

    pub(crate) fn with_body(self, body: &str) -> Self {
        let body = body.to_string();
        self.edit(|s| s.body = Some(body))
    }

    pub(crate) fn with_unreadable_body(self) -> Self {
        self.edit(|s| s.body = None)
    }

    /// 次のナビゲーションを1回失敗させる
    pub(crate) fn with_navigation_failure(self, error: ScraperError) -> Self {
        self.edit(|s| s.navigation_failures.push_back(error))
    }

    /// 遷移・クリックから要素が現れるまでの時間
    pub(crate) fn with_render_delay(self, delay: Duration) -> Self {
        self.edit(|s| {
            s.render_delay = delay;
            s.rendered_at = Instant::now() + delay;
        })
    }

    /// 最初の `n` 回のナビゲーションでは何も描画されない
    pub(crate) fn with_unrendered_navigations(self, n: u32) -> Self {
        self.edit(|s| s.unrendered_navigations = n)
    }

    pub(crate) fn with_broken_capture(self) -> Self {
        self.edit(|s| s.broken_capture = true)
    }

    pub(crate) fn with_title(self, title: &str) -> Self {
        let title = title.to_string();
        self.edit(|s| s.title = title)
    }

    /// 最初の `n` 回のナビゲーションはブロックページ（200だがタイトルが違う）
    pub(crate) fn with_blocked_navigations(self, n: u32) -> Self {
        self.edit(|s| s.blocked_navigations = n)
    }

    /// `selector` の検索を `n` 回失敗させる
    pub(crate) fn with_lookup_failures(self, selector: &str, n: u32) -> Self {
        let selector = selector.to_string();
        self.edit(|s| {
            s.lookup_failures.insert(selector, n);
        })
    }

    /// 次のクリックを1回失敗させる
    pub(crate) fn with_click_failure(self) -> Self {
        self.edit(|s| s.click_failures += 1)
    }

    pub(crate) fn navigations(&self) -> u32 {
        self.state.lock().unwrap().navigations
    }

    pub(crate) fn clicks(&self) -> u32 {
        self.state.lock().unwrap().clicks
    }
}

impl FakeState {
    fn visible(&self, selector: &str) -> Vec<FakeNode> {
        if self.unrendered || Instant::now() < self.rendered_at {
            return Vec::new();
        }
        self.pages
            .get(self.current)
            .and_then(|page| page.get(selector))
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl PageDriver for FakeSite {
    type Element = FakeNode;

    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.navigations += 1;
        if let Some(err) = s.navigation_failures.pop_front() {
            return Err(err);
        }

        s.current = 0;
        s.rendered_at = Instant::now() + s.render_delay;
        s.unrendered = s.unrendered_navigations > 0;
        if s.unrendered {
            s.unrendered_navigations -= 1;
        }
        s.blocked = s.blocked_navigations > 0;
        if s.blocked {
            s.blocked_navigations -= 1;
        }

        let observed: Vec<(String, u16)> = match &s.responses {
            Some(responses) => responses
                .iter()
                .map(|r| (r.url.clone(), r.status))
                .collect(),
            None => vec![(url.to_string(), 200)],
        };
        s.listeners.retain(|tx| !tx.is_closed());
        for tx in &s.listeners {
            for response in &observed {
                let _ = tx.send(response.clone());
            }
        }
        Ok(())
    }

    async fn arm_response(&self, expectation: &NetworkExpectation) -> Result<ResponseWatch> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.state.lock().unwrap().listeners.push(tx);
        let expectation = expectation.clone();

        Ok(Box::pin(async move {
            while let Some((url, status)) = rx.recv().await {
                if expectation.matches(&url, status) {
                    return Ok(MatchedResponse {
                        url,
                        status,
                        request_id: "fake-1".into(),
                    });
                }
            }
            Err(ScraperError::Navigation("response stream closed".into()))
        }))
    }

    async fn response_body(&self, _response: &MatchedResponse) -> Result<String> {
        self.state
            .lock()
            .unwrap()
            .body
            .clone()
            .ok_or_else(|| ScraperError::Unclassified("binary response body".into()))
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<FakeNode>> {
        let mut s = self.state.lock().unwrap();
        if let Some(remaining) = s.lookup_failures.get_mut(selector) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ScraperError::Unclassified(format!(
                    "{}: node is detached from document",
                    selector
                )));
            }
        }
        Ok(s.visible(selector))
    }

    async fn find_within(&self, element: &FakeNode, selector: &str) -> Result<Option<FakeNode>> {
        Ok(element.children.get(selector).cloned())
    }

    async fn read_text(&self, element: &FakeNode) -> Result<String> {
        Ok(element.text.clone())
    }

    async fn read_attribute(&self, element: &FakeNode, name: &str) -> Result<Option<String>> {
        Ok(element.attrs.get(name).cloned())
    }

    async fn click(&self, _element: &FakeNode) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.clicks += 1;
        if s.click_failures > 0 {
            s.click_failures -= 1;
            return Err(ScraperError::Navigation("click intercepted by overlay".into()));
        }
        if s.current + 1 < s.pages.len() {
            s.current += 1;
        }
        s.rendered_at = Instant::now() + s.render_delay;
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        if self.state.lock().unwrap().broken_capture {
            return Err(ScraperError::Unclassified("screenshot failed".into()));
        }
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn current_html(&self) -> Result<String> {
        let s = self.state.lock().unwrap();
        if s.broken_capture {
            return Err(ScraperError::Unclassified("page crashed".into()));
        }
        let mut html = String::from("<html><body>");
        if let Some(page) = s.pages.get(s.current) {
            let mut selectors: Vec<&String> = page.keys().collect();
            selectors.sort();
            for selector in selectors {
                html.push_str(&format!("<!-- {} x{} -->", selector, page[selector].len()));
            }
        }
        html.push_str("</body></html>");
        Ok(html)
    }

    async fn title(&self) -> Result<String> {
        let s = self.state.lock().unwrap();
        if s.blocked {
            return Ok("Attention Required! | Cloudflare".into());
        }
        Ok(s.title.clone())
    }
}
