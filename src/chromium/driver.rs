use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::cdp::browser_protocol::network::{
    EventResponseReceived, GetResponseBodyParams, RequestId,
};
use chromiumoxide::element::Element;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tracing::debug;

use crate::error::{Result, ScraperError};
use crate::traits::{PageDriver, ResponseWatch};
use crate::types::{MatchedResponse, NetworkExpectation};

/// chromiumoxide の `Page` を操作するドライバ
#[derive(Clone)]
pub struct ChromiumDriver {
    page: Arc<Page>,
}

impl ChromiumDriver {
    pub fn new(page: Page) -> Self {
        Self {
            page: Arc::new(page),
        }
    }

    pub fn page(&self) -> &Arc<Page> {
        &self.page
    }
}

fn unclassified(context: &str, e: impl std::fmt::Display) -> ScraperError {
    ScraperError::Unclassified(format!("{}: {}", context, e))
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    type Element = Element;

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(ScraperError::Navigation(format!("{}: {}", url, e))),
            Err(_) => Err(ScraperError::NavigationTimeout(format!(
                "{} did not finish loading within {}ms",
                url,
                timeout.as_millis()
            ))),
        }
    }

    async fn arm_response(&self, expectation: &NetworkExpectation) -> Result<ResponseWatch> {
        // goto より前に購読しておけばイベントはストリームにバッファされる
        let mut events = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| ScraperError::Navigation(format!("response listener: {}", e)))?;
        let expectation = expectation.clone();

        Ok(Box::pin(async move {
            while let Some(event) = events.next().await {
                let url = event.response.url.clone();
                let status = u16::try_from(event.response.status).unwrap_or(0);
                debug!("Response observed: {} {}", status, url);

                if expectation.matches(&url, status) {
                    return Ok(MatchedResponse {
                        url,
                        status,
                        request_id: event.request_id.inner().clone(),
                    });
                }
            }
            Err(ScraperError::Navigation(
                "response event stream closed".to_string(),
            ))
        }))
    }

    async fn response_body(&self, response: &MatchedResponse) -> Result<String> {
        let params = GetResponseBodyParams::new(RequestId::new(response.request_id.clone()));
        let body = self
            .page
            .execute(params)
            .await
            .map_err(|e| unclassified("response body", e))?
            .result;

        if !body.base64_encoded {
            return Ok(body.body);
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(body.body.as_bytes())
            .map_err(|e| unclassified("response body decode", e))?;
        String::from_utf8(bytes).map_err(|e| {
            ScraperError::Unclassified(format!(
                "binary response body ({} bytes)",
                e.as_bytes().len()
            ))
        })
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Element>> {
        self.page
            .find_elements(selector)
            .await
            .map_err(|e| unclassified(selector, e))
    }

    async fn find_within(&self, element: &Element, selector: &str) -> Result<Option<Element>> {
        let found = element
            .find_elements(selector)
            .await
            .map_err(|e| unclassified(selector, e))?;
        Ok(found.into_iter().next())
    }

    async fn read_text(&self, element: &Element) -> Result<String> {
        Ok(element
            .inner_text()
            .await
            .map_err(|e| unclassified("inner_text", e))?
            .unwrap_or_default())
    }

    async fn read_attribute(&self, element: &Element, name: &str) -> Result<Option<String>> {
        element
            .attribute(name)
            .await
            .map_err(|e| unclassified(name, e))
    }

    async fn click(&self, element: &Element) -> Result<()> {
        element
            .click()
            .await
            .map_err(|e| ScraperError::Navigation(format!("click: {}", e)))?;
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(|e| unclassified("screenshot", e))
    }

    async fn current_html(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| unclassified("content", e))
    }

    async fn title(&self) -> Result<String> {
        Ok(self
            .page
            .get_title()
            .await
            .map_err(|e| unclassified("title", e))?
            .unwrap_or_default())
    }
}
