//! レコード抽出
//!
//! DOMは呼び出し側で待機済みである前提。遷移も待機もしない。

use tracing::{debug, info};

use crate::error::{Result, ScraperError};
use crate::traits::PageDriver;
use crate::types::{ExtractionTarget, FieldSelector, PageRecord};

/// 現在のページからレコードを抽出
pub async fn extract<D: PageDriver>(driver: &D, target: &ExtractionTarget) -> Result<Vec<PageRecord>> {
    let elements = driver.query_all(&target.record_selector).await?;

    if let Some(expected) = target.expected_count {
        if elements.len() != expected {
            return Err(ScraperError::CardinalityMismatch {
                selector: target.record_selector.clone(),
                expected,
                actual: elements.len(),
            });
        }
    }

    let mut records = Vec::with_capacity(elements.len());
    for element in &elements {
        let mut fields = Vec::with_capacity(target.fields.len());
        for field in &target.fields {
            let value = resolve_field(driver, element, &field.selector).await?;
            fields.push((field.name.clone(), value));
        }
        records.push(fields.into_iter().collect::<PageRecord>());
    }

    info!(
        "Extracted {} records ({})",
        records.len(),
        target.record_selector
    );
    Ok(records)
}

async fn resolve_field<D: PageDriver>(
    driver: &D,
    element: &D::Element,
    selector: &FieldSelector,
) -> Result<String> {
    let scoped;
    let node = match &selector.sub_selector {
        Some(sub) => match driver.find_within(element, sub).await? {
            Some(found) => {
                scoped = found;
                &scoped
            }
            None => {
                debug!("Sub-element not found: {}", sub);
                return Ok(String::new());
            }
        },
        None => element,
    };

    match &selector.attribute {
        Some(name) => Ok(driver.read_attribute(node, name).await?.unwrap_or_default()),
        None => Ok(driver.read_text(node).await?.trim().to_string()),
    }
}
