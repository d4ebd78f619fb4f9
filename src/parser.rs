use scraper::{Html, Selector};

use crate::error::{PriceError, Result};

pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| PriceError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Visible text of the first element matching `selector`, whitespace-collapsed.
pub fn select_text(html: &str, selector: &str) -> Result<Option<String>> {
    let selector = parse_selector(selector)?;
    let doc = Html::parse_document(html);

    Ok(doc.select(&selector).next().map(|e| {
        e.text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }))
}
