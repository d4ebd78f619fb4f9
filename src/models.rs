use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Price text scraped from a product page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub text: String,
    pub url: String,
    pub fetched_at: DateTime<Utc>,
}

impl PriceQuote {
    pub fn new(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into().trim().to_string(),
            url: url.into(),
            fetched_at: Utc::now(),
        }
    }

    /// Numeric amount of the quote, ignoring currency symbols and thousands
    /// separators. A last `,` followed by anything but three digits is a decimal
    /// comma (`24,99 €`, `1.024,50`). `None` when no number can be read.
    pub fn amount(&self) -> Option<f64> {
        let token: String = self
            .text
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
            .collect();
        let token = token.trim_end_matches(['.', ',']);

        let decimal_comma = match token.rfind(['.', ',']) {
            Some(i) => token.as_bytes()[i] == b',' && token.len() - i - 1 != 3,
            None => false,
        };
        let normalized = if decimal_comma {
            token.replace('.', "").replace(',', ".")
        } else {
            token.replace(',', "")
        };
        normalized.parse().ok()
    }

    pub fn within_limit(&self, limit: f64) -> Option<bool> {
        self.amount().map(|amount| amount <= limit)
    }
}

/// Status/body envelope returned by the serverless handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LambdaResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl LambdaResponse {
    pub fn ok(quote: &PriceQuote) -> Self {
        Self {
            status_code: 200,
            body: format!("The current price is: {}", quote.text),
        }
    }
}

/// One bar as the provider names it, before shaping.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// One row of a shaped series, keyed by (timestamp, symbol).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub open_price: f64,
    pub high: f64,
    pub low: f64,
    pub close_price: f64,
    pub volume: u64,
    pub price: f64,
}

/// Series laid out like the legacy `get_pricing` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub rows: Vec<PriceRow>,
}

impl PriceSeries {
    pub const INDEX: [&'static str; 2] = ["timestamp", "symbol"];
    pub const COLUMNS: [&'static str; 6] =
        ["open_price", "high", "low", "close_price", "volume", "price"];

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn prices(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(|r| r.price)
    }

    pub fn close_prices(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(|r| r.close_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_strips_currency() {
        assert_eq!(PriceQuote::new("£24.99", "u").amount(), Some(24.99));
        assert_eq!(PriceQuote::new(" $1,024.50 ", "u").amount(), Some(1024.50));
        assert_eq!(PriceQuote::new("From £9", "u").amount(), Some(9.0));
        assert_eq!(PriceQuote::new("Sold out", "u").amount(), None);
    }

    #[test]
    fn test_amount_decimal_comma() {
        assert_eq!(PriceQuote::new("24,99 €", "u").amount(), Some(24.99));
        assert_eq!(PriceQuote::new("1.024,50 €", "u").amount(), Some(1024.50));
        assert_eq!(PriceQuote::new("€ 7,5", "u").amount(), Some(7.5));
        // three digits after a lone comma read as thousands
        assert_eq!(PriceQuote::new("£1,024", "u").amount(), Some(1024.0));

        let quote = PriceQuote::new("24,99 €", "u");
        assert_eq!(quote.within_limit(25.0), Some(true));
        assert_eq!(quote.within_limit(24.0), Some(false));
    }

    #[test]
    fn test_within_limit() {
        let quote = PriceQuote::new("£24.99", "u");
        assert_eq!(quote.within_limit(25.0), Some(true));
        assert_eq!(quote.within_limit(24.99), Some(true));
        assert_eq!(quote.within_limit(20.0), Some(false));
        assert_eq!(PriceQuote::new("n/a", "u").within_limit(1.0), None);
    }

    #[test]
    fn test_response_shape() {
        let resp = LambdaResponse::ok(&PriceQuote::new("£24.99", "u"));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["body"], "The current price is: £24.99");
        assert_eq!(json.as_object().unwrap().len(), 2);
    }
}
