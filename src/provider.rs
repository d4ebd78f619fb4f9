use chrono::{DateTime, Duration, NaiveTime, Utc};
use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{PriceError, Result};
use crate::fetcher;
use crate::models::ProviderBar;
use crate::pricing::{Frequency, PricingRequest};

pub const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

pub trait PriceProvider {
    fn fetch(&self, request: &PricingRequest) -> Result<Vec<ProviderBar>>;
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    // absent when the range holds no bars
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteColumns>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Daily and coarser bars are labelled by their exchange-local date at midnight.
fn bar_time(epoch: i64, gmtoffset: i64, frequency: Frequency) -> Result<DateTime<Utc>> {
    let ts = DateTime::<Utc>::from_timestamp(epoch, 0)
        .ok_or_else(|| PriceError::Provider(format!("timestamp out of range: {}", epoch)))?;
    if frequency.is_intraday() {
        return Ok(ts);
    }
    let local_date = (ts + Duration::seconds(gmtoffset)).date_naive();
    Ok(local_date.and_time(NaiveTime::MIN).and_utc())
}

/// Decodes a chart payload into bars. Bars with a missing OHLC value (halts,
/// unfinished sessions) are dropped.
pub fn parse_chart(ticker: &str, body: &str, frequency: Frequency) -> Result<Vec<ProviderBar>> {
    let envelope: ChartEnvelope = serde_json::from_str(body)?;

    if let Some(error) = envelope.chart.error {
        return Err(PriceError::Fetch {
            ticker: ticker.to_string(),
            message: format!("{}: {}", error.code, error.description),
        });
    }
    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let Some(quote) = result.indicators.quote.into_iter().next() else {
        return Ok(Vec::new());
    };

    let rows = result.timestamp.len();
    let columns = [
        quote.open.len(),
        quote.high.len(),
        quote.low.len(),
        quote.close.len(),
        quote.volume.len(),
    ];
    if columns.iter().any(|&len| len != rows) {
        return Err(PriceError::Provider(format!(
            "column lengths {:?} do not match {} timestamps",
            columns, rows
        )));
    }

    let mut bars = Vec::with_capacity(rows);
    for (i, &epoch) in result.timestamp.iter().enumerate() {
        let (Some(open), Some(high), Some(low), Some(close)) =
            (quote.open[i], quote.high[i], quote.low[i], quote.close[i])
        else {
            debug!("Skipping incomplete bar at {}", epoch);
            continue;
        };
        bars.push(ProviderBar {
            timestamp: bar_time(epoch, result.meta.gmtoffset, frequency)?,
            open,
            high,
            low,
            close,
            volume: quote.volume[i].unwrap_or(0.0) as u64,
        });
    }
    Ok(bars)
}

pub struct YahooProvider {
    client: Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(fetcher::build_client()?, YAHOO_CHART_URL))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn chart_url(&self, ticker: &str) -> Result<Url> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| PriceError::Provider(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| PriceError::Provider(format!("not a base URL: {}", self.base_url)))?
            .push(ticker);
        Ok(url)
    }
}

impl PriceProvider for YahooProvider {
    fn fetch(&self, request: &PricingRequest) -> Result<Vec<ProviderBar>> {
        let url = self.chart_url(&request.ticker)?;
        let period1 = request.start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = request.end.and_time(NaiveTime::MIN).and_utc().timestamp();
        let query = [
            ("period1", period1.to_string()),
            ("period2", period2.to_string()),
            ("interval", request.frequency.to_string()),
            ("includePrePost", "false".to_string()),
        ];

        let (status, body) = fetcher::fetch_body(&self.client, url.as_str(), &query)?;
        match parse_chart(&request.ticker, &body, request.frequency) {
            Err(PriceError::Json(e)) if !status.is_success() => {
                warn!("Unreadable {} reply for {}: {}", status, request.ticker, e);
                Err(PriceError::Fetch {
                    ticker: request.ticker.clone(),
                    message: format!("HTTP {}", status),
                })
            }
            parsed => parsed,
        }
    }
}
