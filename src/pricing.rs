use chrono::NaiveDate;
use strum::{Display, EnumString};
use tracing::{debug, info};

use crate::error::{PriceError, Result};
use crate::models::{PriceRow, PriceSeries, ProviderBar};
use crate::provider::{PriceProvider, YahooProvider};

pub const DEFAULT_FREQUENCY: &str = "1d";

/// Interval codes the provider accepts. `minute` and `daily` are the legacy
/// platform's spellings of `1m` and `1d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum Frequency {
    #[strum(to_string = "1m", serialize = "minute")]
    Minute1,
    #[strum(to_string = "2m")]
    Minute2,
    #[strum(to_string = "5m")]
    Minute5,
    #[strum(to_string = "15m")]
    Minute15,
    #[strum(to_string = "30m")]
    Minute30,
    #[strum(to_string = "60m")]
    Minute60,
    #[strum(to_string = "90m")]
    Minute90,
    #[strum(to_string = "1h")]
    Hour1,
    #[strum(to_string = "1d", serialize = "daily")]
    Day1,
    #[strum(to_string = "5d")]
    Day5,
    #[strum(to_string = "1wk")]
    Week1,
    #[strum(to_string = "1mo")]
    Month1,
    #[strum(to_string = "3mo")]
    Month3,
}

impl Frequency {
    pub fn parse(s: &str) -> Result<Self> {
        s.trim()
            .parse()
            .map_err(|_| PriceError::UnsupportedFrequency(s.to_string()))
    }

    /// Bars shorter than a day carry a time of day.
    pub fn is_intraday(self) -> bool {
        !matches!(
            self,
            Frequency::Day1 | Frequency::Day5 | Frequency::Week1 | Frequency::Month1 | Frequency::Month3
        )
    }
}

/// One provider query. `end` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingRequest {
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub frequency: Frequency,
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| PriceError::InvalidDate(s.to_string()))
}

impl PricingRequest {
    pub fn new(ticker: &str, start_date: &str, end_date: &str, frequency: &str) -> Result<Self> {
        let start = parse_date(start_date)?;
        let end = parse_date(end_date)?;
        if start > end {
            return Err(PriceError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        // the symbol index level must equal the ticker as given
        if ticker.is_empty() || ticker.trim() != ticker {
            return Err(PriceError::InvalidTicker(ticker.to_string()));
        }
        Ok(Self {
            ticker: ticker.to_string(),
            start,
            end,
            frequency: Frequency::parse(frequency)?,
        })
    }

    fn no_data(&self) -> PriceError {
        PriceError::NoData {
            ticker: self.ticker.clone(),
            start: self.start.to_string(),
            end: self.end.to_string(),
        }
    }
}

/// Renames provider columns, derives `price` from `close_price` and keys each
/// row by timestamp and `ticker`. Pure: the same bars always give the same series.
pub fn shape(bars: &[ProviderBar], ticker: &str) -> PriceSeries {
    let mut rows: Vec<PriceRow> = bars
        .iter()
        .map(|bar| PriceRow {
            timestamp: bar.timestamp,
            symbol: ticker.to_string(),
            open_price: bar.open,
            high: bar.high,
            low: bar.low,
            close_price: bar.close,
            volume: bar.volume,
            price: bar.close,
        })
        .collect();
    rows.sort_by_key(|row| row.timestamp);
    PriceSeries { rows }
}

pub fn get_pricing_with<P: PriceProvider>(
    provider: &P,
    ticker: &str,
    start_date: &str,
    end_date: &str,
    frequency: &str,
) -> Result<PriceSeries> {
    let request = PricingRequest::new(ticker, start_date, end_date, frequency)?;
    if request.start == request.end {
        // half-open range, nothing can fall inside it
        return Err(request.no_data());
    }

    info!(
        "Fetching {} {} bars from {} to {}",
        request.ticker, request.frequency, request.start, request.end
    );
    let bars = provider.fetch(&request).map_err(|e| match e {
        PriceError::Fetch { .. } => e,
        other => PriceError::Fetch {
            ticker: request.ticker.clone(),
            message: other.to_string(),
        },
    })?;
    if bars.is_empty() {
        return Err(request.no_data());
    }

    let series = shape(&bars, &request.ticker);
    debug!("Shaped {} rows for {}", series.len(), request.ticker);
    Ok(series)
}

/// Fetches one ticker's series from Yahoo Finance in the legacy layout.
pub fn get_pricing(ticker: &str, start_date: &str, end_date: &str, frequency: &str) -> Result<PriceSeries> {
    let provider = YahooProvider::new()?;
    get_pricing_with(&provider, ticker, start_date, end_date, frequency)
}
