use std::cell::Cell;

use price_utils::models::ProviderBar;
use price_utils::pricing::{Frequency, PricingRequest};
use price_utils::provider::{PriceProvider, parse_chart};
use price_utils::{PriceError, PriceSeries, Result, get_pricing_with};

const AAPL_DAILY: &str = include_str!("fixtures/aapl_2023-01-03_1d.json");
const NOT_FOUND: &str = include_str!("fixtures/not_found.json");

/// Replays a recorded chart payload and counts calls.
struct RecordedProvider {
    body: &'static str,
    calls: Cell<u32>,
}

impl RecordedProvider {
    fn new(body: &'static str) -> Self {
        Self {
            body,
            calls: Cell::new(0),
        }
    }
}

impl PriceProvider for RecordedProvider {
    fn fetch(&self, request: &PricingRequest) -> Result<Vec<ProviderBar>> {
        self.calls.set(self.calls.get() + 1);
        parse_chart(&request.ticker, self.body, request.frequency)
    }
}

struct BrokenProvider;

impl PriceProvider for BrokenProvider {
    fn fetch(&self, _request: &PricingRequest) -> Result<Vec<ProviderBar>> {
        Err(PriceError::Provider("connection reset".to_string()))
    }
}

#[test]
fn test_aapl_first_week_of_2023() {
    let provider = RecordedProvider::new(AAPL_DAILY);
    let series = get_pricing_with(&provider, "AAPL", "2023-01-03", "2023-01-10", "1d").unwrap();

    assert_eq!(series.len(), 5);
    assert_eq!(
        PriceSeries::COLUMNS,
        ["open_price", "high", "low", "close_price", "volume", "price"]
    );
    assert_eq!(PriceSeries::INDEX, ["timestamp", "symbol"]);
    assert!(series.prices().eq(series.close_prices()));
    assert!(series.rows.iter().all(|row| row.symbol == "AAPL"));
}

#[test]
fn test_row_count_matches_provider() {
    let bars = parse_chart("AAPL", AAPL_DAILY, Frequency::Day1).unwrap();
    let provider = RecordedProvider::new(AAPL_DAILY);
    let series = get_pricing_with(&provider, "AAPL", "2023-01-03", "2023-01-10", "daily").unwrap();

    assert_eq!(series.len(), bars.len());
    for (row, bar) in series.rows.iter().zip(&bars) {
        assert_eq!(row.timestamp, bar.timestamp);
        assert_eq!(row.open_price, bar.open);
        assert_eq!(row.close_price, bar.close);
        assert_eq!(row.price, bar.close);
        assert_eq!(row.volume, bar.volume);
    }
}

#[test]
fn test_repeated_calls_are_identical() {
    let provider = RecordedProvider::new(AAPL_DAILY);
    let first = get_pricing_with(&provider, "AAPL", "2023-01-03", "2023-01-10", "1d").unwrap();
    let second = get_pricing_with(&provider, "AAPL", "2023-01-03", "2023-01-10", "1d").unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
    assert_eq!(provider.calls.get(), 2);
}

#[test]
fn test_same_start_and_end_has_no_data() {
    let provider = RecordedProvider::new(AAPL_DAILY);
    let err = get_pricing_with(&provider, "AAPL", "2023-01-07", "2023-01-07", "1d").unwrap_err();

    assert!(matches!(err, PriceError::NoData { .. }));
    assert_eq!(
        err.to_string(),
        "No data found for AAPL from 2023-01-07 to 2023-01-07."
    );
    assert_eq!(provider.calls.get(), 0);
}

#[test]
fn test_empty_provider_result_has_no_data() {
    let body: &'static str =
        r#"{"chart":{"result":[{"meta":{"gmtoffset":-18000},"indicators":{"quote":[{}]}}],"error":null}}"#;
    let provider = RecordedProvider::new(body);
    let err = get_pricing_with(&provider, "AAPL", "2023-01-07", "2023-01-09", "1d").unwrap_err();
    assert!(matches!(err, PriceError::NoData { .. }));
}

#[test]
fn test_invalid_ticker_is_descriptive() {
    let provider = RecordedProvider::new(NOT_FOUND);
    let err =
        get_pricing_with(&provider, "ZZZZINVALID", "2023-01-03", "2023-01-10", "1d").unwrap_err();

    assert!(matches!(err, PriceError::Fetch { .. }));
    let message = err.to_string();
    assert!(message.starts_with("Error fetching data for ZZZZINVALID:"));
    assert!(message.contains("symbol may be delisted"));
}

#[test]
fn test_provider_failure_becomes_fetch_error() {
    let err = get_pricing_with(&BrokenProvider, "AAPL", "2023-01-03", "2023-01-10", "1d").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error fetching data for AAPL: Malformed provider response: connection reset"
    );
}

#[test]
fn test_unknown_frequency_rejected_before_fetch() {
    let provider = RecordedProvider::new(AAPL_DAILY);
    let err = get_pricing_with(&provider, "AAPL", "2023-01-03", "2023-01-10", "2y").unwrap_err();

    assert!(matches!(err, PriceError::UnsupportedFrequency(_)));
    assert_eq!(provider.calls.get(), 0);
}
