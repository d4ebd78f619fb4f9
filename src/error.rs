use std::io;

use thiserror::Error;

/// Crate-wide `Result` alias with `PriceError` as the default error.
pub type Result<T, E = PriceError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum PriceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("WebDriver error ({error}): {message}")]
    WebDriver { error: String, message: String },

    #[error("Failed to launch driver service: {0}")]
    DriverLaunch(String),

    #[error("Timed out after {waited_ms}ms waiting for {what}")]
    Timeout { what: String, waited_ms: u128 },

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Error fetching data for {ticker}: {message}")]
    Fetch { ticker: String, message: String },

    /// The provider answered but returned no rows.
    #[error("No data found for {ticker} from {start} to {end}.")]
    NoData {
        ticker: String,
        start: String,
        end: String,
    },

    #[error("Invalid ticker '{0}'")]
    InvalidTicker(String),

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Start date {start} is after end date {end}")]
    InvalidRange { start: String, end: String },

    #[error("Unsupported frequency '{0}'")]
    UnsupportedFrequency(String),

    /// The provider payload did not have the expected shape.
    #[error("Malformed provider response: {0}")]
    Provider(String),
}

impl PriceError {
    pub(crate) fn webdriver(error: impl Into<String>, message: impl Into<String>) -> Self {
        PriceError::WebDriver {
            error: error.into(),
            message: message.into(),
        }
    }

    pub fn is_no_such_element(&self) -> bool {
        matches!(self, PriceError::WebDriver { error, .. } if error == "no such element")
    }

    /// The element was found but detached by a re-render before it could be read.
    pub fn is_stale_element(&self) -> bool {
        matches!(self, PriceError::WebDriver { error, .. } if error == "stale element reference")
    }
}
