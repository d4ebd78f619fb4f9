//! Two small price utilities.
//!
//! - `watcher` scrapes one product price through a headless browser and wraps
//!   it in a serverless response envelope.
//! - `pricing` fetches a historical OHLCV series and reshapes it into the
//!   layout of the legacy `get_pricing` API.
pub mod config;
pub mod driver;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod output;
pub mod parser;
pub mod pricing;
pub mod provider;
pub mod wait;
pub mod watcher;

pub use error::{PriceError, Result};
pub use models::{LambdaResponse, PriceQuote, PriceRow, PriceSeries};
pub use pricing::{Frequency, get_pricing, get_pricing_with};
pub use watcher::{Backend, lambda_handler};
