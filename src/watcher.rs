//! Failures are not turned into error responses. They propagate to the caller
//! as `Err`, after the browser session has been released.
use serde_json::Value;
use tracing::{info, warn};

use crate::config::{WaitConfig, WatcherConfig};
use crate::driver::{BrowserSession, FirefoxSession, SessionGuard, StaticPageSession};
use crate::error::Result;
use crate::fetcher;
use crate::models::{LambdaResponse, PriceQuote};
use crate::parser;
use crate::wait;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Headless Firefox through geckodriver.
    #[default]
    Firefox,
    /// Plain HTTP download, no scripts.
    Static,
}

/// Opens `url` in `session`, waits for `selector` to show non-empty text and
/// returns it. The session is quit whether or not this succeeds.
pub fn get_product_price<S: BrowserSession>(
    session: S,
    url: &str,
    selector: &str,
    wait: WaitConfig,
) -> Result<PriceQuote> {
    let mut guard = SessionGuard::new(session);

    let text = {
        let session = guard.session();
        session.navigate(url)?;
        wait::poll_until(&format!("element '{}'", selector), wait, || {
            Ok(session
                .find_text(selector)?
                .filter(|text| !text.trim().is_empty()))
        })?
    };
    guard.release()?;

    let quote = PriceQuote::new(text, url);
    info!("Current Price: {}", quote.text);
    Ok(quote)
}

/// Runs one watch with a caller-provided session launcher.
pub fn watch_with<S, F>(config: &WatcherConfig, launch: F) -> Result<LambdaResponse>
where
    S: BrowserSession,
    F: FnOnce() -> Result<S>,
{
    // reject bad selectors before paying for a browser launch
    parser::parse_selector(&config.selector)?;

    let session = launch()?;
    let quote = get_product_price(session, &config.url, &config.selector, config.wait)?;

    if let Some(limit) = config.limit {
        match quote.within_limit(limit) {
            Some(true) => info!("Price {} is within the limit of {:.2}", quote.text, limit),
            Some(false) => info!("Price {} is above the limit of {:.2}", quote.text, limit),
            None => warn!("Could not read an amount from '{}'", quote.text),
        }
    }

    Ok(LambdaResponse::ok(&quote))
}

pub fn watch(config: &WatcherConfig, backend: Backend) -> Result<LambdaResponse> {
    match backend {
        Backend::Firefox => watch_with(config, || {
            let client = fetcher::build_webdriver_client(config.command_timeout)?;
            FirefoxSession::launch(client, &config.driver, config.webdriver_port)
        }),
        Backend::Static => watch_with(config, || {
            Ok(StaticPageSession::new(fetcher::build_client()?))
        }),
    }
}

/// Serverless entry point. Both arguments are accepted for the platform's
/// calling convention and ignored.
pub fn lambda_handler(_event: Option<Value>, _context: Option<Value>) -> Result<LambdaResponse> {
    watch(&WatcherConfig::default(), Backend::Firefox)
}
