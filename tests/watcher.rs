use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use price_utils::config::{DEFAULT_SELECTOR, DEFAULT_URL, DriverProfile, WaitConfig, WatcherConfig};
use price_utils::driver::BrowserSession;
use price_utils::parser;
use price_utils::watcher::{get_product_price, watch_with};
use price_utils::{PriceError, Result};

/// Serves a fixed document once enough lookups have passed, mimicking
/// client-side rendering. Records every call.
struct RenderingPage {
    html_after_render: &'static str,
    renders_after: u32,
    lookups: u32,
    log: Rc<RefCell<Vec<String>>>,
}

impl BrowserSession for RenderingPage {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.log.borrow_mut().push(format!("navigate {url}"));
        Ok(())
    }

    fn find_text(&mut self, selector: &str) -> Result<Option<String>> {
        self.lookups += 1;
        if self.lookups < self.renders_after {
            return parser::select_text("<html><body><div id=app></div></body></html>", selector);
        }
        parser::select_text(self.html_after_render, selector)
    }

    fn quit(&mut self) -> Result<()> {
        self.log.borrow_mut().push("quit".to_string());
        Ok(())
    }
}

const RENDERED: &str = r#"
<html><body><div id="app">
  <h1>Sports Multi AM/PM</h1>
  <span class="dropin-price dropin-price--default dropin-price--small dropin-price--bold">£24.99</span>
</div></body></html>
"#;

fn page(renders_after: u32, log: Rc<RefCell<Vec<String>>>) -> RenderingPage {
    RenderingPage {
        html_after_render: RENDERED,
        renders_after,
        lookups: 0,
        log,
    }
}

fn wait(timeout_ms: u64) -> WaitConfig {
    WaitConfig {
        timeout: Duration::from_millis(timeout_ms),
        poll_interval: Duration::from_millis(1),
    }
}

#[test]
fn test_price_rendered_before_deadline() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let quote = get_product_price(page(4, log.clone()), DEFAULT_URL, DEFAULT_SELECTOR, wait(1_000))
        .unwrap();

    assert_eq!(quote.text, "£24.99");
    assert_eq!(
        *log.borrow(),
        vec![format!("navigate {DEFAULT_URL}"), "quit".to_string()]
    );
}

#[test]
fn test_price_never_rendered() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let err = get_product_price(
        page(u32::MAX, log.clone()),
        DEFAULT_URL,
        DEFAULT_SELECTOR,
        wait(20),
    )
    .unwrap_err();

    assert!(matches!(err, PriceError::Timeout { .. }));
    assert_eq!(log.borrow().last().map(String::as_str), Some("quit"));
}

#[test]
fn test_handler_envelope() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut config = WatcherConfig::new(DriverProfile::Serverless);
    config.wait = wait(1_000);
    config.limit = Some(20.0);

    let response = watch_with(&config, || Ok(page(1, log.clone()))).unwrap();
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json, serde_json::json!({
        "statusCode": 200,
        "body": "The current price is: £24.99"
    }));
    assert_eq!(log.borrow().iter().filter(|entry| *entry == "quit").count(), 1);
}
