//! Browser automation over the W3C WebDriver protocol.
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::config::{DriverConfig, WaitConfig};
use crate::error::{PriceError, Result};
use crate::fetcher;
use crate::parser;
use crate::wait;

const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// The browser operations the price watcher needs.
pub trait BrowserSession {
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// Text of the first element matching `selector`, or `None` if nothing
    /// matches yet.
    fn find_text(&mut self, selector: &str) -> Result<Option<String>>;

    /// Ends the session. Must be safe to call more than once.
    fn quit(&mut self) -> Result<()>;
}

/// Owns a session and guarantees `quit` runs, either through `release` or on drop.
pub struct SessionGuard<S: BrowserSession> {
    session: Option<S>,
}

impl<S: BrowserSession> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self {
            session: Some(session),
        }
    }

    pub fn session(&mut self) -> &mut S {
        // only `release` and `drop` take the session out, both consume the guard
        self.session
            .as_mut()
            .unwrap_or_else(|| unreachable!("session already released"))
    }

    /// Quits the session, surfacing any error from the driver.
    pub fn release(mut self) -> Result<()> {
        match self.session.take() {
            Some(mut session) => session.quit(),
            None => Ok(()),
        }
    }
}

impl<S: BrowserSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.quit() {
                warn!("Failed to release browser session: {}", e);
            }
        }
    }
}

/// Turns a WebDriver reply into its `value`, or the error it carries.
pub(crate) fn unwrap_value(body: Value) -> Result<Value> {
    let value = body.get("value").cloned().unwrap_or(Value::Null);
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return Err(PriceError::webdriver(error, message));
    }
    Ok(value)
}

/// `New Session` capabilities for a headless Firefox at `config.binary`.
pub fn firefox_capabilities(config: &DriverConfig) -> Value {
    let args: Vec<&str> = if config.headless {
        vec!["-headless"]
    } else {
        Vec::new()
    };
    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "firefox",
                "moz:firefoxOptions": {
                    "binary": config.binary.to_string_lossy(),
                    "args": args,
                }
            }
        }
    })
}

/// A remote-end session reached over HTTP.
#[derive(Debug)]
pub struct WebDriverSession {
    client: Client,
    base_url: String,
    session_id: Option<String>,
}

impl WebDriverSession {
    pub fn create(client: Client, base_url: &str, capabilities: &Value) -> Result<Self> {
        let body: Value = client
            .post(format!("{}/session", base_url))
            .json(capabilities)
            .send()?
            .json()?;
        let value = unwrap_value(body)?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| PriceError::webdriver("session not created", "missing sessionId"))?
            .to_string();
        info!("WebDriver session {} started", session_id);

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            session_id: Some(session_id),
        })
    }

    fn endpoint(&self, path: &str) -> Result<String> {
        let id = self
            .session_id
            .as_deref()
            .ok_or_else(|| PriceError::webdriver("invalid session id", "session already closed"))?;
        Ok(format!("{}/session/{}{}", self.base_url, id, path))
    }

    fn post(&self, path: &str, payload: Value) -> Result<Value> {
        let body: Value = self
            .client
            .post(self.endpoint(path)?)
            .json(&payload)
            .send()?
            .json()?;
        unwrap_value(body)
    }

    fn get(&self, path: &str) -> Result<Value> {
        let body: Value = self.client.get(self.endpoint(path)?).send()?.json()?;
        unwrap_value(body)
    }
}

impl BrowserSession for WebDriverSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);
        self.post("/url", json!({ "url": url }))?;
        Ok(())
    }

    fn find_text(&mut self, selector: &str) -> Result<Option<String>> {
        let element = match self.post(
            "/element",
            json!({ "using": "css selector", "value": selector }),
        ) {
            Ok(element) => element,
            Err(e) if e.is_no_such_element() || e.is_stale_element() => return Ok(None),
            Err(e) => return Err(e),
        };
        let element_id = element
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| PriceError::webdriver("unknown error", "element reference missing"))?
            .to_string();

        // a re-render between lookup and read detaches the element, look again next poll
        let text = match self.get(&format!("/element/{}/text", element_id)) {
            Ok(text) => text,
            Err(e) if e.is_stale_element() => {
                debug!("Element {} went stale", element_id);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        Ok(Some(text.as_str().unwrap_or_default().to_string()))
    }

    fn quit(&mut self) -> Result<()> {
        let Some(id) = self.session_id.take() else {
            return Ok(());
        };
        let body: Value = self
            .client
            .delete(format!("{}/session/{}", self.base_url, id))
            .send()?
            .json()?;
        unwrap_value(body)?;
        info!("WebDriver session {} closed", id);
        Ok(())
    }
}

/// Port for a new driver service. `None` asks the OS for a free one; an explicit
/// port must not already be taken, otherwise the readiness check could reach a
/// driver left over from another run.
pub fn reserve_port(requested: Option<u16>) -> Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", requested.unwrap_or(0))).map_err(|e| {
        PriceError::DriverLaunch(format!("port {} unavailable: {}", requested.unwrap_or(0), e))
    })?;
    Ok(listener.local_addr()?.port())
}

/// A running geckodriver process, killed on drop.
pub struct GeckoService {
    child: Child,
    base_url: String,
}

impl GeckoService {
    pub fn start(client: &Client, config: &DriverConfig, port: Option<u16>) -> Result<Self> {
        let port = reserve_port(port)?;
        let child = Command::new(&config.driver_path)
            .arg("--port")
            .arg(port.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                PriceError::DriverLaunch(format!("{}: {}", config.driver_path.display(), e))
            })?;

        let mut service = Self {
            child,
            base_url: format!("http://127.0.0.1:{}", port),
        };
        service.wait_ready(client)?;
        info!("geckodriver listening on {}", service.base_url);
        Ok(service)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn wait_ready(&mut self, client: &Client) -> Result<()> {
        let status_url = format!("{}/status", self.base_url);
        let startup = WaitConfig {
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
        };
        wait::poll_until("geckodriver to accept connections", startup, || {
            if let Some(status) = self.child.try_wait()? {
                return Err(PriceError::DriverLaunch(format!(
                    "driver exited early with {}",
                    status
                )));
            }
            // refused connections mean the port is not bound yet
            let Ok(resp) = client
                .get(&status_url)
                .timeout(Duration::from_secs(2))
                .send()
            else {
                return Ok(None);
            };
            let ready = resp
                .json::<Value>()
                .ok()
                .and_then(|body| body.pointer("/value/ready").and_then(Value::as_bool))
                .unwrap_or(false);
            Ok(ready.then_some(()))
        })
    }
}

impl Drop for GeckoService {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            debug!("geckodriver already stopped: {}", e);
        }
        let _ = self.child.wait();
    }
}

/// Headless Firefox driven through its own geckodriver process.
pub struct FirefoxSession {
    // declared first so the session is dropped before the service
    session: WebDriverSession,
    _service: GeckoService,
}

impl FirefoxSession {
    pub fn launch(client: Client, config: &DriverConfig, port: Option<u16>) -> Result<Self> {
        info!(
            "Launching {} via {}",
            config.binary.display(),
            config.driver_path.display()
        );
        let service = GeckoService::start(&client, config, port)?;
        let session =
            WebDriverSession::create(client, service.base_url(), &firefox_capabilities(config))?;
        Ok(Self {
            session,
            _service: service,
        })
    }
}

impl BrowserSession for FirefoxSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.session.navigate(url)
    }

    fn find_text(&mut self, selector: &str) -> Result<Option<String>> {
        self.session.find_text(selector)
    }

    fn quit(&mut self) -> Result<()> {
        self.session.quit()
    }
}

/// Session backed by a plain HTTP download. No scripts run, so the page is
/// only ever in its server-rendered state.
pub struct StaticPageSession {
    client: Client,
    html: Option<String>,
}

impl StaticPageSession {
    pub fn new(client: Client) -> Self {
        Self { client, html: None }
    }
}

impl BrowserSession for StaticPageSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.html = Some(fetcher::fetch_html(&self.client, url)?);
        Ok(())
    }

    fn find_text(&mut self, selector: &str) -> Result<Option<String>> {
        match &self.html {
            Some(html) => parser::select_text(html, selector),
            None => Ok(None),
        }
    }

    fn quit(&mut self) -> Result<()> {
        self.html = None;
        Ok(())
    }
}
