use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::{StatusCode, redirect};
use tracing::debug;

use crate::error::Result;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub fn build_client() -> Result<Client> {
    let redirect_policy = redirect::Policy::custom(|attempt| {
        if attempt.previous().len() > 10 {
            attempt.error("Too many redirects (>10)")
        } else {
            attempt.follow()
        }
    });

    let client = Client::builder()
        .redirect(redirect_policy)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Client for a local WebDriver endpoint. Without a `timeout` commands may run
/// as long as the driver lets them, reqwest's 30s default would cut navigation
/// short of geckodriver's own page-load timeout.
pub fn build_webdriver_client(timeout: Option<Duration>) -> Result<Client> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(client)
}

pub fn fetch_html(client: &Client, url: &str) -> Result<String> {
    debug!("GET {}", url);
    let html = client.get(url).send()?.error_for_status()?.text()?;
    Ok(html)
}

/// GET returning the status and body without failing on non-2xx statuses.
/// Providers put error details in those bodies.
pub fn fetch_body(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<(StatusCode, String)> {
    debug!("GET {} {:?}", url, query);
    let resp = client.get(url).query(query).send()?;
    let status = resp.status();
    Ok((status, resp.text()?))
}
