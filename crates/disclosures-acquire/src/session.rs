//! Cookie-carrying HTTP session that stands in for a browser tab.
//!
//! The age-verification state lives in cookies, so every request in a run
//! goes through one `Session`.

use anyhow::{Context, Result};
use disclosures_model::{HarvestConfig, HarvestError};
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// A loaded HTML page.
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects.
    pub url: String,
    pub html: String,
}

/// A raw response body, with no status check applied.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Fetched {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Clone)]
pub struct Session {
    client: reqwest::Client,
    jar: Arc<Jar>,
}

impl Session {
    /// Build a session with a browser-like identity and an empty cookie jar.
    pub fn new(cfg: &HarvestConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&cfg.accept_language).context("Invalid Accept-Language value")?,
        );

        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.as_str())
            .default_headers(headers)
            .cookie_provider(Arc::clone(&jar))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, jar })
    }

    /// Load an HTML page. Timeouts, transport failures and non-2xx statuses
    /// come back as distinct [`HarvestError`] variants.
    pub async fn goto(&self, url: &str, timeout: Duration) -> Result<Page, HarvestError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        let status = response.status();
        let final_url = response.url().to_string();
        if !status.is_success() {
            return Err(HarvestError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let html = response.text().await.map_err(|e| request_error(url, e))?;
        tracing::debug!(url = %final_url, status = status.as_u16(), bytes = html.len(), "Loaded page");

        Ok(Page { url: final_url, html })
    }

    /// Fetch a resource's bytes through the same session (cookies included).
    pub async fn fetch_bytes(&self, url: &str, timeout: Duration) -> Result<Fetched, HarvestError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response
            .bytes()
            .await
            .map_err(|e| request_error(url, e))?
            .to_vec();

        Ok(Fetched {
            status,
            content_type,
            body,
        })
    }

    /// Seed the cookie jar with a `name=value` cookie scoped to `url`'s host.
    pub fn add_cookie(&self, url: &str, cookie: &str) -> Result<(), HarvestError> {
        let parsed = Url::parse(url).map_err(|_| HarvestError::InvalidUrl(url.to_string()))?;
        self.jar.add_cookie_str(&format!("{cookie}; Path=/"), &parsed);
        tracing::debug!(host = parsed.host_str().unwrap_or_default(), "Added cookie to session");
        Ok(())
    }
}

fn request_error(url: &str, e: reqwest::Error) -> HarvestError {
    if e.is_timeout() {
        HarvestError::Timeout(url.to_string())
    } else {
        HarvestError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

/// Resolve `href` against the page it appeared on.
pub fn resolve(base: &str, href: &str) -> Result<String, HarvestError> {
    let base = Url::parse(base).map_err(|_| HarvestError::InvalidUrl(base.to_string()))?;
    base.join(href.trim())
        .map(|u| u.to_string())
        .map_err(|_| HarvestError::InvalidUrl(href.to_string()))
}
