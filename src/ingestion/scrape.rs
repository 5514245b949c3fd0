//! Page fetching with a rendered-DOM fallback.
//!
//! The primary strategy is a plain timed GET; it is cheap and covers most
//! documentation sites. Many sites render their content client-side,
//! though, so any transport failure, timeout, or non-2xx status falls back
//! to a headless-browser rendering endpoint (Browserless-style
//! `POST /content`) that loads the page, waits for network idle, and
//! returns the serialized DOM. Only when both strategies fail is the fetch
//! fatal to the ingestion job.

use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use url::Url;

use crate::types::{DocError, Result};

/// Fetches raw markup for a source URL.
#[derive(Clone, Debug)]
pub struct Scraper {
    client: Client,
    browser_endpoint: Option<Url>,
    timeout: Duration,
}

impl Scraper {
    pub fn new(client: Client, browser_endpoint: Option<Url>, timeout: Duration) -> Self {
        Self {
            client,
            browser_endpoint,
            timeout,
        }
    }

    /// Returns the page's raw markup, trying the direct fetch first and the
    /// rendering endpoint second.
    pub async fn fetch(&self, url: &Url) -> Result<String> {
        let primary_err = match self.fetch_direct(url).await {
            Ok(body) => return Ok(body),
            Err(err) => {
                tracing::warn!(
                    url = %url,
                    error = %err,
                    "direct fetch failed, trying rendered fallback"
                );
                err
            }
        };

        match self.fetch_rendered(url).await {
            Ok(body) => Ok(body),
            Err(fallback_err) => Err(DocError::Fetch {
                url: url.to_string(),
                primary: primary_err.to_string(),
                fallback: fallback_err.to_string(),
            }),
        }
    }

    async fn fetch_direct(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }

    /// Drives the rendering endpoint: the service loads the page in a
    /// headless browser, waits for network idle, and returns the DOM.
    async fn fetch_rendered(&self, url: &Url) -> Result<String> {
        let Some(endpoint) = &self.browser_endpoint else {
            return Err(DocError::Fetch {
                url: url.to_string(),
                primary: "skipped".to_string(),
                fallback: "no browser rendering endpoint configured".to_string(),
            });
        };

        let content_url = endpoint.join("content")?;
        let response = self
            .client
            .post(content_url)
            .timeout(self.timeout)
            .json(&json!({
                "url": url.as_str(),
                "gotoOptions": { "waitUntil": "networkidle2" },
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}
