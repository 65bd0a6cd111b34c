use crate::config::timeouts;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::{Client, Response};
use tracing::debug;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Plain HTTP access to marketplace pages, no browser involved
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::build(HeaderMap::new())
    }

    /// Every request carries `Referer: referer`, as the site's own filter form does
    pub fn with_referer(referer: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_str(referer).context("Invalid referer")?);
        Self::build(headers)
    }

    fn build(headers: HeaderMap) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeouts::HTTP)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    pub async fn get(&self, url: &str) -> Result<String> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;
        Self::body(url, response).await
    }

    pub async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<String> {
        debug!("POST {} {:?}", url, form);
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .with_context(|| format!("Failed to post to {}", url))?;
        Self::body(url, response).await
    }

    async fn body(url: &str, response: Response) -> Result<String> {
        if !response.status().is_success() {
            anyhow::bail!("{} returned status: {}", url, response.status());
        }
        let html = response.text().await.context("Failed to read response body")?;
        debug!("Downloaded {} bytes from {}", html.len(), url);
        Ok(html)
    }
}
