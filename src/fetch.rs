use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;

const USER_AGENT: &str = concat!("rada_votes/", env!("CARGO_PKG_VERSION"));
const BASE_BACKOFF_MS: u64 = 2000;

pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

/// Fetch a URL, returning status and body. Non-200 statuses are not errors.
#[allow(async_fn_in_trait)]
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(HttpFetcher { client })
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;
        let status = response.status().as_u16();
        // The pages declare windows-1251 but are served as UTF-8.
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;
        Ok(FetchResponse {
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

/// Retries transport errors and 429/5xx responses with exponential backoff.
pub struct Retry<F> {
    inner: F,
    max_retries: u32,
    base_backoff: Duration,
}

impl<F: Fetcher> Retry<F> {
    pub fn new(inner: F, max_retries: u32) -> Self {
        Retry {
            inner,
            max_retries,
            base_backoff: Duration::from_millis(BASE_BACKOFF_MS),
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff.saturating_mul(2u32.saturating_pow(attempt))
    }

    #[cfg(test)]
    fn with_backoff(mut self, base: Duration) -> Self {
        self.base_backoff = base;
        self
    }
}

impl<F: Fetcher> Fetcher for Retry<F> {
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        let mut attempt = 0;
        loop {
            let result = self.inner.fetch(url).await;
            let reason = match &result {
                Err(e) => Some(format!("{:#}", e)),
                Ok(r) if r.status == 429 || r.status >= 500 => Some(format!("status {}", r.status)),
                Ok(_) => None,
            };
            let Some(reason) = reason else {
                return result;
            };
            if attempt >= self.max_retries {
                return result;
            }

            let backoff = self.backoff(attempt);
            warn!(
                "{} on {} (attempt {}/{}), backing off {:.1}s",
                reason,
                url,
                attempt + 1,
                self.max_retries,
                backoff.as_secs_f64()
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }
}

/// Post-fetch cleanup applied before anything is stored or parsed.
pub fn normalize(body: &str) -> String {
    body.replace("charset=windows-1251", "charset=utf8")
        .replace('\u{a0}', "")
}
