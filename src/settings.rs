use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;

pub const DEFAULT_URL_TEMPLATE: &str =
    "http://w1.c1.rada.gov.ua/pls/radan_gs09/ns_golos_print?g_id={id}&vid=1";

/// Runtime settings. Every field can be set through a `RADA_`-prefixed
/// environment variable (`RADA_DOC_DIR`, `RADA_DELAY_MS`, ...).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub url_template: String,
    pub doc_dir: PathBuf,
    pub headers_path: PathBuf,
    pub details_path: PathBuf,
    pub delay_ms: u64,
    /// 0 disables the request timeout.
    pub timeout_secs: u64,
    pub retries: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            doc_dir: PathBuf::from("source_docs"),
            headers_path: PathBuf::from("vote_headers.csv"),
            details_path: PathBuf::from("votes.csv.gz"),
            delay_ms: 1000,
            timeout_secs: 0,
            retries: 0,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        Config::builder()
            .add_source(Environment::with_prefix("RADA").try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .context("Failed to load RADA_* settings")
    }

    pub fn url_for(&self, id: u32) -> String {
        self.url_template.replace("{id}", &id.to_string())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_substitutes_id() {
        let s = Settings::default();
        assert_eq!(
            s.url_for(7),
            "http://w1.c1.rada.gov.ua/pls/radan_gs09/ns_golos_print?g_id=7&vid=1"
        );
    }

    #[test]
    fn zero_timeout_means_none() {
        let mut s = Settings::default();
        assert!(s.timeout().is_none());
        s.timeout_secs = 30;
        assert_eq!(s.timeout(), Some(Duration::from_secs(30)));
    }
}
