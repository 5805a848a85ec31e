use std::env;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use url::Url;

const API_URL_ENV: &str = "DORA_API_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct DoraConfig {
    #[serde(default)]
    pub api_url: String,

    /// Assets requested per catalog page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Attempts per request before a failure is final. 1 disables retries.
    #[serde(default = "default_fetch_attempts")]
    pub fetch_attempts: usize,
}

impl Default for DoraConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            page_size: default_page_size(),
            request_timeout_secs: default_request_timeout_secs(),
            fetch_attempts: default_fetch_attempts(),
        }
    }
}

impl DoraConfig {
    /// Applies `DORA_API_URL` over whatever the settings file declared.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(api_url) = env::var(API_URL_ENV) {
            self.api_url = api_url;
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// API base without a trailing slash, ready for path concatenation.
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_url.is_empty() {
            bail!("dora api_url is not set (settings file or {API_URL_ENV})");
        }
        Url::parse(&self.api_url)
            .with_context(|| format!("dora api_url is not a valid url: {}", self.api_url))?;
        if self.page_size == 0 {
            bail!("dora page_size must be > 0");
        }
        if self.request_timeout_secs == 0 {
            bail!("dora request_timeout_secs must be > 0");
        }
        if self.fetch_attempts == 0 {
            bail!("dora fetch_attempts must be >= 1");
        }
        Ok(())
    }
}

fn default_page_size() -> usize {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_fetch_attempts() -> usize {
    3
}
