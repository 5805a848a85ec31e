use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::Rng;

use crate::dora::dora_config::DoraConfig;
use crate::dora::error::CatalogError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const BACKOFF_STEP: Duration = Duration::from_millis(300);

/// Raw GET access to the catalog. Callers decode the body themselves.
#[async_trait]
pub trait CatalogTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<String, CatalogError>;
}

/// Single-shot HTTP access to dora.
#[derive(Clone, Debug)]
pub struct DoraClient {
    http: reqwest::Client,
}

impl DoraClient {
    pub fn new(config: &DoraConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.request_timeout())
            .build()
            .context("failed to build dora http client")?;

        Ok(Self { http })
    }

    /// Client that retries transient failures up to `fetch_attempts` times.
    pub fn with_retries(config: &DoraConfig) -> Result<Retrying<Self>> {
        Ok(Retrying::new(
            Self::new(config)?,
            config.fetch_attempts,
            BACKOFF_STEP,
        ))
    }
}

#[async_trait]
impl CatalogTransport for DoraClient {
    async fn get(&self, url: &str) -> Result<String, CatalogError> {
        let transport = |source| CatalogError::Transport {
            url: url.to_string(),
            source,
        };

        let resp = self.http.get(url).send().await.map_err(transport)?;

        let status = resp.status();
        let text = resp.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(CatalogError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }
}

/// Retries retryable failures of the wrapped transport with a growing delay.
#[derive(Debug, Clone)]
pub struct Retrying<T> {
    inner: T,
    attempts: usize,
    step: Duration,
}

impl<T: CatalogTransport> Retrying<T> {
    pub fn new(inner: T, attempts: usize, step: Duration) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            step,
        }
    }
}

#[async_trait]
impl<T: CatalogTransport> CatalogTransport for Retrying<T> {
    async fn get(&self, url: &str) -> Result<String, CatalogError> {
        let mut attempt = 1;

        loop {
            match self.inner.get(url).await {
                Ok(text) => return Ok(text),
                Err(error) if attempt < self.attempts && error.is_retryable() => {
                    let delay = backoff(self.step, attempt);
                    tracing::warn!(
                        %url,
                        %error,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "dora request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

fn backoff(step: Duration, attempt: usize) -> Duration {
    let step_ms = step.as_millis() as u64;
    let jitter = rand::rng().random_range(0..=step_ms / 2);
    Duration::from_millis(step_ms * attempt as u64 + jitter)
}
