//! Overpass API client.

use std::time::Duration;

use async_trait::async_trait;

use super::query::{OverpassResponse, RawElement};
use super::{GeoError, GeodataBackend};

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_STEP: Duration = Duration::from_millis(1500);

/// Posts queries as the `data` form field. Retries 429/504 and transport
/// failures with linear backoff; any other HTTP error fails at once.
pub struct OverpassClient {
    client: reqwest::Client,
    url: String,
    backoff_step: Duration,
}

impl OverpassClient {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            backoff_step: BACKOFF_STEP,
        }
    }

    /// Override the delay unit; attempt `n` waits `n × step` before retrying.
    pub fn with_backoff_step(mut self, step: Duration) -> Self {
        self.backoff_step = step;
        self
    }

    async fn post_once(&self, query: &str) -> Result<Vec<RawElement>, GeoError> {
        let response = self
            .client
            .post(&self.url)
            .form(&[("data", query)])
            .send()
            .await
            .map_err(GeoError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeoError::http(status.as_u16(), &body));
        }

        let parsed: OverpassResponse = response.json().await.map_err(GeoError::from_reqwest)?;
        Ok(parsed.elements)
    }
}

#[async_trait]
impl GeodataBackend for OverpassClient {
    async fn execute(&self, query: &str) -> Result<Vec<RawElement>, GeoError> {
        let mut attempt = 1;
        loop {
            match self.post_once(query).await {
                Ok(elements) => {
                    tracing::debug!(
                        "[overpass] attempt={} elements={}",
                        attempt,
                        elements.len()
                    );
                    return Ok(elements);
                }
                Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                    let delay = self.backoff_step * attempt;
                    tracing::warn!(
                        "[overpass] attempt {} failed ({}), retrying in {:.1}s",
                        attempt,
                        e,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!("[overpass] giving up after attempt {}: {}", attempt, e);
                    return Err(e);
                }
            }
        }
    }
}
