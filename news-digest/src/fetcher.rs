use crate::types::{FetchConfig, FetchError};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const ERROR_DETAILS_LIMIT: usize = 150;

pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// GET `url` and return the body. Retryable failures are retried with
    /// exponential backoff up to `max_retries` times.
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let start_time = Instant::now();

        // Doubling delays starting at retry_delay_seconds
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_secs(self.config.retry_delay_seconds),
            initial_interval: Duration::from_secs(self.config.retry_delay_seconds),
            max_interval: Duration::from_secs(self.config.retry_delay_seconds * 32),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(self.config.retry_delay_seconds * 60)),
            ..Default::default()
        };

        let mut attempt = 0;
        loop {
            match self.fetch_once(url).await {
                Ok(body) => {
                    info!(
                        "Successfully fetched feed: {} ({} bytes, {} ms)",
                        url,
                        body.len(),
                        start_time.elapsed().as_millis()
                    );
                    return Ok(body);
                }
                // Transport errors, 5xx and 429 get another attempt
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    match backoff.next_backoff() {
                        Some(delay) => {
                            warn!("Attempt {} failed for {}: {}; retrying in {:?}", attempt, url, e, delay);
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            error!("Giving up on {} after {} attempts: {}", url, attempt, e);
                            return Err(e);
                        }
                    }
                }
                // Client errors and parse failures are final
                Err(e) => {
                    error!("Failed to fetch feed {}: {}", url, e);
                    return Err(e);
                }
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        debug!("Fetching: {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            // Only a short excerpt of the error page goes into the message
            let body = response.text().await.unwrap_or_default();
            let details: String = body.chars().take(ERROR_DETAILS_LIMIT).collect();
            return Err(FetchError::Status {
                status: status.as_u16(),
                message: format!(
                    "HTTP {} - {}. Details: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown"),
                    details
                ),
            });
        }

        Ok(response.text().await?)
    }
}
