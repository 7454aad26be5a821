use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use thiserror::Error;
use tracing::{error, info, warn};

use super::payload::{group_lines_for_push, LokiPushRequest};
use crate::event::LogLine;

/// Upper bound for a single backoff sleep.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Delay before retry number `attempt` (0-based): doubles from `base`,
/// capped at [`MAX_RETRY_DELAY`].
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
        .min(MAX_RETRY_DELAY)
}

#[derive(Error, Debug)]
pub enum LokiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Loki returned error: {status} - {body}")]
    LokiResponse { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LokiConfig {
    /// Base URL for Loki (e.g., "http://localhost:3100")
    pub url: String,

    /// Optional tenant ID for multi-tenant Loki (X-Scope-OrgID header)
    pub tenant_id: Option<String>,

    pub timeout: Duration,

    /// Retries after the first failed attempt
    pub max_retries: u32,

    /// Base delay for exponential backoff
    pub retry_base_delay: Duration,
}

impl Default for LokiConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3100".to_string(),
            tenant_id: None,
            timeout: Duration::from_secs(30),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(100),
        }
    }
}

impl LokiConfig {
    /// Get the push endpoint URL
    pub fn push_url(&self) -> String {
        format!("{}/loki/api/v1/push", self.url.trim_end_matches('/'))
    }
}

pub struct LokiClient {
    client: Client,
    config: LokiConfig,
    healthy: AtomicBool,
}

impl LokiClient {
    pub fn new(config: LokiConfig) -> Result<Self, LokiError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        info!("Loki client initialized for {}", config.push_url());

        Ok(Self {
            client,
            config,
            healthy: AtomicBool::new(true),
        })
    }

    /// Push lines to Loki with retry logic.
    pub fn push(&self, lines: &[LogLine]) -> Result<(), LokiError> {
        if lines.is_empty() {
            return Ok(());
        }

        let request = group_lines_for_push(lines);
        self.push_request(&request)
    }

    fn push_request(&self, request: &LokiPushRequest) -> Result<(), LokiError> {
        let mut attempt = 0;
        loop {
            match self.send_push_request(request) {
                Ok(()) => {
                    self.mark_healthy();
                    return Ok(());
                }
                Err(e) if attempt < self.config.max_retries => {
                    warn!(
                        "Loki push failed (attempt {}/{}): {}",
                        attempt + 1,
                        self.config.max_retries + 1,
                        e
                    );
                    thread::sleep(backoff_delay(self.config.retry_base_delay, attempt));
                    attempt += 1;
                }
                Err(e) => {
                    self.mark_unhealthy();
                    return Err(e);
                }
            }
        }
    }

    fn send_push_request(&self, request: &LokiPushRequest) -> Result<(), LokiError> {
        let mut req = self.client.post(self.config.push_url()).json(request);

        if let Some(ref tenant_id) = self.config.tenant_id {
            req = req.header("X-Scope-OrgID", tenant_id);
        }

        let response = req.send()?;
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().unwrap_or_default();
            Err(LokiError::LokiResponse {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// Whether the last push succeeded.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    fn mark_healthy(&self) {
        if !self.healthy.swap(true, Ordering::SeqCst) {
            info!("Loki connection recovered");
        }
    }

    fn mark_unhealthy(&self) {
        if self.healthy.swap(false, Ordering::SeqCst) {
            error!("Loki connection unhealthy");
        }
    }
}
