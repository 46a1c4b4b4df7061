//! Remote character-quota lookup and formatting

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::config::{TranslatorConfig, MAX_USAGE_TIMEOUT_MS};
use crate::core::errors::UsageError;
use crate::core::models::UsageStats;

/// Shown instead of a summary when the lookup fails
pub const USAGE_UNAVAILABLE: &str = "Usage unavailable";

/// Limit assumed when the service omits `character_limit`
const DEFAULT_CHARACTER_LIMIT: u64 = 500_000;

/// Source of usage statistics
#[async_trait]
pub trait UsageProvider: Send + Sync {
    /// Current counters from the provider
    async fn fetch(&self) -> Result<UsageStats, UsageError>;

    /// Formatted summary, or [`USAGE_UNAVAILABLE`] on any failure
    async fn summary(&self) -> String {
        match self.fetch().await {
            Ok(stats) => format_usage(&stats),
            Err(e) => {
                warn!("Usage lookup failed: {}", e);
                USAGE_UNAVAILABLE.to_string()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct UsageResponse {
    #[serde(default)]
    character_count: u64,
    #[serde(default = "default_character_limit")]
    character_limit: u64,
}

fn default_character_limit() -> u64 {
    DEFAULT_CHARACTER_LIMIT
}

/// Usage tracker backed by the usage endpoint
#[derive(Debug, Clone)]
pub struct UsageTracker {
    client: reqwest::Client,
    config: Arc<TranslatorConfig>,
    timeout: Duration,
}

impl UsageTracker {
    /// Create a new usage tracker
    pub fn new(config: impl Into<Arc<TranslatorConfig>>) -> Result<Self, UsageError> {
        let config = config.into();
        // Bounded regardless of how the config was built
        let timeout = Duration::from_millis(config.usage_timeout_ms.min(MAX_USAGE_TIMEOUT_MS));
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            config,
            timeout,
        })
    }
}

#[async_trait]
impl UsageProvider for UsageTracker {
    async fn fetch(&self) -> Result<UsageStats, UsageError> {
        let response = self
            .client
            .post(&self.config.usage_endpoint)
            .form(&[("auth_key", self.config.api_key.as_str())])
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UsageError::ServiceError {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let parsed: UsageResponse =
            serde_json::from_str(&body).map_err(|e| UsageError::ProtocolError {
                message: e.to_string(),
            })?;

        if parsed.character_limit == 0 {
            return Err(UsageError::ProtocolError {
                message: "character_limit is 0".to_string(),
            });
        }

        let stats = UsageStats {
            characters_used: parsed.character_count,
            characters_limit: parsed.character_limit,
        };

        if stats.is_over_limit() {
            warn!(
                used = stats.characters_used,
                limit = stats.characters_limit,
                "Reported usage exceeds the limit; remote quota is out of sync"
            );
        }
        debug!(remaining = stats.remaining(), "Fetched usage");

        Ok(stats)
    }
}

/// `Used 1,234/500,000 characters (498,766 remaining)`
pub fn format_usage(stats: &UsageStats) -> String {
    format!(
        "Used {}/{} characters ({} remaining)",
        group_thousands(stats.characters_used),
        group_thousands(stats.characters_limit),
        group_thousands(stats.remaining())
    )
}

/// Insert `,` every three digits
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
