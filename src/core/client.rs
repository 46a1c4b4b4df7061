//! DeepL translate client
//!
//! One call per [`TranslationRequest`], no retries. Every failure is
//! classified into a [`TranslationError`] at this boundary.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{TranslationRequest, TranslationResult};

/// Timeout for the startup connection warm-up
const WARM_UP_TIMEOUT: Duration = Duration::from_secs(2);

/// Longest error body kept in a `ServiceError`
const MAX_ERROR_BODY: usize = 200;

/// Anything that can perform a single translate call
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate one request
    async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResult>;
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translations: Vec<TranslationPayload>,
}

#[derive(Debug, Deserialize)]
struct TranslationPayload {
    text: String,
    #[serde(default)]
    detected_source_language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    message: String,
}

/// HTTP client for the translate endpoint
#[derive(Debug, Clone)]
pub struct TranslationClient {
    client: reqwest::Client,
    config: Arc<TranslatorConfig>,
}

impl TranslationClient {
    /// Create a new translation client
    pub fn new(config: impl Into<Arc<TranslatorConfig>>) -> Result<Self> {
        let config = config.into();
        config
            .validate()
            .map_err(|e| TranslationError::ConfigError {
                message: e.to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| TranslationError::ConfigError {
                message: e.to_string(),
            })?;

        Ok(Self { client, config })
    }

    /// Create from environment
    pub fn from_env() -> Result<Self> {
        let config = TranslatorConfig::load().map_err(|e| TranslationError::ConfigError {
            message: e.to_string(),
        })?;
        Self::new(config)
    }

    /// Open a pooled connection to the service origin. Failures are ignored.
    pub async fn warm_up(&self) {
        let origin = match reqwest::Url::parse(&self.config.api_endpoint) {
            Ok(url) => url.origin().ascii_serialization(),
            Err(e) => {
                warn!("Cannot warm up connection, bad endpoint: {}", e);
                return;
            }
        };

        match self
            .client
            .get(&origin)
            .timeout(WARM_UP_TIMEOUT)
            .send()
            .await
        {
            Ok(_) => debug!(origin = %origin, "Connection warmed up"),
            Err(e) => warn!(origin = %origin, "Connection warm-up failed: {}", e),
        }
    }

    /// Form fields for one request
    fn form_params(&self, request: &TranslationRequest) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("auth_key", self.config.api_key.clone()),
            ("text", request.text.clone()),
            ("target_lang", request.target_lang.to_uppercase()),
        ];

        if let Some(source_lang) = &request.source_lang {
            params.push(("source_lang", source_lang.to_uppercase()));
        }

        let shaping = &request.shaping;
        if let Some(mode) = shaping.split_sentences {
            params.push(("split_sentences", mode.as_param().to_string()));
        }
        if let Some(preserve) = shaping.preserve_formatting {
            params.push(("preserve_formatting", if preserve { "1" } else { "0" }.to_string()));
        }
        if let Some(mode) = shaping.tag_handling {
            params.push(("tag_handling", mode.as_param().to_string()));
        }

        params
    }

    /// Send actual HTTP request
    async fn send_request(&self, request: &TranslationRequest) -> Result<TranslationResult> {
        let response = self
            .client
            .post(&self.config.api_endpoint)
            .form(&self.form_params(request))
            .send()
            .await
            .map_err(TranslationError::from)?;

        let status = response.status();
        let body = response.text().await.map_err(TranslationError::from)?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorPayload>(&body)
                .map(|payload| payload.message)
                .unwrap_or_else(|_| truncate(&body, MAX_ERROR_BODY));

            return Err(TranslationError::ServiceError {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: TranslateResponse = serde_json::from_str(&body)?;
        let first = parsed
            .translations
            .into_iter()
            .next()
            .ok_or_else(|| TranslationError::ProtocolError {
                message: "No translation in response".to_string(),
            })?;

        let source_lang_used = request
            .source_lang
            .clone()
            .or(first.detected_source_language);

        Ok(TranslationResult {
            source_text: request.text.clone(),
            translated_text: first.text,
            source_lang_used,
            target_lang_used: request.target_lang.to_uppercase(),
            timestamp: chrono::Utc::now(),
        })
    }
}

#[async_trait]
impl Translator for TranslationClient {
    async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResult> {
        debug!(
            text = %request.text,
            source = ?request.source_lang,
            target = %request.target_lang,
            "Translating"
        );

        let result = self.send_request(request).await;
        if let Err(e) = &result {
            error!("Translate request failed: {}", e);
        }
        result
    }
}

/// Cut `text` to at most `max` characters
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
