//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// DeepL free-tier API origin
const FREE_API_BASE: &str = "https://api-free.deepl.com";

/// DeepL paid API origin
const PRO_API_BASE: &str = "https://api.deepl.com";

/// Free-tier keys carry this suffix
const FREE_KEY_SUFFIX: &str = ":fx";

/// Target used when the configured default is blank
pub const FALLBACK_TARGET_LANG: &str = "EN";

/// Upper bound for the usage lookup timeout
pub const MAX_USAGE_TIMEOUT_MS: u64 = 5_000;

/// Configuration for the query translator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// DeepL auth key
    pub api_key: String,
    /// Full URL of `/v2/translate`
    pub api_endpoint: String,
    /// Full URL of `/v2/usage`
    pub usage_endpoint: String,
    /// Source used when the query has no marker; empty or `auto` means detect
    pub default_source_lang: String,
    /// Target used when the query has no marker
    pub default_target_lang: String,
    /// Literal token sent for auto-detect; `None` omits `source_lang`
    pub auto_source_token: Option<String>,
    /// Display wrap width in graphemes
    pub wrap_width: Option<usize>,
    /// Translate request timeout
    pub timeout_ms: u64,
    /// Usage lookup timeout, never above [`MAX_USAGE_TIMEOUT_MS`]
    pub usage_timeout_ms: u64,
    /// Maximum cached results
    pub cache_capacity: usize,
    /// `1` translates once through the cache; more solicits alternative phrasings
    pub candidate_attempts: usize,
    /// Icon path attached to every result item
    pub icon: String,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_endpoint: format!("{}/v2/translate", FREE_API_BASE),
            usage_endpoint: format!("{}/v2/usage", FREE_API_BASE),
            default_source_lang: String::new(),
            default_target_lang: FALLBACK_TARGET_LANG.to_string(),
            auto_source_token: None,
            wrap_width: None,
            timeout_ms: 10_000,
            usage_timeout_ms: MAX_USAGE_TIMEOUT_MS,
            cache_capacity: 100,
            candidate_attempts: 1,
            icon: "images/icon.png".to_string(),
        }
    }
}

/// Pick the API origin matching the key's plan
fn api_base_for_key(api_key: &str) -> &'static str {
    if api_key.is_empty() || api_key.ends_with(FREE_KEY_SUFFIX) {
        FREE_API_BASE
    } else {
        PRO_API_BASE
    }
}

/// Variable lookup, `std::env::var` outside of tests
pub(crate) type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Read an optional variable, treating blank values as unset
fn var_opt(lookup: Lookup<'_>, name: &str) -> Option<String> {
    lookup(name).filter(|v| !v.trim().is_empty())
}

/// Parse an optional variable
fn var_parse<T>(lookup: Lookup<'_>, name: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var_opt(lookup, name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} is invalid: {}", name, e)),
        None => Ok(None),
    }
}

impl TranslatorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        Self::env_settings(&process_env)?.require_key()
    }

    /// Load configuration, falling back to `DEEPL_CONFIG` when it names a file
    pub fn load() -> anyhow::Result<Self> {
        Self::load_settings()?.require_key()
    }

    /// Same as [`load`](Self::load) but leaves the key check to the caller,
    /// for hosts that supply the key themselves
    pub fn load_settings() -> anyhow::Result<Self> {
        Self::settings(&process_env)
    }

    pub(crate) fn settings(lookup: Lookup<'_>) -> anyhow::Result<Self> {
        let Some(path) = var_opt(lookup, "DEEPL_CONFIG") else {
            return Self::env_settings(lookup);
        };

        info!("Loading configuration from {}", path);
        let mut config = Self::from_file(&path)?;
        if config.api_key.is_empty() {
            if let Some(api_key) = var_opt(lookup, "DEEPL_AUTH_KEY") {
                config.set_api_key(api_key);
            }
        }
        Ok(config)
    }

    fn env_settings(lookup: Lookup<'_>) -> anyhow::Result<Self> {
        let api_key = lookup("DEEPL_AUTH_KEY").unwrap_or_default();
        let base = api_base_for_key(&api_key);

        let mut config = Self {
            api_endpoint: var_opt(lookup, "DEEPL_API_URL")
                .unwrap_or_else(|| format!("{}/v2/translate", base)),
            usage_endpoint: var_opt(lookup, "DEEPL_USAGE_URL")
                .unwrap_or_else(|| format!("{}/v2/usage", base)),
            api_key,
            ..Self::default()
        };

        if let Some(source) = lookup("DEFAULT_SOURCE_LANG") {
            config.default_source_lang = source;
        }
        if let Some(target) = var_opt(lookup, "DEFAULT_TARGET_LANG") {
            config.default_target_lang = target;
        }
        config.auto_source_token = var_opt(lookup, "AUTO_SOURCE_TOKEN");
        config.wrap_width = var_parse::<usize>(lookup, "WRAP_WIDTH")?;

        if let Some(timeout_ms) = var_parse::<u64>(lookup, "REQUEST_TIMEOUT_MS")? {
            config.timeout_ms = timeout_ms;
        }
        if let Some(usage_timeout_ms) = var_parse::<u64>(lookup, "USAGE_TIMEOUT_MS")? {
            config.usage_timeout_ms = usage_timeout_ms;
        }
        if let Some(capacity) = var_parse::<usize>(lookup, "CACHE_CAPACITY")? {
            config.cache_capacity = capacity;
        }
        if let Some(attempts) = var_parse::<usize>(lookup, "CANDIDATE_ATTEMPTS")? {
            config.candidate_attempts = attempts;
        }
        if let Some(icon) = var_opt(lookup, "RESULT_ICON") {
            config.icon = icon;
        }

        Ok(config.normalized())
    }

    fn require_key(self) -> anyhow::Result<Self> {
        if self.api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("DEEPL_AUTH_KEY environment variable is required"));
        }
        Ok(self)
    }

    /// Load from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config.normalized())
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Replace the key; endpoints still derived from the old key follow the new key's plan
    pub fn set_api_key(&mut self, api_key: impl Into<String>) {
        let old_base = api_base_for_key(&self.api_key);
        self.api_key = api_key.into();
        let new_base = api_base_for_key(&self.api_key);

        if self.api_endpoint == format!("{}/v2/translate", old_base) {
            self.api_endpoint = format!("{}/v2/translate", new_base);
        }
        if self.usage_endpoint == format!("{}/v2/usage", old_base) {
            self.usage_endpoint = format!("{}/v2/usage", new_base);
        }
    }

    /// Clamp and fill values that have a documented fallback
    fn normalized(mut self) -> Self {
        if self.default_target_lang.trim().is_empty() {
            warn!(
                "Default target language is empty, using {}",
                FALLBACK_TARGET_LANG
            );
            self.default_target_lang = FALLBACK_TARGET_LANG.to_string();
        }
        if self.usage_timeout_ms > MAX_USAGE_TIMEOUT_MS {
            warn!(
                requested = self.usage_timeout_ms,
                "Usage timeout clamped to {}ms", MAX_USAGE_TIMEOUT_MS
            );
            self.usage_timeout_ms = MAX_USAGE_TIMEOUT_MS;
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_key.is_empty() {
            return Err(anyhow::anyhow!("API key is required"));
        }

        if self.api_endpoint.is_empty() {
            return Err(anyhow::anyhow!("API endpoint is required"));
        }

        if self.usage_endpoint.is_empty() {
            return Err(anyhow::anyhow!("Usage endpoint is required"));
        }

        if self.cache_capacity == 0 {
            return Err(anyhow::anyhow!("cache_capacity must be greater than 0"));
        }

        if self.candidate_attempts == 0 {
            return Err(anyhow::anyhow!("candidate_attempts must be greater than 0"));
        }

        if self.timeout_ms == 0 || self.usage_timeout_ms == 0 {
            return Err(anyhow::anyhow!("timeouts must be greater than 0"));
        }

        if self.wrap_width == Some(0) {
            warn!("wrap_width of 0 disables wrapping");
        }

        Ok(())
    }

    /// Whether queries should solicit several phrasings
    pub fn uses_candidates(&self) -> bool {
        self.candidate_attempts > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn settings_from(vars: &HashMap<String, String>) -> anyhow::Result<TranslatorConfig> {
        TranslatorConfig::settings(&|name: &str| vars.get(name).cloned())
    }

    fn test_config() -> TranslatorConfig {
        TranslatorConfig {
            api_key: "test_key:fx".to_string(),
            api_endpoint: "https://test.com/v2/translate".to_string(),
            usage_endpoint: "https://test.com/v2/usage".to_string(),
            ..TranslatorConfig::default()
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_config_validation_missing_key() {
        let config = TranslatorConfig {
            api_key: "".to_string(),
            ..test_config()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_capacity() {
        let config = TranslatorConfig {
            cache_capacity: 0,
            ..test_config()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_base_follows_key_plan() {
        assert_eq!(api_base_for_key("abc:fx"), FREE_API_BASE);
        assert_eq!(api_base_for_key("abc"), PRO_API_BASE);
        assert_eq!(api_base_for_key(""), FREE_API_BASE);
    }

    #[test]
    fn test_default_is_independent_of_environment() {
        let config = TranslatorConfig::default();

        assert!(config.api_key.is_empty());
        assert_eq!(config.api_endpoint, format!("{}/v2/translate", FREE_API_BASE));
        assert_eq!(config.usage_endpoint, format!("{}/v2/usage", FREE_API_BASE));
    }

    #[test]
    fn test_env_settings_without_key_keep_other_values() {
        let env = vars(&[
            ("DEFAULT_TARGET_LANG", "DE"),
            ("CACHE_CAPACITY", "7"),
            ("WRAP_WIDTH", "40"),
        ]);

        let config = settings_from(&env).unwrap();

        assert!(config.api_key.is_empty());
        assert_eq!(config.default_target_lang, "DE");
        assert_eq!(config.cache_capacity, 7);
        assert_eq!(config.wrap_width, Some(40));
        assert!(config.require_key().is_err());
    }

    #[test]
    fn test_env_settings_derive_endpoints_from_key() {
        let env = vars(&[("DEEPL_AUTH_KEY", "paid"), ("USAGE_TIMEOUT_MS", "60000")]);

        let config = settings_from(&env).unwrap().require_key().unwrap();

        assert_eq!(config.api_endpoint, format!("{}/v2/translate", PRO_API_BASE));
        assert_eq!(config.usage_timeout_ms, MAX_USAGE_TIMEOUT_MS);
    }

    #[test]
    fn test_malformed_values_are_errors() {
        let env = vars(&[("WRAP_WIDTH", "wide")]);
        let err = settings_from(&env).unwrap_err();
        assert!(err.to_string().contains("WRAP_WIDTH"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let env = vars(&[("DEEPL_CONFIG", path.to_str().unwrap())]);
        assert!(settings_from(&env).is_err());
    }

    #[test]
    fn test_config_file_takes_key_from_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"default_target_lang": "FR"}"#).unwrap();
        let env = vars(&[
            ("DEEPL_CONFIG", path.to_str().unwrap()),
            ("DEEPL_AUTH_KEY", "paid"),
        ]);

        let config = settings_from(&env).unwrap();

        assert_eq!(config.api_key, "paid");
        assert_eq!(config.default_target_lang, "FR");
        assert_eq!(config.api_endpoint, format!("{}/v2/translate", PRO_API_BASE));
    }

    #[test]
    fn test_set_api_key_moves_derived_endpoints() {
        let mut config = TranslatorConfig {
            api_key: "free:fx".to_string(),
            api_endpoint: format!("{}/v2/translate", FREE_API_BASE),
            usage_endpoint: "http://127.0.0.1:9/v2/usage".to_string(),
            ..TranslatorConfig::default()
        };

        config.set_api_key("paid");

        assert_eq!(config.api_key, "paid");
        assert_eq!(config.api_endpoint, format!("{}/v2/translate", PRO_API_BASE));
        assert_eq!(config.usage_endpoint, "http://127.0.0.1:9/v2/usage");
    }

    #[test]
    fn test_normalized_fills_blank_target_and_clamps_usage_timeout() {
        let config = TranslatorConfig {
            default_target_lang: "  ".to_string(),
            usage_timeout_ms: 30_000,
            ..test_config()
        }
        .normalized();

        assert_eq!(config.default_target_lang, FALLBACK_TARGET_LANG);
        assert_eq!(config.usage_timeout_ms, MAX_USAGE_TIMEOUT_MS);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = TranslatorConfig {
            default_target_lang: "DE".to_string(),
            candidate_attempts: 3,
            wrap_width: Some(40),
            ..test_config()
        };
        config.to_file(&path).unwrap();

        let loaded = TranslatorConfig::from_file(&path).unwrap();
        assert_eq!(loaded.default_target_lang, "DE");
        assert_eq!(loaded.candidate_attempts, 3);
        assert_eq!(loaded.wrap_width, Some(40));
        assert!(loaded.uses_candidates());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{"api_key": "k:fx", "default_target_lang": ""}"#).unwrap();

        let loaded = TranslatorConfig::from_file(&path).unwrap();
        assert_eq!(loaded.api_key, "k:fx");
        assert_eq!(loaded.default_target_lang, FALLBACK_TARGET_LANG);
        assert_eq!(loaded.cache_capacity, 100);
        assert_eq!(loaded.timeout_ms, 10_000);
    }
}
