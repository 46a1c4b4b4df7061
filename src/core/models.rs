//! Core data models for translation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label shown for an auto-detected source language
pub const AUTO_LABEL: &str = "auto";

/// A parsed user query. Immutable once produced by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Input exactly as typed
    pub raw_text: String,
    /// Source from the inline marker, if any
    pub parsed_source_lang: Option<String>,
    /// Target from the inline marker, if any
    pub parsed_target_lang: Option<String>,
    /// Trimmed text with the marker removed
    pub text_to_translate: String,
}

/// Resolved (source, target) pair. `source == None` means auto-detect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguagePair {
    /// Source code, `None` for auto-detect
    pub source: Option<String>,
    /// Target code
    pub target: String,
}

impl LanguagePair {
    /// Build a pair
    pub fn new(source: Option<String>, target: impl Into<String>) -> Self {
        Self {
            source,
            target: target.into(),
        }
    }

    /// Whether the service should detect the source language
    pub fn is_auto(&self) -> bool {
        self.source.is_none()
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} → {}",
            self.source.as_deref().unwrap_or(AUTO_LABEL),
            self.target
        )
    }
}

/// `split_sentences` request parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentenceSplitting {
    /// `0`: treat the input as one sentence
    Off,
    /// `1`: split on punctuation and newlines
    On,
    /// `nonewlines`: split on punctuation only
    NoNewlines,
}

impl SentenceSplitting {
    /// Form value
    pub fn as_param(&self) -> &'static str {
        match self {
            SentenceSplitting::Off => "0",
            SentenceSplitting::On => "1",
            SentenceSplitting::NoNewlines => "nonewlines",
        }
    }
}

/// `tag_handling` request parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagHandling {
    /// Treat the input as XML
    Xml,
    /// Treat the input as HTML
    Html,
}

impl TagHandling {
    /// Form value
    pub fn as_param(&self) -> &'static str {
        match self {
            TagHandling::Xml => "xml",
            TagHandling::Html => "html",
        }
    }
}

/// Optional request-shaping flags. All `None` means service defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapingOptions {
    /// `split_sentences`
    pub split_sentences: Option<SentenceSplitting>,
    /// `preserve_formatting`
    pub preserve_formatting: Option<bool>,
    /// `tag_handling`
    pub tag_handling: Option<TagHandling>,
}

impl ShapingOptions {
    /// Set `split_sentences`
    pub fn with_split_sentences(mut self, mode: SentenceSplitting) -> Self {
        self.split_sentences = Some(mode);
        self
    }

    /// Set `preserve_formatting`
    pub fn with_preserve_formatting(mut self, preserve: bool) -> Self {
        self.preserve_formatting = Some(preserve);
        self
    }

    /// Set `tag_handling`
    pub fn with_tag_handling(mut self, mode: TagHandling) -> Self {
        self.tag_handling = Some(mode);
        self
    }
}

/// Translation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRequest {
    /// Text to translate
    pub text: String,
    /// `None` lets the service detect the source
    pub source_lang: Option<String>,
    /// Target language code
    pub target_lang: String,
    /// Shaping flags
    pub shaping: ShapingOptions,
}

impl TranslationRequest {
    /// Request with auto-detected source and default shaping
    pub fn new(text: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_lang: None,
            target_lang: target_lang.into(),
            shaping: ShapingOptions::default(),
        }
    }

    /// Pin the source language
    pub fn with_source_lang(mut self, source_lang: impl Into<String>) -> Self {
        self.source_lang = Some(source_lang.into());
        self
    }

    /// Replace the shaping flags
    pub fn with_shaping(mut self, shaping: ShapingOptions) -> Self {
        self.shaping = shaping;
        self
    }

    /// Build a request for a resolved pair
    pub fn for_pair(text: impl Into<String>, pair: &LanguagePair) -> Self {
        let request = Self::new(text, pair.target.clone());
        match &pair.source {
            Some(source) => request.with_source_lang(source.clone()),
            None => request,
        }
    }
}

/// Outcome of exactly one successful translate call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    /// Text that was sent
    pub source_text: String,
    /// First translation returned
    pub translated_text: String,
    /// Requested source, or the language the service detected
    pub source_lang_used: Option<String>,
    /// Target code as sent
    pub target_lang_used: String,
    /// When the result arrived
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Character usage reported by the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    /// Characters consumed this period
    pub characters_used: u64,
    /// Characters allowed this period
    pub characters_limit: u64,
}

impl UsageStats {
    /// Characters left, never negative
    pub fn remaining(&self) -> u64 {
        self.characters_limit.saturating_sub(self.characters_used)
    }

    /// The remote counter ran past the limit; the quota is out of sync
    pub fn is_over_limit(&self) -> bool {
        self.characters_used > self.characters_limit
    }
}

/// Distinct translations for one query, in first-seen order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSet {
    entries: Vec<String>,
    all_failed: bool,
}

impl CandidateSet {
    /// Build from raw attempt outputs, dropping exact duplicates
    pub fn from_texts<I>(texts: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut entries: Vec<String> = Vec::new();
        for text in texts {
            if !entries.contains(&text) {
                entries.push(text);
            }
        }
        Self {
            entries,
            all_failed: false,
        }
    }

    /// Single synthesized entry for when every attempt failed
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            entries: vec![message.into()],
            all_failed: true,
        }
    }

    /// Distinct texts in first-seen order, or the single failure message
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every attempt errored; `entries` holds the message
    pub fn all_failed(&self) -> bool {
        self.all_failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_display() {
        let auto = LanguagePair::new(None, "EN");
        let explicit = LanguagePair::new(Some("ZH".to_string()), "EN");

        assert_eq!(auto.to_string(), "auto → EN");
        assert_eq!(explicit.to_string(), "ZH → EN");
        assert!(auto.is_auto());
    }

    #[test]
    fn test_request_for_pair() {
        let pair = LanguagePair::new(Some("ZH".to_string()), "EN");
        let request = TranslationRequest::for_pair("你好", &pair);

        assert_eq!(request.source_lang.as_deref(), Some("ZH"));
        assert_eq!(request.target_lang, "EN");
        assert_eq!(request.shaping, ShapingOptions::default());
    }

    #[test]
    fn test_usage_remaining() {
        let usage = UsageStats {
            characters_used: 1_500,
            characters_limit: 500_000,
        };
        assert_eq!(usage.remaining(), 498_500);
        assert!(!usage.is_over_limit());

        let drifted = UsageStats {
            characters_used: 600,
            characters_limit: 500,
        };
        assert_eq!(drifted.remaining(), 0);
        assert!(drifted.is_over_limit());
    }

    #[test]
    fn test_candidate_set_keeps_first_seen_order() {
        let set = CandidateSet::from_texts(vec![
            "Hello".to_string(),
            "Hi".to_string(),
            "Hello".to_string(),
            "Hello ".to_string(),
        ]);

        assert_eq!(set.entries(), &["Hello", "Hi", "Hello "]);
        assert!(!set.all_failed());
    }
}
