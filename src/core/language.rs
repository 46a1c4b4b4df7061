//! Query parsing and language resolution
//!
//! A query is either plain text, translated with the configured defaults, or
//! text prefixed with an inline pair such as `zh:en 你好`. The marker sits at a
//! fixed offset: two letters, `:`, two letters, then whitespace.

use tracing::debug;

use crate::core::config::{TranslatorConfig, FALLBACK_TARGET_LANG};
use crate::core::errors::QueryError;
use crate::core::models::{LanguagePair, Query, AUTO_LABEL};

/// How a provider wants "detect the source for me" expressed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SourceNormalization {
    /// Leave `source_lang` out of the request
    #[default]
    Omit,
    /// Send this token instead, e.g. `AUTO`
    Literal(String),
}

impl SourceNormalization {
    /// Map a raw source code to what goes on the wire
    pub fn apply(&self, raw: &str) -> Option<String> {
        let code = raw.trim();
        if code.is_empty() || code.eq_ignore_ascii_case(AUTO_LABEL) {
            return match self {
                SourceNormalization::Omit => None,
                SourceNormalization::Literal(token) => Some(token.to_uppercase()),
            };
        }
        Some(code.to_uppercase())
    }
}

/// Parses raw launcher input into a query and a language pair
#[derive(Debug, Clone, Default)]
pub struct LanguageResolver {
    normalization: SourceNormalization,
}

impl LanguageResolver {
    /// Resolver using `normalization` for auto-detect
    pub fn new(normalization: SourceNormalization) -> Self {
        Self { normalization }
    }

    /// Uses `auto_source_token` when set, otherwise omits the source
    pub fn from_config(config: &TranslatorConfig) -> Self {
        let normalization = match &config.auto_source_token {
            Some(token) if !token.trim().is_empty() => {
                SourceNormalization::Literal(token.trim().to_string())
            }
            _ => SourceNormalization::Omit,
        };
        Self::new(normalization)
    }

    /// Resolve a raw query against the given defaults
    pub fn resolve(
        &self,
        raw_query: &str,
        default_source: &str,
        default_target: &str,
    ) -> Result<(Query, LanguagePair), QueryError> {
        let trimmed = raw_query.trim();
        if trimmed.is_empty() {
            return Err(QueryError::EmptyQueryError);
        }

        let (parsed_source, parsed_target, text) = match split_marker(trimmed) {
            Some((source, target, rest)) => (Some(source), Some(target), rest),
            None => (None, None, trimmed),
        };

        if text.is_empty() {
            return Err(QueryError::EmptyQueryError);
        }

        let source = match &parsed_source {
            Some(code) => self.normalization.apply(code),
            None => self.normalization.apply(default_source),
        };
        let target = parsed_target
            .as_deref()
            .map(str::to_uppercase)
            .or_else(|| {
                let configured = default_target.trim();
                (!configured.is_empty()).then(|| configured.to_uppercase())
            })
            .unwrap_or_else(|| FALLBACK_TARGET_LANG.to_string());

        let query = Query {
            raw_text: raw_query.to_string(),
            parsed_source_lang: parsed_source.map(|s| s.to_uppercase()),
            parsed_target_lang: parsed_target.map(|s| s.to_uppercase()),
            text_to_translate: text.to_string(),
        };
        let pair = LanguagePair::new(source, target);

        debug!(text = %query.text_to_translate, pair = %pair, "Resolved query");

        Ok((query, pair))
    }
}

/// Split `xx:yy rest` into its parts. `text` must already be trimmed.
fn split_marker(text: &str) -> Option<(String, String, &str)> {
    let mut chars = text.char_indices();

    let source = take_code(&mut chars)?;
    match chars.next() {
        Some((_, ':')) => {}
        _ => return None,
    }
    let target = take_code(&mut chars)?;

    let rest = match chars.next() {
        None => "",
        Some((idx, c)) if c.is_whitespace() => &text[idx..],
        Some(_) => return None,
    };

    Some((source, target, rest.trim()))
}

/// Two ASCII letters
fn take_code(chars: &mut std::str::CharIndices<'_>) -> Option<String> {
    let mut out = String::with_capacity(2);
    for _ in 0..2 {
        let (_, c) = chars.next()?;
        if !c.is_ascii_alphabetic() {
            return None;
        }
        out.push(c);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_query_uses_defaults() {
        let resolver = LanguageResolver::default();
        let (query, pair) = resolver.resolve("  你好  ", "", "EN").unwrap();

        assert_eq!(query.text_to_translate, "你好");
        assert_eq!(query.parsed_source_lang, None);
        assert_eq!(pair, LanguagePair::new(None, "EN"));
    }

    #[test]
    fn test_plain_query_with_explicit_default_source() {
        let resolver = LanguageResolver::default();
        let (_, pair) = resolver.resolve("bonjour", "fr", "de").unwrap();

        assert_eq!(pair, LanguagePair::new(Some("FR".to_string()), "DE"));
    }

    #[test]
    fn test_marker_overrides_defaults() {
        let resolver = LanguageResolver::default();
        let (query, pair) = resolver.resolve("zh:en 你好", "JA", "DE").unwrap();

        assert_eq!(query.text_to_translate, "你好");
        assert_eq!(query.parsed_source_lang.as_deref(), Some("ZH"));
        assert_eq!(query.parsed_target_lang.as_deref(), Some("EN"));
        assert_eq!(pair, LanguagePair::new(Some("ZH".to_string()), "EN"));
    }

    #[test]
    fn test_marker_remainder_is_trimmed() {
        let resolver = LanguageResolver::default();
        let (query, _) = resolver.resolve("  de:fr    guten tag \n", "", "EN").unwrap();

        assert_eq!(query.text_to_translate, "guten tag");
    }

    #[test]
    fn test_unknown_codes_pass_through_uppercased() {
        let resolver = LanguageResolver::default();
        let (_, pair) = resolver.resolve("xq:zz text", "", "EN").unwrap();

        assert_eq!(pair, LanguagePair::new(Some("XQ".to_string()), "ZZ"));
    }

    #[test]
    fn test_non_marker_colon_is_text() {
        let resolver = LanguageResolver::default();

        let (query, pair) = resolver.resolve("12:30 meeting", "", "EN").unwrap();
        assert_eq!(query.text_to_translate, "12:30 meeting");
        assert_eq!(pair, LanguagePair::new(None, "EN"));

        let (query, _) = resolver.resolve("zh:en你好", "", "EN").unwrap();
        assert_eq!(query.text_to_translate, "zh:en你好");

        let (query, _) = resolver.resolve("re: hello", "", "EN").unwrap();
        assert_eq!(query.text_to_translate, "re: hello");
    }

    #[test]
    fn test_empty_inputs_are_rejected() {
        let resolver = LanguageResolver::default();

        assert_eq!(
            resolver.resolve("", "", "EN"),
            Err(QueryError::EmptyQueryError)
        );
        assert_eq!(
            resolver.resolve(" \t\n ", "", "EN"),
            Err(QueryError::EmptyQueryError)
        );
        assert_eq!(
            resolver.resolve("zh:en   ", "", "EN"),
            Err(QueryError::EmptyQueryError)
        );
    }

    #[test]
    fn test_auto_source_normalization() {
        let omit = LanguageResolver::default();
        let (_, pair) = omit.resolve("hello", "auto", "DE").unwrap();
        assert_eq!(pair.source, None);

        let literal = LanguageResolver::new(SourceNormalization::Literal("auto".to_string()));
        let (_, pair) = literal.resolve("hello", "", "DE").unwrap();
        assert_eq!(pair.source.as_deref(), Some("AUTO"));
    }

    #[test]
    fn test_blank_default_target_falls_back() {
        let resolver = LanguageResolver::default();
        let (_, pair) = resolver.resolve("hola", "", " ").unwrap();

        assert_eq!(pair.target, FALLBACK_TARGET_LANG);
    }

    #[test]
    fn test_from_config_reads_auto_token() {
        let config = TranslatorConfig {
            auto_source_token: Some("AUTO".to_string()),
            ..TranslatorConfig::default()
        };
        let resolver = LanguageResolver::from_config(&config);

        assert_eq!(
            resolver.normalization,
            SourceNormalization::Literal("AUTO".to_string())
        );
    }
}
