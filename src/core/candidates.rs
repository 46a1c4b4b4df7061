//! Alternative phrasings for one query
//!
//! Each attempt asks the service for the same text with different shaping
//! flags, which is enough to surface provider-side variation. Attempts are
//! not retries: a failed attempt is skipped, never repeated.

use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::client::Translator;
use crate::core::models::{
    CandidateSet, LanguagePair, SentenceSplitting, ShapingOptions, TagHandling, TranslationRequest,
};

/// Default number of attempts per query
pub const DEFAULT_ATTEMPTS: usize = 3;

/// Shaping variants, cycled when more attempts are requested
fn shaping_variants() -> [ShapingOptions; 3] {
    [
        ShapingOptions::default(),
        ShapingOptions::default()
            .with_split_sentences(SentenceSplitting::Off)
            .with_preserve_formatting(true),
        ShapingOptions::default()
            .with_split_sentences(SentenceSplitting::NoNewlines)
            .with_tag_handling(TagHandling::Xml),
    ]
}

/// Shaping used for attempt `index`
pub fn shaping_for_attempt(index: usize) -> ShapingOptions {
    let variants = shaping_variants();
    variants[index % variants.len()]
}

/// Issues several differently-shaped requests and keeps the distinct results
#[derive(Clone)]
pub struct CandidateGenerator {
    translator: Arc<dyn Translator>,
}

impl CandidateGenerator {
    /// Generator issuing attempts through `translator`
    pub fn new(translator: Arc<dyn Translator>) -> Self {
        Self { translator }
    }

    /// Never fails: if every attempt errors, the set holds one error message
    pub async fn generate(&self, text: &str, pair: &LanguagePair, attempts: usize) -> CandidateSet {
        let attempts = attempts.max(1);
        let requests: Vec<TranslationRequest> = (0..attempts)
            .map(|i| TranslationRequest::for_pair(text, pair).with_shaping(shaping_for_attempt(i)))
            .collect();

        let outcomes = join_all(requests.iter().map(|r| self.translator.translate(r))).await;

        let mut texts = Vec::with_capacity(attempts);
        let mut last_error = None;
        for (i, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(result) => texts.push(result.translated_text),
                Err(e) => {
                    warn!(attempt = i, "Candidate attempt failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        if texts.is_empty() {
            let message = match last_error {
                Some(e) => format!("{}: {}", e.category(), e),
                None => "Translation failed".to_string(),
            };
            return CandidateSet::failed(message);
        }

        let set = CandidateSet::from_texts(texts);
        debug!(attempts, distinct = set.len(), "Generated candidates");
        set
    }
}
