//! Query Translator - non-blocking launcher translations
//!
//! Resolves a launcher query into a language pair, answers immediately with a
//! placeholder, and fills the result slot from a background DeepL call with
//! result caching, usage reporting and optional alternative phrasings.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod core;
pub mod server;
pub mod cli;

// Re-export key types for convenience
pub use core::{
    cache::{CacheKey, EvictionPolicy, InsertionOrder, LeastRecentlyUsed, ResultCache},
    candidates::CandidateGenerator,
    client::{TranslationClient, Translator},
    config::TranslatorConfig,
    coordinator::{QueryCoordinator, QueryPhase, QuerySlot, QueryState},
    errors::{QueryError, TranslationError, UsageError},
    language::{LanguageResolver, SourceNormalization},
    models::{CandidateSet, LanguagePair, Query, TranslationRequest, TranslationResult, UsageStats},
    render::{DisplayText, ItemAction, ResultItem},
    usage::{UsageProvider, UsageTracker},
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
