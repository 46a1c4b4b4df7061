//! Per-query orchestration
//!
//! `handle` resolves the query on the caller's thread and returns at once
//! with a [`QuerySlot`] showing a placeholder. Network work runs on a spawned
//! worker task; a second, coordinator-owned task awaits the worker's join
//! handle and publishes the terminal state on the slot's `watch` channel.
//!
//! Queries are independent: there is no cancellation, and a newer query does
//! not affect an older one. A host that shows several slots in one place gets
//! last-writer-wins ordering.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info};

use crate::core::cache::{CacheKey, CacheStats, ResultCache};
use crate::core::candidates::CandidateGenerator;
use crate::core::client::{TranslationClient, Translator};
use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::language::LanguageResolver;
use crate::core::models::{CandidateSet, LanguagePair, Query, TranslationRequest, TranslationResult};
use crate::core::render::{ItemRenderer, ResultItem};
use crate::core::usage::{UsageProvider, UsageTracker};

/// Lifecycle of one query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryPhase {
    /// Raw input accepted
    Received,
    /// Language pair decided
    Resolved,
    /// Worker running; the placeholder is showing
    Dispatched,
    /// Result or classified error is showing
    Completed,
    /// The worker died
    Failed,
    /// Empty input; nothing was dispatched
    Prompt,
}

impl QueryPhase {
    /// No further updates will follow
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueryPhase::Completed | QueryPhase::Failed | QueryPhase::Prompt
        )
    }
}

/// What the host should currently show for a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryState {
    /// Where the query is in its lifecycle
    pub phase: QueryPhase,
    /// `None` only for the empty-query prompt
    pub pair: Option<LanguagePair>,
    /// Rows to display, in order
    pub items: Vec<ResultItem>,
}

/// Read side of one query's result slot
#[derive(Debug, Clone)]
pub struct QuerySlot {
    receiver: watch::Receiver<QueryState>,
}

impl QuerySlot {
    fn settled(state: QueryState) -> Self {
        let (_, receiver) = watch::channel(state);
        Self { receiver }
    }

    /// Snapshot of the current state
    pub fn current(&self) -> QueryState {
        self.receiver.borrow().clone()
    }

    /// Current phase
    pub fn phase(&self) -> QueryPhase {
        self.receiver.borrow().phase
    }

    /// Wait for the terminal state
    pub async fn finished(&self) -> QueryState {
        let mut receiver = self.receiver.clone();
        loop {
            {
                let state = receiver.borrow_and_update();
                if state.phase.is_terminal() {
                    return state.clone();
                }
            }
            if receiver.changed().await.is_err() {
                return receiver.borrow().clone();
            }
        }
    }
}

/// Result of the dispatched work, before rendering
#[derive(Debug)]
enum WorkerOutcome {
    Translated {
        result: TranslationResult,
        usage: String,
    },
    Candidates {
        set: CandidateSet,
        usage: String,
    },
    Error {
        error: TranslationError,
    },
}

/// Everything the worker needs, cheap to clone into a task
#[derive(Clone)]
struct Dispatcher {
    translator: Arc<dyn Translator>,
    usage: Arc<dyn UsageProvider>,
    cache: Arc<ResultCache>,
    candidates: CandidateGenerator,
    attempts: usize,
}

impl Dispatcher {
    async fn run(self, query: Query, pair: LanguagePair) -> WorkerOutcome {
        let text = query.text_to_translate;
        info!(text = %text, pair = %pair, "Starting translation");

        if self.attempts > 1 {
            let (set, usage) = tokio::join!(
                self.candidates.generate(&text, &pair, self.attempts),
                self.usage.summary()
            );
            return WorkerOutcome::Candidates { set, usage };
        }

        let key = CacheKey::new(&text, &pair);
        let request = TranslationRequest::for_pair(text.clone(), &pair);
        let (translated, usage) = tokio::join!(
            self.cache
                .get_or_compute(key, || self.translator.translate(&request)),
            self.usage.summary()
        );

        match translated {
            Ok(result) => {
                info!("Translation completed: '{}' ==> '{}'", text, result.translated_text);
                WorkerOutcome::Translated { result, usage }
            }
            Err(error) => WorkerOutcome::Error { error },
        }
    }
}

/// Coordinates resolution, caching, translation and usage for each query
pub struct QueryCoordinator {
    config: Arc<TranslatorConfig>,
    resolver: LanguageResolver,
    renderer: ItemRenderer,
    dispatcher: Dispatcher,
    runtime: Option<Handle>,
}

impl QueryCoordinator {
    /// Coordinator over explicit translator and usage implementations
    pub fn new(
        config: impl Into<Arc<TranslatorConfig>>,
        translator: Arc<dyn Translator>,
        usage: Arc<dyn UsageProvider>,
    ) -> Self {
        let config = config.into();
        let dispatcher = Dispatcher {
            candidates: CandidateGenerator::new(translator.clone()),
            translator,
            usage,
            cache: Arc::new(ResultCache::new(config.cache_capacity)),
            attempts: config.candidate_attempts.max(1),
        };

        Self {
            resolver: LanguageResolver::from_config(&config),
            renderer: ItemRenderer::new(config.icon.clone(), config.wrap_width),
            dispatcher,
            config,
            runtime: None,
        }
    }

    /// Build with the HTTP translate client and usage tracker
    pub fn from_config(config: TranslatorConfig) -> Result<Self> {
        let config = Arc::new(config);
        let translator = TranslationClient::new(config.clone())?;
        let usage = UsageTracker::new(config.clone()).map_err(|e| TranslationError::ConfigError {
            message: e.to_string(),
        })?;
        Ok(Self::new(config, Arc::new(translator), Arc::new(usage)))
    }

    /// Spawn workers on this runtime instead of the caller's ambient one
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        match &self.runtime {
            Some(runtime) => runtime.spawn(future),
            None => tokio::spawn(future),
        }
    }

    /// Handle one query. Never waits on the network.
    ///
    /// Without [`with_runtime`](Self::with_runtime) this must be called from
    /// within a Tokio runtime.
    pub fn handle(&self, raw_query: &str) -> QuerySlot {
        debug!(phase = ?QueryPhase::Received, query = %raw_query);

        let (query, pair) = match self.resolver.resolve(
            raw_query,
            &self.config.default_source_lang,
            &self.config.default_target_lang,
        ) {
            Ok(resolved) => resolved,
            Err(_) => {
                debug!(phase = ?QueryPhase::Prompt, "Empty query");
                return QuerySlot::settled(QueryState {
                    phase: QueryPhase::Prompt,
                    pair: None,
                    items: self.renderer.prompt(),
                });
            }
        };
        debug!(phase = ?QueryPhase::Resolved, pair = %pair);

        let (sender, receiver) = watch::channel(QueryState {
            phase: QueryPhase::Dispatched,
            pair: Some(pair.clone()),
            items: self.renderer.placeholder(&pair),
        });

        let worker = self.spawn(self.dispatcher.clone().run(query, pair.clone()));
        let renderer = self.renderer.clone();
        self.spawn(async move {
            let state = settle(worker.await, &renderer, pair);
            debug!(phase = ?state.phase, "Publishing result");
            sender.send_replace(state);
        });

        QuerySlot { receiver }
    }

    /// Usage summary, or the unavailable marker
    pub async fn usage_summary(&self) -> String {
        self.dispatcher.usage.summary().await
    }

    /// Result cache counters
    pub async fn cache_stats(&self) -> CacheStats {
        self.dispatcher.cache.stats().await
    }
}

/// Turn the worker's join result into the terminal state
fn settle(
    joined: std::result::Result<WorkerOutcome, JoinError>,
    renderer: &ItemRenderer,
    pair: LanguagePair,
) -> QueryState {
    let (phase, items) = match joined {
        Ok(WorkerOutcome::Translated { result, usage }) => {
            (QueryPhase::Completed, renderer.translation(&result, &usage, &pair))
        }
        Ok(WorkerOutcome::Candidates { set, usage }) => {
            (QueryPhase::Completed, renderer.candidates(&set, &usage, &pair))
        }
        Ok(WorkerOutcome::Error { error }) => {
            (QueryPhase::Completed, renderer.translation_error(&error, &pair))
        }
        Err(join_error) => {
            let message = describe_join_error(join_error);
            error!("Translation worker failed: {}", message);
            (QueryPhase::Failed, renderer.failure(&message))
        }
    };

    QueryState {
        phase,
        pair: Some(pair),
        items,
    }
}

fn describe_join_error(join_error: JoinError) -> String {
    if !join_error.is_panic() {
        return join_error.to_string();
    }
    let payload = join_error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}
