//! Test doubles: an in-process stub of the translate/usage endpoints and
//! scripted [`Translator`] implementations.

use async_trait::async_trait;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Form, Router,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::core::client::Translator;
use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, TranslationError, UsageError};
use crate::core::models::{ShapingOptions, TranslationRequest, TranslationResult, UsageStats};
use crate::core::usage::UsageProvider;

/// One scripted HTTP answer
#[derive(Debug, Clone)]
pub(crate) struct StubReply {
    status: u16,
    body: String,
    delay: Option<Duration>,
}

impl StubReply {
    pub(crate) fn ok(body: serde_json::Value) -> Self {
        Self::status(200, body)
    }

    pub(crate) fn status(status: u16, body: serde_json::Value) -> Self {
        Self::raw(status, &body.to_string())
    }

    pub(crate) fn raw(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: None,
        }
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn into_response(self) -> Response {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            self.body,
        )
            .into_response()
    }
}

#[derive(Default)]
struct Endpoint {
    replies: Vec<StubReply>,
    calls: AtomicUsize,
    last_form: Mutex<Option<HashMap<String, String>>>,
}

impl Endpoint {
    /// Replies are consumed in order; the last one repeats
    fn next_reply(&self, form: HashMap<String, String>) -> StubReply {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_form.lock().unwrap() = Some(form);
        self.replies
            .get(index)
            .or_else(|| self.replies.last())
            .cloned()
            .unwrap_or_else(|| StubReply::status(404, serde_json::json!({"message": "no reply scripted"})))
    }
}

struct StubState {
    translate: Endpoint,
    usage: Endpoint,
}

/// A DeepL-shaped HTTP service on an ephemeral local port
pub(crate) struct StubService {
    base_url: String,
    state: Arc<StubState>,
}

impl StubService {
    pub(crate) async fn start(translate: Vec<StubReply>, usage: Vec<StubReply>) -> Self {
        let state = Arc::new(StubState {
            translate: Endpoint {
                replies: translate,
                ..Endpoint::default()
            },
            usage: Endpoint {
                replies: usage,
                ..Endpoint::default()
            },
        });

        let app = Router::new()
            .route("/v2/translate", post(translate_handler))
            .route("/v2/usage", post(usage_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub(crate) fn translate_url(&self) -> String {
        format!("{}/v2/translate", self.base_url)
    }

    pub(crate) fn usage_url(&self) -> String {
        format!("{}/v2/usage", self.base_url)
    }

    pub(crate) fn translate_calls(&self) -> usize {
        self.state.translate.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn usage_calls(&self) -> usize {
        self.state.usage.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_translate_form(&self) -> Option<HashMap<String, String>> {
        self.state.translate.last_form.lock().unwrap().clone()
    }

    pub(crate) fn last_usage_form(&self) -> Option<HashMap<String, String>> {
        self.state.usage.last_form.lock().unwrap().clone()
    }
}

async fn translate_handler(
    State(state): State<Arc<StubState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.translate.next_reply(form).into_response().await
}

async fn usage_handler(
    State(state): State<Arc<StubState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.usage.next_reply(form).into_response().await
}

/// Config pointing both endpoints at the stub
pub(crate) fn stub_config(stub: &StubService) -> TranslatorConfig {
    TranslatorConfig {
        api_key: "stub-key:fx".to_string(),
        api_endpoint: stub.translate_url(),
        usage_endpoint: stub.usage_url(),
        default_source_lang: String::new(),
        default_target_lang: "EN".to_string(),
        timeout_ms: 2_000,
        usage_timeout_ms: 1_000,
        ..TranslatorConfig::default()
    }
}

/// A local URL nothing listens on
pub(crate) fn unreachable_url(path: &str) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}{}", addr, path)
}

/// Answers from a script indexed by call number; the last entry repeats
pub(crate) struct ScriptedTranslator {
    script: Vec<Result<String>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<ShapingOptions>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedTranslator {
    pub(crate) fn new(script: Vec<Result<String>>) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub(crate) fn always(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    /// Hold every call until the gate has a permit
    pub(crate) fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn seen_shaping(&self) -> Vec<ShapingOptions> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Translator for ScriptedTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResult> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.shaping);

        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.map_err(|e| TranslationError::TransportError {
                message: e.to_string(),
            })?;
        }

        let reply = self
            .script
            .get(index)
            .or_else(|| self.script.last())
            .cloned()
            .unwrap_or_else(|| {
                Err(TranslationError::ProtocolError {
                    message: "empty script".to_string(),
                })
            })?;

        Ok(TranslationResult {
            source_text: request.text.clone(),
            translated_text: reply,
            source_lang_used: request.source_lang.clone(),
            target_lang_used: request.target_lang.clone(),
            timestamp: chrono::Utc::now(),
        })
    }
}

/// Panics on every call
pub(crate) struct PanickingTranslator;

#[async_trait]
impl Translator for PanickingTranslator {
    async fn translate(&self, _request: &TranslationRequest) -> Result<TranslationResult> {
        panic!("translator exploded");
    }
}

/// Fixed usage answer without any network
pub(crate) struct StaticUsage(Option<UsageStats>);

impl StaticUsage {
    pub(crate) fn unavailable() -> Self {
        Self(None)
    }

    pub(crate) fn of(used: u64, limit: u64) -> Self {
        Self(Some(UsageStats {
            characters_used: used,
            characters_limit: limit,
        }))
    }
}

#[async_trait]
impl UsageProvider for StaticUsage {
    async fn fetch(&self) -> std::result::Result<UsageStats, UsageError> {
        self.0.ok_or_else(|| UsageError::TransportError {
            message: "offline".to_string(),
        })
    }
}
