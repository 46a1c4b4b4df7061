//! CLI command definitions and handlers

use clap::{Args, Subcommand};
use std::time::Duration;

use crate::core::client::TranslationClient;
use crate::core::config::TranslatorConfig;
use crate::core::coordinator::{QueryCoordinator, QueryState};
use crate::core::render::{ItemAction, ResultItem};

/// Commands for Query Translator
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate a launcher query, e.g. `zh:en 你好` or `bonjour`
    Query {
        /// Query text; words are joined with spaces
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },

    /// Show remaining character quota
    Usage,

    /// Start the HTTP bridge for launcher hosts
    Serve {
        /// Bind address (default: 127.0.0.1)
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Listen port (default: 8765)
        #[arg(short, long, default_value_t = 8765)]
        port: u16,
    },
}

/// Settings that override the loaded configuration
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// DeepL auth key (defaults to DEEPL_AUTH_KEY)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Default target language (defaults to DEFAULT_TARGET_LANG or EN)
    #[arg(short, long, global = true)]
    pub target: Option<String>,

    /// Default source language; empty or `auto` lets the service detect it
    #[arg(short, long, global = true)]
    pub source: Option<String>,

    /// Translate this many times with different shaping and list distinct results;
    /// bare `--attempts` means 3
    #[arg(long, global = true, num_args = 0..=1, default_missing_value = "3")]
    pub attempts: Option<usize>,

    /// Wrap displayed text at this many columns
    #[arg(long, global = true)]
    pub wrap_width: Option<usize>,
}

impl ConfigOverrides {
    /// Load configuration and apply overrides on top
    pub fn load(&self) -> anyhow::Result<TranslatorConfig> {
        self.finish(TranslatorConfig::load_settings()?)
    }

    fn finish(&self, mut config: TranslatorConfig) -> anyhow::Result<TranslatorConfig> {
        self.apply(&mut config);
        anyhow::ensure!(
            !config.api_key.trim().is_empty(),
            "No API key: set DEEPL_AUTH_KEY or pass --api-key"
        );
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, config: &mut TranslatorConfig) {
        if let Some(api_key) = &self.api_key {
            config.set_api_key(api_key.clone());
        }
        if let Some(target) = &self.target {
            config.default_target_lang = target.clone();
        }
        if let Some(source) = &self.source {
            config.default_source_lang = source.clone();
        }
        if let Some(attempts) = self.attempts {
            config.candidate_attempts = attempts;
        }
        if self.wrap_width.is_some() {
            config.wrap_width = self.wrap_width;
        }
    }
}

/// Handle query command
pub async fn handle_query(text: Vec<String>, overrides: &ConfigOverrides) -> anyhow::Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};
    use std::time::Instant;
    use tracing::info;

    let config = overrides.load()?;
    let coordinator = QueryCoordinator::from_config(config)?;

    let start_time = Instant::now();
    let slot = coordinator.handle(&text.join(" "));
    let placeholder = slot.current();

    if placeholder.phase.is_terminal() {
        print_state(&placeholder);
        return Ok(());
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")?
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "));
    pb.enable_steady_tick(Duration::from_millis(80));
    pb.set_message(
        placeholder
            .items
            .first()
            .map(|item| item.title.plain.clone())
            .unwrap_or_default(),
    );

    let state = slot.finished().await;
    pb.finish_and_clear();

    info!("Query settled as {:?} in {:?}", state.phase, start_time.elapsed());
    print_state(&state);

    Ok(())
}

/// Handle usage command
pub async fn handle_usage(overrides: &ConfigOverrides) -> anyhow::Result<()> {
    let config = overrides.load()?;
    let coordinator = QueryCoordinator::from_config(config)?;

    println!("{}", coordinator.usage_summary().await);

    Ok(())
}

/// Handle serve command
pub async fn handle_serve(host: String, port: u16, overrides: &ConfigOverrides) -> anyhow::Result<()> {
    use crate::server::api::run_server;
    use tracing::info;

    let config = overrides.load()?;

    let warm = TranslationClient::new(config.clone())?;
    tokio::spawn(async move { warm.warm_up().await });

    let coordinator = QueryCoordinator::from_config(config)?;

    info!("Starting HTTP bridge on {}:{}", host, port);
    println!("🚀 Bridge listening on http://{}:{}", host, port);
    println!("   POST /v1/query   {{\"query\": \"zh:en 你好\"}}");
    println!("   GET  /v1/query/{{id}}");

    run_server(host, port, coordinator).await?;

    Ok(())
}

/// Print result items the way a launcher list would show them
fn print_state(state: &QueryState) {
    for item in &state.items {
        println!("{}", format_item(item));
    }
}

fn format_item(item: &ResultItem) -> String {
    let mut out = format!("• {}", item.title.plain);
    if let Some(description) = &item.description {
        out.push_str(&format!("\n  {}", description.plain));
    }
    if let ItemAction::CopyToClipboard(_) = item.action {
        out.push_str("\n  [enter: copy]");
    }
    out
}
