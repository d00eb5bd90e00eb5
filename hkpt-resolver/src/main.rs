//! hkpt-resolver - Hong Kong property name translation service
//!
//! Resolves Chinese property names to English through a layered waterfall
//! (geo dictionary, curated corpus, fuzzy matching, AI oracle) and serves
//! the results over HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hkpt_common::config::{self, TomlConfig};
use hkpt_resolver::db::SqliteLookupStore;
use hkpt_resolver::services::{
    AiFallback, FuzzyMatcher, GrokClient, HttpEmbedder, PropertyTranslator, TranslationOracle,
};
use hkpt_resolver::AppState;

/// Command-line arguments for hkpt-resolver
#[derive(Parser, Debug)]
#[command(name = "hkpt-resolver")]
#[command(about = "Hong Kong property name translation service")]
#[command(version)]
struct Args {
    /// Host to bind (defaults to the config file value)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (defaults to the config file value, 8080)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the SQLite database file
    #[arg(short, long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = config::resolve_config_path(args.config.as_deref());
    let toml_config = match &config_path {
        Some(path) => config::load_toml_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TomlConfig::default(),
    };

    // Initialize tracing (RUST_LOG overrides the configured level)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting hkpt-resolver v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Config: {}", path.display()),
        None => info!("No config file found, using defaults"),
    }

    let db_path = config::resolve_database_path(args.database.as_deref(), &toml_config);
    info!("Database: {}", db_path.display());
    let db_pool = hkpt_resolver::db::init_database_pool(&db_path)
        .await
        .context("Failed to initialize database")?;

    let api_key = hkpt_resolver::config::resolve_oracle_api_key(&db_pool, &toml_config)
        .await
        .context("Failed to resolve oracle API key")?;

    let oracle: Arc<dyn TranslationOracle> = Arc::new(
        GrokClient::new(api_key, &toml_config.oracle).context("Failed to build oracle client")?,
    );
    info!(
        oracle = oracle.name(),
        model = %toml_config.oracle.model,
        live_search = oracle.supports_live_search(),
        "Oracle client ready"
    );

    let store = Arc::new(SqliteLookupStore::new(db_pool));
    let ai = AiFallback::from_config(oracle, &toml_config.oracle);
    let mut translator = PropertyTranslator::new(store, ai);

    let fuzzy = &toml_config.fuzzy;
    if fuzzy.enabled {
        let matcher = match &fuzzy.embedding {
            Some(embedding) => {
                let embedder = HttpEmbedder::new(
                    embedding.base_url.clone(),
                    embedding.model.clone(),
                    embedding.api_key.clone(),
                )
                .context("Failed to build embedding client")?;
                info!(model = %embedding.model, "Semantic similarity via embeddings");
                FuzzyMatcher::hybrid(Arc::new(embedder), fuzzy.threshold)
            }
            None => FuzzyMatcher::character(fuzzy.threshold),
        };
        info!(
            method = matcher.method(),
            threshold = matcher.threshold(),
            "Fuzzy matching enabled"
        );
        translator = translator.with_fuzzy_matcher(matcher);
    } else if fuzzy.embedding.is_some() {
        warn!("fuzzy.embedding is configured but fuzzy matching is disabled");
    }

    let state = AppState::new(Arc::new(translator));
    let app = hkpt_resolver::build_router(state);

    let host = args.host.unwrap_or_else(|| toml_config.host.clone());
    let port = args.port.unwrap_or(toml_config.port);
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
