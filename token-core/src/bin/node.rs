//! Token node binary
//!
//! Hosts one token deployment behind the single-writer actor. Usage:
//!
//! ```text
//! token-node [config.toml]
//! ```
//!
//! Without a config file, settings come from `TOKEN_*` environment variables.

use anyhow::Context;
use token_core::{
    config::StorageBackend, spawn_token_actor, CallContext, Config, MemoryStore, Metrics,
    RocksStore, StateStore, Token, TokenInit,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting token node");

    // Load configuration
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path).with_context(|| format!("loading {}", path))?,
        None => Config::from_env().context("loading config from environment")?,
    };
    let rendered = serde_json::to_string(&config)?;
    tracing::debug!(config = %rendered, "Configuration loaded");

    match config.storage.backend {
        StorageBackend::Memory => run(MemoryStore::new(), &config).await,
        StorageBackend::RocksDb => {
            let store = RocksStore::open(&config.storage).context("opening RocksDB store")?;
            run(store, &config).await
        }
    }
}

async fn run<S>(store: S, config: &Config) -> anyhow::Result<()>
where
    S: StateStore + Send + 'static,
{
    let token = if store.contract_info()?.is_some() {
        tracing::info!("Loading existing deployment");
        Token::load(store)?
    } else {
        let init = TokenInit::new(config.token.initial_supply, config.token.features())
            .with_name(config.token.name.as_bytes())
            .with_symbol(config.token.symbol.as_bytes())
            .with_decimals(config.token.decimals);
        Token::deploy(store, &CallContext::now(config.token.deployer()), init)?
    };

    let metrics = Metrics::new()?;
    let token = token.with_metrics(metrics);

    let total_supply = token.total_supply()?;
    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        owner = %token.owner(),
        decimals = token.token_decimals(),
        total_supply,
        "Token ready"
    );

    let (handle, join) = spawn_token_actor(token, config.actor.mailbox_capacity);

    // Hold the deployment until interrupted
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down token node");
    handle.shutdown().await?;
    let token = join.await?;

    let total_supply = token.total_supply()?;
    let conserved = token.check_supply_conservation()?;
    let events = token.events()?.len();
    tracing::info!(total_supply, conserved, events, "Token node stopped");
    Ok(())
}
