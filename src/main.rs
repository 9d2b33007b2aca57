//! Webhook relay entry point.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

use db_relay::cli::Cli;
use db_relay::config::Config;
use db_relay::db::{self, DatabaseClient};
use db_relay::error::{RelayError, Result};
use db_relay::llm;
use db_relay::logging;
use db_relay::pipeline::Pipeline;
use db_relay::server::{self, AppState};
use db_relay::verify::{AllowAllVerifier, KeyRingVerifier, RequestVerifier};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init_stderr_logging();

    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    config.apply_env_overrides();
    cli.apply_to(&mut config);

    let database: Arc<dyn DatabaseClient> = Arc::from(db::connect(&config.database).await?);
    info!(
        "Database ready ({})",
        config
            .database
            .path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "in-memory".to_string())
    );

    if let Some(seed_path) = &cli.seed {
        seed_database(database.as_ref(), seed_path).await?;
    }

    let llm_client = llm::build_client(&config.llm)?;
    info!(
        "LLM provider: {} (model {})",
        config.llm.provider, config.llm.model
    );

    let verifier: Arc<dyn RequestVerifier> = if config.signing.allow_unsigned {
        info!("Signature verification disabled (allow_unsigned)");
        Arc::new(AllowAllVerifier)
    } else {
        Arc::new(KeyRingVerifier::from_config(&config.signing)?)
    };

    let state = AppState {
        pipeline: Arc::new(Pipeline::new(database, llm_client)),
        verifier,
    };

    server::serve(&config.server.listen, state).await
}

/// Executes the statements in a seed file against the fresh database.
async fn seed_database(db: &dyn DatabaseClient, path: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        RelayError::config(format!("Cannot read seed file {}: {e}", path.display()))
    })?;

    let mut executed = 0usize;
    for statement in contents.split(';') {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        db.execute_query(statement).await?;
        executed += 1;
    }

    info!("Seeded database with {executed} statements from {}", path.display());
    Ok(())
}
