//! Restaurant-agent entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration** from flags and environment variables.
//! 2. **Wire observability**: `tracing-subscriber` with a pretty or JSON layer
//!    and, when configured, an OpenTelemetry OTLP exporter.
//! 3. **Construct infrastructure**: the oracle client, the AMap client, the
//!    taxonomy and the capability catalog, injected into the `Orchestrator`.
//! 4. **Select the mode**: `serve` runs the HTTP API, `ask` runs one query.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use capabilities::{restaurant_catalog, Taxonomy};
use clap::Parser;
use nodes::{Orchestrator, RunOutcome};
use tracing::{info, warn};

mod config;
mod telemetry;

use config::{Cli, Command, Settings};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let guard = match telemetry::init(cli.settings.log_format, cli.settings.otlp_endpoint.as_deref())
    {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("{err:#}");
            return ExitCode::FAILURE;
        }
    };

    let code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = ?err, "restaurant-agent failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    };

    guard.shutdown();
    code
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let orchestrator = build_orchestrator(&cli.settings)?;

    match cli.command {
        Command::Serve { bind } => {
            server::serve(bind, server::AppState::new(orchestrator))
                .await
                .with_context(|| format!("server on {bind} failed"))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Ask { query } => ask(&orchestrator, &query).await,
    }
}

fn build_orchestrator(settings: &Settings) -> anyhow::Result<Orchestrator> {
    if settings.aliyun_api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
        warn!("ALIYUN_API_KEY is not set; oracle calls will fail");
    }
    if settings.gaode_api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
        warn!("GAODE_API_KEY is not set; food_search will fail and geocoding is skipped");
    }

    let taxonomy = match &settings.taxonomy_path {
        Some(path) => Taxonomy::load(path)
            .with_context(|| format!("loading taxonomy from {}", path.display()))?,
        None => Taxonomy::embedded().context("loading built-in taxonomy")?,
    };
    if taxonomy.is_empty() {
        warn!("restaurant taxonomy has no entries; scenario types will not be resolved");
    } else {
        info!(entries = taxonomy.len(), "restaurant taxonomy loaded");
    }

    let oracle = Arc::new(
        llm::OpenAiCompatibleProvider::new(settings.llm_config()?)
            .context("building oracle client")?,
    );
    let places = Arc::new(
        amap::AmapClient::new(settings.amap_config()).context("building AMap client")?,
    );

    let catalog = restaurant_catalog(
        oracle.clone(),
        places,
        Arc::new(taxonomy),
        settings.location_defaults(),
    );
    info!(capabilities = %catalog.describe().replace('\n', "; "), "capability catalog ready");

    Ok(Orchestrator::new(oracle, catalog))
}

async fn ask(orchestrator: &Orchestrator, query: &str) -> anyhow::Result<ExitCode> {
    let query = query.trim();
    anyhow::ensure!(!query.is_empty(), "query must not be empty");

    match orchestrator.run(query).await? {
        RunOutcome::Completed { payload, .. } => {
            let text = serde_json::to_string_pretty(&payload).context("serialising result")?;
            println!("{text}");
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::Failed {
            error_info,
            replan_count,
            ..
        } => {
            eprintln!(
                "no recommendation after {replan_count} replan(s): {} at step {}: {}",
                error_info.error_type, error_info.step, error_info.message
            );
            Ok(ExitCode::FAILURE)
        }
    }
}
