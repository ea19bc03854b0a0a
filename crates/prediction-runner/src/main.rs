use analysis_orchestrator::{CachingProvider, PredictionConfig, PredictionEngine};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::PathBuf;

mod provider;

use provider::{SnapshotFile, SnapshotFileProvider};

fn usage() {
    eprintln!("Usage:");
    eprintln!("  prediction-runner <snapshot.json>                  Predict for the ticker in the file");
    eprintln!("  prediction-runner <snapshot.json> --as-of <RFC3339> Override the prediction instant");
    eprintln!("  prediction-runner <snapshot.json> --compact         Single-line JSON output");
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    let args: Vec<String> = std::env::args().collect();
    let Some(path) = args.get(1).filter(|a| !a.starts_with("--")).map(PathBuf::from) else {
        usage();
        std::process::exit(2);
    };
    let compact = args.iter().any(|a| a == "--compact");
    let as_of_override: Option<DateTime<Utc>> = args
        .iter()
        .position(|a| a == "--as-of")
        .and_then(|i| args.get(i + 1))
        .map(|v| {
            DateTime::parse_from_rfc3339(v)
                .map(|dt| dt.with_timezone(&Utc))
                .with_context(|| format!("Invalid --as-of value '{}'", v))
        })
        .transpose()?;

    let config = PredictionConfig::from_env().context("Invalid prediction configuration")?;
    tracing::info!("Configuration loaded and validated");
    tracing::info!("  Benchmark: {}", config.benchmark);
    tracing::info!("  News limit: {}", config.news_limit);
    tracing::info!("  Parallel analyzers: {}", config.parallel);

    let snapshot = SnapshotFile::load(&path)?;
    let ticker = snapshot.ticker.clone();
    let as_of = as_of_override.unwrap_or_else(|| snapshot.as_of());
    tracing::info!("Loaded {} bars for {} from {}", snapshot.history.len(), ticker, path.display());

    let provider = CachingProvider::new(SnapshotFileProvider::new(snapshot), config.cache_ttl_secs);
    let engine = PredictionEngine::new(config)?;

    let prediction = engine
        .get_prediction_at(&provider, &ticker, as_of)
        .await
        .with_context(|| format!("Cannot analyze {}", ticker))?;

    let output = if compact {
        serde_json::to_string(&prediction)?
    } else {
        serde_json::to_string_pretty(&prediction)?
    };
    println!("{}", output);
    Ok(())
}
