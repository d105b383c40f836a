//! aipro-news - daily financial news enrichment.
//!
//! Fetches the previous days' news, tags each article with its main stock
//! and summarizes it with an LLM, then writes one CSV per run.

mod args;
mod logging;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};

use aipro_news_core::{
    create_llm_client, load_config, metrics, validate_config, CsvRowWriter, DailyPipeline,
    DateWindow, EngineConfig, EnricherSettings, EnrichmentEngine, LlmEnricher, PromptSet,
    RunManifest, SqliteNewsSource,
};

use args::Cli;

/// Exit code for a run cut short by Ctrl-C.
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = tokio::select! {
        result = run(cli) => match result {
            Ok(()) => 0,
            Err(e) => {
                error!("Fatal error: {:#}", e);
                eprintln!("aipro-news: {:#}", e);
                1
            }
        },
        _ = shutdown_signal() => {
            warn!("Interrupted, no output written by this run");
            EXIT_INTERRUPTED
        }
    };

    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<()> {
    // Credentials first so config and client can see them
    let env_loaded = dotenvy::from_path(&cli.env_file);

    let mut config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    cli.apply_overrides(&mut config);
    validate_config(&config).context("Configuration validation failed")?;

    let today = Local::now().date_naive();
    let log_path = logging::init_logging(&config.logging, today)?;
    info!(version = env!("CARGO_PKG_VERSION"), log = %log_path.display(), "Starting aipro-news");
    if let Err(e) = env_loaded {
        warn!(path = %cli.env_file.display(), error = %e, "Could not load env file");
    }

    let window = DateWindow::resolve(today, config.window.days_back)
        .context("Failed to resolve date window")?;
    info!(window = %window, "Resolved date window");

    let api_key = std::env::var(&config.llm.api_key_env)
        .ok()
        .filter(|key| !key.trim().is_empty());
    let client = create_llm_client(&config.llm, api_key)
        .context("Failed to create LLM client")?;
    info!(provider = client.provider(), model = client.model(), "LLM client ready");

    let manifest = RunManifest::new(&config, &window, client.provider());
    let manifest_path = manifest
        .write_to(&config.logging.dir)
        .context("Failed to write run parameters")?;
    info!(run_id = %manifest.run_id, path = %manifest_path.display(), "Recorded run parameters");

    let prompts = match &config.enrichment.prompts_dir {
        Some(dir) => PromptSet::from_dir(dir).context("Failed to load prompt templates")?,
        None => PromptSet::default(),
    };
    let enricher = LlmEnricher::new(client)
        .with_prompts(prompts)
        .with_settings(EnricherSettings::from_config(&config.llm, &config.enrichment));
    let engine = EnrichmentEngine::new(
        Arc::new(enricher),
        EngineConfig::from_config(&config.enrichment),
    );

    let source = SqliteNewsSource::open(&config.database.path, config.database.query.clone())
        .with_context(|| format!("Failed to open news database {:?}", config.database.path))?;
    let sink = CsvRowWriter::new(&config.output.dir, config.output.file_prefix.clone())
        .with_utf8_bom(config.output.utf8_bom);

    let pipeline = DailyPipeline::new(Arc::new(source), engine, Arc::new(sink));
    let report = pipeline.run(&window).await.context("Daily run failed")?;

    match &report.output_path {
        Some(path) => info!(path = %path.display(), rows = report.written, "Output ready"),
        None => info!("No output file for this window"),
    }

    if let Some(path) = &config.metrics.textfile {
        if let Err(e) = write_metrics(path) {
            warn!(path = %path.display(), error = %e, "Failed to write metrics textfile");
        }
    }

    Ok(())
}

fn write_metrics(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, metrics::encode_metrics())?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_metrics_creates_parent_dirs() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("textfile/collector/aipro_news.prom");

        write_metrics(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("aipro_news_retried_rows_total"));
    }

    #[test]
    fn test_write_metrics_fails_when_parent_is_a_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let blocker = temp_dir.path().join("metrics");
        std::fs::write(&blocker, "").unwrap();

        assert!(write_metrics(&blocker.join("aipro_news.prom")).is_err());
    }
}
