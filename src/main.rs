//! NutriSense: child growth evaluation.
//!
//! Main entry point for the command-line application.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use nutrisense::adapters::forest::ForestModel;
use nutrisense::adapters::reference::load_reference_table;
use nutrisense::adapters::sanitize::SanitizingMakeWriter;
use nutrisense::adapters::sqlite::SqliteHistoryStore;
use nutrisense::cli::{Cli, Command, HistoryEntry};
use nutrisense::config::Config;
use nutrisense::domain::who;
use nutrisense::ports::ModelError;
use nutrisense::{GrowthMetric, GrowthService, NutrisenseError, ReferenceTable};

type Service = GrowthService<SqliteHistoryStore, ForestModel>;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs never go to stdout: it carries the JSON output.
    // - NUTRISENSE_LOG_MODE=file: append to NUTRISENSE_LOG_FILE
    // - otherwise: stderr
    let log_mode = std::env::var("NUTRISENSE_LOG_MODE").unwrap_or_else(|_| "stderr".to_string());

    let (writer, _guard) = if log_mode == "file" {
        let log_file = std::env::var("NUTRISENSE_LOG_FILE")
            .unwrap_or_else(|_| "data/nutrisense.log".to_string());

        if let Some(parent) = std::path::Path::new(&log_file).parent() {
            // Best-effort: don't fail startup just because the directory is missing.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stderr())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    let mut config = Config::from_env_or_default();
    cli.apply_overrides(&mut config);

    let service = build_service(&config, cli.no_model)?;

    match cli.command {
        Command::Evaluate(args) => match service.evaluate(args.to_measurement()) {
            Ok(evaluation) => print_json(&evaluation)?,
            Err(NutrisenseError::Persistence { evaluation, source }) => {
                // The result is still valid; show it, then report the failure.
                print_json(&evaluation)?;
                return Err(anyhow::Error::new(source).context("Evaluation was not recorded"));
            }
            Err(e) => return Err(e.into()),
        },
        Command::History { name } => {
            let records = service.history(&name)?;
            let entries: Vec<HistoryEntry<'_>> = records.iter().map(HistoryEntry::from).collect();
            print_json(&entries)?;
        }
        Command::Trend(args) => print_json(&service.trend(&args.to_measurement())?)?,
    }

    Ok(())
}

fn build_service(config: &Config, no_model: bool) -> Result<Service> {
    let height = match &config.reference_file {
        Some(path) => load_reference_table(path)
            .with_context(|| format!("Failed to load reference table {}", path.display()))?,
        None => who::builtin_table(GrowthMetric::HeightForAge)?,
    };
    let weight: ReferenceTable = who::builtin_table(GrowthMetric::WeightForAge)?;

    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let store = SqliteHistoryStore::open(&config.db_path, config.busy_timeout)
        .with_context(|| format!("Failed to open ledger {}", config.db_path.display()))?;

    let mut service = GrowthService::new(Arc::new(store), Arc::new(height))
        .with_weight_reference(Arc::new(weight));

    if !no_model {
        match ForestModel::load(&config.model_dir) {
            Ok(model) => service = service.with_predictor(Arc::new(model)),
            Err(ModelError::NotFound(path)) => {
                tracing::warn!("No model at {}; predictions disabled", path);
            }
            Err(e) => return Err(e).context("Failed to load predictive model"),
        }
    }

    Ok(service)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
