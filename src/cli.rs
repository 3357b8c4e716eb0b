//! CLI argument parsing for NutriSense

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::config::Config;
use crate::domain::{HistoryRecord, Measurement, Sex};

#[derive(Parser, Debug)]
#[command(name = "nutrisense")]
#[command(version)]
#[command(about = "Child growth evaluation against WHO reference tables", long_about = None)]
pub struct Cli {
    /// SQLite history ledger (overrides NUTRISENSE_DB_PATH)
    #[arg(long = "db", value_name = "PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Directory containing forest.json (overrides NUTRISENSE_MODEL_DIR)
    #[arg(long = "model-dir", value_name = "DIR", global = true)]
    pub model_dir: Option<PathBuf>,

    /// Height-for-age reference JSON (overrides NUTRISENSE_REFERENCE_FILE)
    #[arg(long = "reference", value_name = "PATH", global = true)]
    pub reference_file: Option<PathBuf>,

    /// Skip the predictive classifier
    #[arg(long = "no-model", global = true)]
    pub no_model: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate a measurement and record it in the child's history
    Evaluate(MeasurementArgs),

    /// Print a child's recorded history, ordered by age
    History {
        /// Child name (case and surrounding spaces are ignored)
        #[arg(short, long)]
        name: String,
    },

    /// Print height-for-age trend chart input for a measurement
    Trend(MeasurementArgs),
}

#[derive(Args, Debug, Clone)]
pub struct MeasurementArgs {
    /// Child name (case and surrounding spaces are ignored)
    #[arg(short, long)]
    pub name: String,

    /// Age in months (0-60)
    #[arg(short, long, value_name = "MONTHS")]
    pub age: u32,

    /// Sex: M/F (also male, female, laki-laki, perempuan)
    #[arg(short, long)]
    pub sex: Sex,

    /// Height or length in cm
    #[arg(long = "height", value_name = "CM")]
    pub height_cm: f64,

    /// Weight in kg
    #[arg(long = "weight", value_name = "KG")]
    pub weight_kg: f64,
}

impl MeasurementArgs {
    #[must_use]
    pub fn to_measurement(&self) -> Measurement {
        Measurement::new(&self.name, self.age, self.sex, self.height_cm, self.weight_kg)
    }
}

/// History row as printed by `history`, with its guidance text.
#[derive(Debug, Serialize)]
pub struct HistoryEntry<'a> {
    #[serde(flatten)]
    pub record: &'a HistoryRecord,
    pub status_text: &'static str,
}

impl<'a> From<&'a HistoryRecord> for HistoryEntry<'a> {
    fn from(record: &'a HistoryRecord) -> Self {
        Self {
            record,
            status_text: record.status_text(),
        }
    }
}

impl Cli {
    /// Apply command-line overrides on top of environment configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(path) = &self.db_path {
            config.db_path.clone_from(path);
        }
        if let Some(dir) = &self.model_dir {
            config.model_dir.clone_from(dir);
        }
        if let Some(path) = &self.reference_file {
            config.reference_file = Some(path.clone());
        }
    }
}
