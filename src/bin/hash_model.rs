//! Integrity manifest writer for NutriSense model artifacts.
//!
//! Validates `forest.json` in a model directory and writes `manifest.json`
//! binding it by SHA-256, so the engine refuses a modified artifact.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin hash_model -- <model_dir>
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use nutrisense::adapters::forest::{
    sha256_hex, ForestModel, ModelManifest, MANIFEST_FILE, MODEL_FILE,
};

#[derive(Parser, Debug)]
#[command(name = "hash_model")]
#[command(about = "Write manifest.json for an exported forest", long_about = None)]
struct Args {
    /// Model directory (or the forest.json file itself)
    model_dir: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let model_dir = if args.model_dir.is_file() {
        args.model_dir
            .parent()
            .context("Model path has no parent directory")?
            .to_path_buf()
    } else {
        args.model_dir
    };

    let model_path = model_dir.join(MODEL_FILE);
    if !model_path.exists() {
        bail!("No {MODEL_FILE} found in {}", model_dir.display());
    }

    let bytes = fs::read(&model_path)
        .with_context(|| format!("Failed to read {}", model_path.display()))?;

    // Refuse to bless an artifact the engine would reject anyway.
    let model = ForestModel::from_json_slice(&bytes).context("Model artifact is invalid")?;

    let mut files = BTreeMap::new();
    files.insert(MODEL_FILE.to_string(), sha256_hex(&bytes));

    let manifest = ModelManifest {
        version: 1,
        created_at: chrono::Utc::now().timestamp(),
        files,
    };

    let manifest_path = model_dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?)
        .with_context(|| format!("Failed to write {}", manifest_path.display()))?;

    println!(
        "Wrote {} ({} labels: {:?})",
        manifest_path.display(),
        model.labels().len(),
        model.labels()
    );
    Ok(())
}
