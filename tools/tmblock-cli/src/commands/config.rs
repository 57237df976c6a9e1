//! Show or write the effective configuration.

use std::path::PathBuf;

use anyhow::Context;
use tmblock_common::config::{config_file_path, AppConfig};

pub fn run(path: Option<PathBuf>, write: bool) -> anyhow::Result<()> {
    let (source, config) = match path {
        Some(path) => {
            let config = if path.exists() {
                AppConfig::load_from(&path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))?
            } else {
                AppConfig::default()
            };
            (path, config)
        }
        None => (config_file_path(), AppConfig::load()),
    };

    tracing::debug!(path = %source.display(), "Effective configuration");
    println!("{}", serde_json::to_string_pretty(&config)?);

    if write {
        config
            .save_to(&source)
            .with_context(|| format!("Failed to write config to {}", source.display()))?;
        eprintln!("Saved configuration to {}", source.display());
    }

    Ok(())
}
