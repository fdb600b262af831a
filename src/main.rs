//! MongoDB Backup Tool
//!
//! Runs one backup-and-upload cycle from a JSON configuration file.

// mongo-s3-backup/src/main.rs
use anyhow::{Context, Result};
use mongo_s3_backup::{BackupConfig, backup_and_upload};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config.json";

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run_app().await {
        Ok(_) => {
            info!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    // First argument overrides the config location; otherwise config.json
    // in the working directory.
    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let config = BackupConfig::load_from_json(&config_path).with_context(|| {
        format!(
            "Failed to load backup configuration from {}",
            config_path.display()
        )
    })?;

    backup_and_upload(&config)
        .await
        .context("Backup process failed")?;
    Ok(())
}
