pub mod connection;
pub mod db_dump;
pub mod paths;
pub mod retention;
pub mod s3_upload;

#[cfg(test)]
pub(crate) mod test_support;

use std::fs;
use tracing::info;

use crate::config::BackupConfig;
use crate::errors::{BackupError, Result};
use db_dump::{ProcessRunner, TokioProcessRunner};
use s3_upload::{ObjectStore, S3ObjectStore};

/// Runs one full cycle against the real collaborators: `mongodump` on this
/// machine and the configured S3 endpoint.
///
/// The configuration is validated before any client is built, so an invalid
/// configuration never reaches the network.
pub async fn backup_and_upload(config: &BackupConfig) -> Result<()> {
    config.validate()?;
    let storage = config
        .storage
        .as_ref()
        .ok_or_else(|| BackupError::InvalidConfiguration("storage section is missing".to_string()))?;
    let store = S3ObjectStore::connect(storage).await;
    run_backup_flow(config, &TokioProcessRunner, &store).await
}

/// validate -> resolve -> plan paths -> dump -> upload -> reconcile.
///
/// The first failing stage ends the run and its error is returned as-is.
/// Reconciliation only happens after a successful upload, so a failed run
/// leaves whatever the dump produced on disk.
///
/// Nothing here locks the staging directory: run at most one instance per
/// staging directory at a time.
pub async fn run_backup_flow(
    config: &BackupConfig,
    runner: &dyn ProcessRunner,
    store: &dyn ObjectStore,
) -> Result<()> {
    config.validate()?;
    let (database, storage) = match (&config.database, &config.storage) {
        (Some(database), Some(storage)) => (database, storage),
        _ => {
            return Err(BackupError::InvalidConfiguration(
                "database and storage sections are required".to_string(),
            ));
        }
    };

    let connection = connection::resolve(database)?;
    info!("🚀 Starting backup of database {}", connection.database);

    let staging_dir = paths::staging_directory(config)?;
    if config.keep_local_backups {
        fs::create_dir_all(&staging_dir)?;
    }
    let file_name = paths::file_name(&connection.database, config.timezone_offset)?;
    let artifact_path = staging_dir.join(&file_name);
    info!("📂 Staging artifact at {}", artifact_path.display());

    let program = db_dump::find_dump_executable(config.dump_binary.as_deref());
    db_dump::dump(runner, &program, &connection, &artifact_path).await?;

    s3_upload::upload(store, &artifact_path, &file_name, storage).await?;

    retention::reconcile(config, &artifact_path, &staging_dir)?;

    info!("🎉 Backup of {} completed", connection.database);
    Ok(())
}
