// mongo-s3-backup/src/backup/retention.rs
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::BackupConfig;
use crate::errors::Result;

/// Post-upload cleanup. Ephemeral runs drop the artifact; retained runs
/// trim the staging directory to `maxLocalBackups` when it is set.
pub fn reconcile(config: &BackupConfig, artifact_path: &Path, staging_dir: &Path) -> Result<()> {
    if !config.keep_local_backups {
        fs::remove_file(artifact_path)?;
        info!("Removed local artifact {}", artifact_path.display());
        return Ok(());
    }

    match config.max_local_backups {
        Some(keep) => {
            let removed = trim_backups(staging_dir, keep)?;
            info!(
                "Kept the {} most recent backups in {}, removed {}",
                keep,
                staging_dir.display(),
                removed.len()
            );
        }
        None => debug!("maxLocalBackups not set, keeping every backup in {}", staging_dir.display()),
    }
    Ok(())
}

/// Deletes all but the `keep` most recently modified plain files in `dir`.
/// Returns the deleted paths.
pub fn trim_backups(dir: &Path, keep: usize) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        files.push((metadata.modified()?, entry.path()));
    }

    // Newest first; equal timestamps fall back to name order, and generated
    // names sort by timestamp.
    files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));

    let mut removed = Vec::new();
    for (_, path) in files.into_iter().skip(keep) {
        fs::remove_file(&path)?;
        debug!("Removed old backup {}", path.display());
        removed.push(path);
    }
    Ok(removed)
}
