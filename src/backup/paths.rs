// mongo-s3-backup/src/backup/paths.rs
use chrono::{DateTime, FixedOffset, Utc};
use std::env;
use std::path::PathBuf;

use crate::config::BackupConfig;
use crate::errors::{BackupError, Result};

/// Folder created under the base directory when local backups are kept.
pub const BACKUP_FOLDER: &str = "backups";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

/// Turns the configured offset into a chrono offset. Values with a
/// magnitude below 16 are hours, anything else is minutes.
pub fn resolve_offset(offset: i32) -> Option<FixedOffset> {
    let seconds = if offset.unsigned_abs() < 16 {
        offset.checked_mul(3600)?
    } else {
        offset.checked_mul(60)?
    };
    FixedOffset::east_opt(seconds)
}

/// Where the dump is written: `<base>/backups` when backups are kept,
/// the OS temp directory otherwise.
pub fn staging_directory(config: &BackupConfig) -> Result<PathBuf> {
    if !config.keep_local_backups {
        return Ok(env::temp_dir());
    }
    let base = match &config.base_dir {
        Some(dir) => dir.clone(),
        None => env::current_dir()?,
    };
    Ok(base.join(BACKUP_FOLDER))
}

pub fn file_name(database: &str, timezone_offset: i32) -> Result<String> {
    file_name_at(database, timezone_offset, Utc::now())
}

/// `<database>_<YYYY-MM-DDTHH-mm-ss>.gz`, with no colons so the name is
/// safe on every filesystem.
pub fn file_name_at(database: &str, timezone_offset: i32, now: DateTime<Utc>) -> Result<String> {
    let offset = resolve_offset(timezone_offset).ok_or_else(|| {
        BackupError::InvalidConfiguration(format!(
            "timezoneOffset {} is outside of +/-24h",
            timezone_offset
        ))
    })?;
    let local = now.with_timezone(&offset);
    Ok(format!("{}_{}.gz", database, local.format(TIMESTAMP_FORMAT)))
}
