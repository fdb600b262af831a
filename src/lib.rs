//! MongoDB backup to S3.
//!
//! Dumps a database with `mongodump`, uploads the archive to an
//! S3-compatible bucket and keeps a bounded local history.

pub mod backup;
pub mod config;
pub mod errors;

pub use backup::{backup_and_upload, run_backup_flow};
pub use config::BackupConfig;
pub use errors::{BackupError, Result};
