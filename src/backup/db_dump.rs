// mongo-s3-backup/src/backup/db_dump.rs
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use tokio::process::Command;
use tracing::{info, warn};
use which::which;

use super::connection::CanonicalConnection;
use crate::errors::{BackupError, Result};

pub const DUMP_EXECUTABLE: &str = "mongodump";

/// A fully built dump invocation: the program plus its argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl DumpCommand {
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

/// Renders the command line with the password masked, for logging.
impl fmt::Display for DumpCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        let mut mask_next = false;
        for arg in &self.args {
            if mask_next {
                write!(f, " ****")?;
            } else {
                write!(f, " {}", arg)?;
            }
            mask_next = arg == "-p";
        }
        Ok(())
    }
}

/// Runs a dump command to completion. Substituted with a fake in tests.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, command: &DumpCommand) -> Result<()>;
}

/// Spawns the command with tokio and waits for it. No timeout is applied.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, command: &DumpCommand) -> Result<()> {
        let output = Command::new(&command.program)
            .args(&command.args)
            .output()
            .await
            .map_err(|e| {
                BackupError::DumpFailure(format!("Failed to execute {}: {}", command.program, e))
            })?;

        if !output.status.success() {
            return Err(BackupError::DumpFailure(format!(
                "{} failed with status: {}\nStderr: {}",
                command.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// Resolves the dump executable through PATH. When lookup fails the bare
/// name is kept and the spawn itself reports the problem.
pub fn find_dump_executable(configured: Option<&str>) -> String {
    let name = configured.unwrap_or(DUMP_EXECUTABLE);
    match which(name) {
        Ok(path) => path.display().to_string(),
        Err(e) => {
            warn!("{} not found in PATH ({}), invoking it by name", name, e);
            name.to_string()
        }
    }
}

pub fn build_dump_command(
    program: &str,
    connection: &CanonicalConnection,
    archive_path: &Path,
) -> Result<DumpCommand> {
    let (host, port) = connection
        .primary_host()
        .ok_or_else(|| BackupError::DumpFailure("connection has no host".to_string()))?;

    let mut args = vec![
        "-h".to_string(),
        host.to_string(),
        format!("--port={}", port),
        "-d".to_string(),
        connection.database.clone(),
    ];

    match (&connection.username, &connection.password) {
        (Some(username), Some(password)) => {
            args.extend(["-p".to_string(), password.clone()]);
            args.extend(["-u".to_string(), username.clone()]);
        }
        // Without a password only the user is passed, so the tool can prompt.
        (Some(username), None) => {
            args.extend(["-u".to_string(), username.clone()]);
        }
        _ => {}
    }

    args.extend([
        "--quiet".to_string(),
        "--gzip".to_string(),
        format!("--archive={}", archive_path.display()),
    ]);

    if connection.ssl == Some(true) {
        args.push("--ssl".to_string());
    }
    if let Some(auth_db) = &connection.authentication_database {
        args.push(format!("--authenticationDatabase={}", auth_db));
    }

    Ok(DumpCommand {
        program: program.to_string(),
        args,
    })
}

/// Dumps the connection's database into a gzip archive at `archive_path`.
pub async fn dump(
    runner: &dyn ProcessRunner,
    program: &str,
    connection: &CanonicalConnection,
    archive_path: &Path,
) -> Result<()> {
    let command = build_dump_command(program, connection, archive_path)?;
    info!("Dumping database {}: {}", connection.database, command);
    runner.run(&command).await?;
    info!("✓ Dump of {} written to {}", connection.database, archive_path.display());
    Ok(())
}
