// mongo-s3-backup/src/config/mod.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::backup::paths::resolve_offset;
use crate::errors::BackupError;

/// Configuration for a single backup-and-upload cycle, as read from config.json.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupConfig {
    #[serde(default)]
    pub keep_local_backups: bool,
    pub max_local_backups: Option<usize>,
    /// Hours when the magnitude is below 16, minutes otherwise.
    #[serde(default)]
    pub timezone_offset: i32,
    pub database: Option<DatabaseInput>,
    pub storage: Option<StorageConfig>,
    /// Root of the `backups/` folder. Falls back to the working directory.
    pub base_dir: Option<PathBuf>,
    /// Dump executable name or path. Falls back to `mongodump` on PATH.
    pub dump_binary: Option<String>,
}

/// The two accepted shapes for the `database` entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DatabaseInput {
    Uri(String),
    Spec(ConnectionSpec),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSpec {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssl: Option<bool>,
    pub authentication_database: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub bucket_name: String,
    pub acl: Option<String>,
    /// Custom endpoint for S3-compatible services (Spaces, MinIO).
    pub endpoint_url: Option<String>,
    pub folder_prefix: Option<String>,
}

impl BackupConfig {
    pub fn load_from_json(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
        let config: BackupConfig = serde_json::from_str(&config_content).with_context(|| {
            format!(
                "Failed to parse JSON from config file at {}",
                config_path.display()
            )
        })?;
        Ok(config)
    }

    /// Structural check only. Reachability, credentials and URI syntax are
    /// left to the dump and upload stages.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn validate(&self) -> std::result::Result<(), BackupError> {
        let storage = self
            .storage
            .as_ref()
            .ok_or_else(|| invalid("storage section is missing"))?;

        for (field, value) in [
            ("accessKey", &storage.access_key),
            ("secretKey", &storage.secret_key),
            ("region", &storage.region),
            ("bucketName", &storage.bucket_name),
        ] {
            if value.is_empty() {
                return Err(invalid(&format!("storage.{} must not be empty", field)));
            }
        }

        match self.database.as_ref() {
            None => return Err(invalid("database section is missing")),
            Some(DatabaseInput::Uri(uri)) if uri.is_empty() => {
                return Err(invalid("database connection string must not be empty"));
            }
            Some(DatabaseInput::Uri(_)) => {}
            Some(DatabaseInput::Spec(spec)) => {
                if spec.host.as_deref().map_or(true, str::is_empty) {
                    return Err(invalid("database.host must not be empty"));
                }
                if spec.database.as_deref().map_or(true, str::is_empty) {
                    return Err(invalid("database.database must not be empty"));
                }
                // Port 0 is not a usable TCP port.
                if spec.port.map_or(true, |port| port == 0) {
                    return Err(invalid("database.port must be a positive integer"));
                }
            }
        }

        if resolve_offset(self.timezone_offset).is_none() {
            return Err(invalid(&format!(
                "timezoneOffset {} is outside of +/-24h",
                self.timezone_offset
            )));
        }

        Ok(())
    }
}

fn invalid(reason: &str) -> BackupError {
    BackupError::InvalidConfiguration(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_config() -> BackupConfig {
        serde_json::from_value(json!({
            "database": "mongodb://localhost:27017/sales",
            "storage": {
                "accessKey": "a",
                "secretKey": "b",
                "region": "us-east-1",
                "bucketName": "backups"
            },
            "keepLocalBackups": false,
            "timezoneOffset": 0
        }))
        .unwrap()
    }

    #[test]
    fn test_uri_config_is_valid() {
        let config = valid_config();
        assert!(config.is_valid());
        assert_eq!(
            config.database,
            Some(DatabaseInput::Uri("mongodb://localhost:27017/sales".to_string()))
        );
    }

    #[test]
    fn test_structured_database_deserializes_as_spec() -> anyhow::Result<()> {
        let config: BackupConfig = serde_json::from_value(json!({
            "database": {
                "host": "db.internal",
                "port": 27018,
                "database": "sales",
                "username": "backup",
                "authenticationDatabase": "admin"
            },
            "storage": { "accessKey": "a", "secretKey": "b", "region": "eu-west-1", "bucketName": "x" },
            "keepLocalBackups": true,
            "maxLocalBackups": 3
        }))?;

        match &config.database {
            Some(DatabaseInput::Spec(spec)) => {
                assert_eq!(spec.host.as_deref(), Some("db.internal"));
                assert_eq!(spec.port, Some(27018));
                assert_eq!(spec.password, None);
                assert_eq!(spec.authentication_database.as_deref(), Some("admin"));
            }
            other => panic!("expected structured database, got {:?}", other),
        }
        assert_eq!(config.max_local_backups, Some(3));
        assert_eq!(config.timezone_offset, 0);
        assert!(config.is_valid());
        Ok(())
    }

    #[test]
    fn test_each_missing_storage_field_is_rejected() {
        let clear: [fn(&mut StorageConfig); 4] = [
            |s| s.access_key.clear(),
            |s| s.secret_key.clear(),
            |s| s.region.clear(),
            |s| s.bucket_name.clear(),
        ];
        for clear_field in clear {
            let mut config = valid_config();
            clear_field(config.storage.as_mut().unwrap());
            assert!(!config.is_valid());
            assert!(matches!(
                config.validate(),
                Err(BackupError::InvalidConfiguration(_))
            ));
        }

        let mut config = valid_config();
        config.storage = None;
        assert!(!config.is_valid());
    }

    #[test]
    fn test_missing_or_empty_database_is_rejected() {
        let mut config = valid_config();
        config.database = None;
        assert!(!config.is_valid());

        config.database = Some(DatabaseInput::Uri(String::new()));
        assert!(!config.is_valid());
    }

    #[test]
    fn test_structured_database_requires_host_name_and_port() {
        let complete = ConnectionSpec {
            host: Some("localhost".to_string()),
            port: Some(27017),
            database: Some("sales".to_string()),
            ..Default::default()
        };

        let mut config = valid_config();
        config.database = Some(DatabaseInput::Spec(complete.clone()));
        assert!(config.is_valid());

        let broken = [
            ConnectionSpec { host: None, ..complete.clone() },
            ConnectionSpec { host: Some(String::new()), ..complete.clone() },
            ConnectionSpec { database: Some(String::new()), ..complete.clone() },
            ConnectionSpec { port: None, ..complete.clone() },
            ConnectionSpec { port: Some(0), ..complete.clone() },
        ];
        for spec in broken {
            config.database = Some(DatabaseInput::Spec(spec));
            assert!(!config.is_valid());
        }
    }

    #[test]
    fn test_out_of_range_timezone_offset_is_rejected() {
        let mut config = valid_config();
        config.timezone_offset = 1440;
        assert!(!config.is_valid());

        config.timezone_offset = -300;
        assert!(config.is_valid());
    }

    #[test]
    fn test_load_from_json_reads_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "database": "mongodb://localhost/app",
                "storage": { "accessKey": "a", "secretKey": "b", "region": "r", "bucketName": "b", "acl": "public-read" },
                "baseDir": "/var/lib/mongo-backup"
            }"#,
        )?;

        let config = BackupConfig::load_from_json(&path)?;
        assert_eq!(config.base_dir, Some(PathBuf::from("/var/lib/mongo-backup")));
        assert_eq!(config.storage.unwrap().acl.as_deref(), Some("public-read"));
        assert!(!config.keep_local_backups);
        Ok(())
    }

    #[test]
    fn test_load_from_json_reports_missing_file() {
        let result = BackupConfig::load_from_json(Path::new("/nonexistent/config.json"));
        assert!(result.is_err());
    }
}
