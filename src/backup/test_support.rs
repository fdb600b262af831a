// In-memory stand-ins for the dump process and the object store.
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use std::fs;
use std::sync::Mutex;

use super::db_dump::{DumpCommand, ProcessRunner};
use super::s3_upload::ObjectStore;
use crate::errors::{BackupError, Result};

/// Records every command and writes a small file at the `--archive=` path,
/// the way mongodump would. A failing runner still leaves a partial file.
#[derive(Default)]
pub struct FakeRunner {
    pub commands: Mutex<Vec<DumpCommand>>,
    fail_with: Option<String>,
}

impl FakeRunner {
    pub fn failing(message: &str) -> Self {
        FakeRunner {
            fail_with: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.commands.lock().unwrap().len()
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(&self, command: &DumpCommand) -> Result<()> {
        self.commands.lock().unwrap().push(command.clone());
        if let Some(archive) = command.args.iter().find_map(|a| a.strip_prefix("--archive=")) {
            let contents: &[u8] = if self.fail_with.is_some() { b"partial" } else { b"mongodump archive" };
            fs::write(archive, contents)?;
        }
        match &self.fail_with {
            Some(message) => Err(BackupError::DumpFailure(message.clone())),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub acl: String,
    pub body: Vec<u8>,
}

#[derive(Default)]
pub struct MemoryObjectStore {
    pub buckets: Mutex<Vec<String>>,
    pub objects: Mutex<Vec<StoredObject>>,
    fail_create: Option<String>,
    fail_put: Option<String>,
}

impl MemoryObjectStore {
    pub fn with_bucket(bucket: &str) -> Self {
        let store = MemoryObjectStore::default();
        store.buckets.lock().unwrap().push(bucket.to_string());
        store
    }

    pub fn failing_create(message: &str) -> Self {
        MemoryObjectStore {
            fail_create: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn failing_put(message: &str) -> Self {
        MemoryObjectStore {
            fail_put: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects.lock().unwrap().clone()
    }

    pub fn buckets(&self) -> Vec<String> {
        self.buckets.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        if let Some(message) = &self.fail_create {
            return Err(BackupError::UploadFailure(message.clone()));
        }
        let mut buckets = self.buckets.lock().unwrap();
        if !buckets.iter().any(|b| b == bucket) {
            buckets.push(bucket.to_string());
        }
        Ok(())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: ByteStream, acl: &str) -> Result<()> {
        if let Some(message) = &self.fail_put {
            return Err(BackupError::UploadFailure(message.clone()));
        }
        let body = body
            .collect()
            .await
            .map_err(|e| BackupError::UploadFailure(e.to_string()))?
            .into_bytes()
            .to_vec();
        self.objects.lock().unwrap().push(StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            acl: acl.to_string(),
            body,
        });
        Ok(())
    }
}
