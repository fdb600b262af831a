// mongo-s3-backup/src/backup/s3_upload.rs
use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::config::Region;
use s3::error::DisplayErrorContext;
use s3::primitives::ByteStream;
use s3::types::{BucketLocationConstraint, CreateBucketConfiguration, ObjectCannedAcl};
use std::path::Path;
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::errors::{BackupError, Result};

pub const DEFAULT_ACL: &str = "private";

/// Buckets that must be created without a location constraint.
const DEFAULT_REGION: &str = "us-east-1";

/// The two remote calls an upload needs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Creates the bucket, treating "already exists" as success.
    async fn ensure_bucket(&self, bucket: &str) -> Result<()>;

    async fn put_object(&self, bucket: &str, key: &str, body: ByteStream, acl: &str) -> Result<()>;
}

/// `ObjectStore` backed by S3 or any S3-compatible service.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: s3::Client,
    region: String,
}

impl S3ObjectStore {
    pub async fn connect(storage: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(s3::config::BehaviorVersion::latest())
            .region(Region::new(storage.region.clone()))
            .credentials_provider(s3::config::Credentials::new(
                &storage.access_key,
                &storage.secret_key,
                None,     // session_token
                None,     // expiry
                "Static", // provider_name
            ));
        let endpoint = storage.endpoint_url.as_deref().filter(|e| !e.is_empty());
        if let Some(endpoint) = endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        // MinIO and friends do not serve virtual-hosted buckets.
        let s3_config = s3::config::Builder::from(&sdk_config)
            .force_path_style(endpoint.is_some())
            .build();

        S3ObjectStore {
            client: s3::Client::from_conf(s3_config),
            region: storage.region.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                info!("Created bucket {}", bucket);
                Ok(())
            }
            Err(err) => {
                let exists = err.as_service_error().is_some_and(|e| {
                    e.is_bucket_already_owned_by_you() || e.is_bucket_already_exists()
                });
                if exists {
                    debug!("Bucket {} already exists", bucket);
                    Ok(())
                } else {
                    Err(BackupError::UploadFailure(format!(
                        "Failed to create bucket {}: {}",
                        bucket,
                        DisplayErrorContext(&err)
                    )))
                }
            }
        }
    }

    async fn put_object(&self, bucket: &str, key: &str, body: ByteStream, acl: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .acl(ObjectCannedAcl::from(acl))
            .body(body)
            .send()
            .await
            .map_err(|err| {
                BackupError::UploadFailure(format!(
                    "Failed to upload to bucket {} with key {}: {}",
                    bucket,
                    key,
                    DisplayErrorContext(&err)
                ))
            })?;
        Ok(())
    }
}

/// Object key for an artifact, honoring the optional folder prefix.
pub fn object_key(storage: &StorageConfig, remote_name: &str) -> String {
    match storage.folder_prefix.as_deref().map(|p| p.trim_matches('/')) {
        Some(prefix) if !prefix.is_empty() => format!("{}/{}", prefix, remote_name),
        _ => remote_name.to_string(),
    }
}

/// Makes sure the bucket exists, then streams `local_path` into it.
pub async fn upload(
    store: &dyn ObjectStore,
    local_path: &Path,
    remote_name: &str,
    storage: &StorageConfig,
) -> Result<()> {
    let key = object_key(storage, remote_name);
    let acl = storage
        .acl
        .as_deref()
        .filter(|acl| !acl.is_empty())
        .unwrap_or(DEFAULT_ACL);

    info!(
        "Uploading {} to bucket {} with key {}",
        local_path.display(),
        storage.bucket_name,
        key
    );

    store.ensure_bucket(&storage.bucket_name).await?;

    let body = ByteStream::from_path(local_path).await.map_err(|e| {
        BackupError::UploadFailure(format!(
            "Failed to read {}: {}",
            local_path.display(),
            e
        ))
    })?;

    store
        .put_object(&storage.bucket_name, &key, body, acl)
        .await?;

    info!(
        "✅ Uploaded {} to bucket {} with key {}",
        local_path.display(),
        storage.bucket_name,
        key
    );
    Ok(())
}
