//! Photo object storage: S3-compatible buckets and an in-memory fallback.

use crate::error::AppError;
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), AppError>;

    async fn get(&self, key: &str) -> Result<StoredObject, AppError>;

    async fn delete(&self, key: &str) -> Result<(), AppError>;

    fn describe(&self) -> String;
}

pub struct S3PhotoStore {
    client: Client,
    bucket: String,
}

impl S3PhotoStore {
    /// Create client with AWS credentials from environment
    pub async fn new(bucket: String) -> Self {
        let region_provider = RegionProviderChain::default_provider().or_else("us-east-1");
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;
        Self {
            client: Client::new(&config),
            bucket,
        }
    }

    /// Create client with custom endpoint (for MinIO, R2, etc.)
    pub async fn new_with_endpoint(
        bucket: String,
        endpoint: String,
        access_key: String,
        secret_key: String,
    ) -> Self {
        use aws_credential_types::Credentials;

        let creds = Credentials::new(access_key, secret_key, None, None, "custom");

        let region_provider = if let Some(region) = infer_region_from_endpoint(&endpoint) {
            RegionProviderChain::first_try(Region::new(region)).or_else("us-east-1")
        } else {
            RegionProviderChain::default_provider().or_else("us-east-1")
        };

        let force_path_style = is_path_style_endpoint(&endpoint);
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(region_provider)
            .endpoint_url(endpoint)
            .credentials_provider(creds)
            .load()
            .await;

        // MinIO and other self-hosted endpoints have no per-bucket DNS.
        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(force_path_style)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            bucket,
        }
    }
}

#[async_trait]
impl PhotoStore for S3PhotoStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), AppError> {
        let start = Instant::now();
        let len = bytes.len();

        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await;

        match &result {
            Ok(_) => log::info!("S3 upload: {} ({:.2?}, {} bytes)", key, start.elapsed(), len),
            Err(e) => log::error!("S3 upload failed: {} - {:?}", key, e),
        }

        result.map_err(|e| AppError::Storage(format!("upload {}: {}", key, e)))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<StoredObject, AppError> {
        let start = Instant::now();

        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("download {}: {}", key, e)))?;

        let content_type = resp
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = resp
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("download {}: {}", key, e)))?
            .into_bytes()
            .to_vec();

        log::info!(
            "S3 download: {} ({:.2?}, {} bytes)",
            key,
            start.elapsed(),
            bytes.len()
        );

        Ok(StoredObject {
            bytes,
            content_type,
        })
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("delete {}: {}", key, e)))?;

        log::info!("S3 deleted: {}", key);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("s3://{}", self.bucket)
    }
}

/// Process-local store used when no bucket is configured, and by tests.
#[derive(Default)]
pub struct MemoryPhotoStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    failing_deletes: Mutex<Vec<String>>,
}

impl MemoryPhotoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later delete of `key` fail, to exercise best-effort cleanup.
    pub fn fail_deletes_for(&self, key: &str) {
        self.failing_deletes
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(key.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PhotoStore for MemoryPhotoStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), AppError> {
        self.objects.lock().unwrap_or_else(|p| p.into_inner()).insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<StoredObject, AppError> {
        self.objects
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::Storage(format!("no such object: {}", key)))
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let failing = self
            .failing_deletes
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .any(|k| k == key);
        if failing {
            return Err(AppError::Storage(format!("delete {}: injected failure", key)));
        }
        self.objects
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(key);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

fn endpoint_host(endpoint: &str) -> &str {
    endpoint
        .split("://")
        .nth(1)
        .unwrap_or(endpoint)
        .split('/')
        .next()
        .unwrap_or("")
}

fn infer_region_from_endpoint(endpoint: &str) -> Option<String> {
    // - Aliyun OSS: "oss-cn-shanghai.aliyuncs.com" -> "oss-cn-shanghai"
    // - Cloudflare R2: region is typically "auto"
    let host = endpoint_host(endpoint);

    if host.contains("r2.cloudflarestorage.com") {
        return Some("auto".to_string());
    }

    host.split('.')
        .find(|label| label.starts_with("oss-"))
        .map(str::to_string)
}

/// Hosted providers accept virtual-hosted requests; anything on an IP, localhost
/// or an explicit port (MinIO) needs path-style addressing.
fn is_path_style_endpoint(endpoint: &str) -> bool {
    let host = endpoint_host(endpoint);
    if host.contains("aliyuncs.com") || host.contains("amazonaws.com") {
        return false;
    }
    host.contains(':') || host.starts_with("localhost") || host.parse::<std::net::IpAddr>().is_ok()
}
