use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::http::Method;
use chrono::Utc;
use futures::future::try_join_all;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, AttributeValue, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
};

use super::{
    content_type_for, AttachmentKey, AttachmentStore, CloudLocation, ProbeOutcome, StorageError,
    StorageMode, StorageResult, StoredFile, UploadedFileRecord, CLOUD_PROVIDER,
    DEFAULT_CONTENT_TYPE,
};
use crate::config::CloudCredentials;
use crate::intake::{IncomingFile, SubmissionId};

const SIGNED_URL_TTL: Duration = Duration::from_secs(3600);
const HEALTH_CHECK_KEY: &str = "health-check";

const META_ORIGINAL_NAME: &str = "originalname";
const META_SUBMISSION_ID: &str = "submissionid";
const META_UPLOADED_AT: &str = "uploadedat";

/// Attachments kept in an S3 bucket (or any [`ObjectStore`]).
pub struct CloudAttachmentStore {
    store: Arc<dyn ObjectStore>,
    signer: Option<Arc<dyn Signer>>,
    location: CloudLocation,
    endpoint: Option<String>,
}

impl fmt::Debug for CloudAttachmentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudAttachmentStore")
            .field("location", &self.location)
            .field("signed_urls", &self.signer.is_some())
            .finish()
    }
}

impl CloudAttachmentStore {
    pub fn s3(
        credentials: &CloudCredentials,
        region: &str,
        endpoint: Option<&str>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_access_key_id(&credentials.access_key_id)
            .with_secret_access_key(&credentials.secret_access_key)
            .with_region(region)
            .with_bucket_name(&credentials.bucket);

        if let Some(endpoint) = endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let s3 = Arc::new(
            builder
                .build()
                .map_err(|e| StorageError::Config(e.to_string()))?,
        );

        Ok(Self {
            store: s3.clone(),
            signer: Some(s3),
            location: CloudLocation {
                provider: CLOUD_PROVIDER.to_string(),
                bucket: credentials.bucket.clone(),
                region: region.to_string(),
            },
            endpoint: endpoint.map(str::to_string),
        })
    }

    /// Wraps an arbitrary object store. Retrieval URLs fall back to public object URLs.
    pub fn with_store(store: Arc<dyn ObjectStore>, bucket: &str, region: &str) -> Self {
        Self {
            store,
            signer: None,
            location: CloudLocation {
                provider: CLOUD_PROVIDER.to_string(),
                bucket: bucket.to_string(),
                region: region.to_string(),
            },
            endpoint: None,
        }
    }

    pub fn location(&self) -> &CloudLocation {
        &self.location
    }

    fn public_url(&self, key: &str) -> String {
        match &self.endpoint {
            Some(endpoint) => format!(
                "{}/{}/{}",
                endpoint.trim_end_matches('/'),
                self.location.bucket,
                key
            ),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.location.bucket, self.location.region, key
            ),
        }
    }

    async fn retrieval_url(&self, location: &Path) -> String {
        if let Some(signer) = &self.signer {
            match signer
                .signed_url(Method::GET, location, SIGNED_URL_TTL)
                .await
            {
                Ok(url) => return url.to_string(),
                Err(e) => tracing::warn!(
                    error = %e,
                    key = %location,
                    "could not presign attachment URL; using public URL"
                ),
            }
        }
        self.public_url(location.as_ref())
    }

    async fn upload_one(
        &self,
        submission_id: &SubmissionId,
        file: &IncomingFile,
    ) -> StorageResult<UploadedFileRecord> {
        let uploaded_at = Utc::now();
        let key = AttachmentKey::new(submission_id, &file.name, uploaded_at);
        let storage_key = key.storage_key();
        let location = Path::from(storage_key.clone());
        let mime_type = content_type_for(file);
        let size = file.size();

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, AttributeValue::from(mime_type.clone()));
        // S3 user metadata travels as headers, so it has to stay ASCII.
        attributes.insert(
            Attribute::Metadata(Cow::Borrowed(META_ORIGINAL_NAME)),
            AttributeValue::from(urlencoding::encode(&file.name).into_owned()),
        );
        attributes.insert(
            Attribute::Metadata(Cow::Borrowed(META_SUBMISSION_ID)),
            AttributeValue::from(submission_id.as_str().to_string()),
        );
        attributes.insert(
            Attribute::Metadata(Cow::Borrowed(META_UPLOADED_AT)),
            AttributeValue::from(uploaded_at.to_rfc3339()),
        );

        let start = Instant::now();
        self.store
            .put_opts(
                &location,
                PutPayload::from(file.data.clone()),
                PutOptions::from(attributes),
            )
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.location.bucket,
                    key = %storage_key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                StorageError::UploadFailed(e.to_string())
            })?;

        tracing::info!(
            bucket = %self.location.bucket,
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        let retrieval_url = self.retrieval_url(&location).await;
        Ok(UploadedFileRecord {
            id: key.file_id(),
            original_name: file.name.clone(),
            storage_key,
            size,
            mime_type,
            uploaded_at,
            retrieval_url: Some(retrieval_url),
        })
    }
}

fn metadata_value<'a>(attributes: &'a Attributes, name: &'static str) -> Option<&'a str> {
    attributes
        .get(&Attribute::Metadata(Cow::Borrowed(name)))
        .map(AsRef::<str>::as_ref)
}

/// A missing key or an `AccessDenied` refusal proves the bucket answered with
/// valid credentials. Missing buckets and rejected keys or signatures do not.
pub fn classify_probe_error(error: &ObjectStoreError) -> ProbeOutcome {
    let message = error.to_string();
    let reachable = match error {
        ObjectStoreError::NotFound { .. } => !message.contains("NoSuchBucket"),
        ObjectStoreError::PermissionDenied { .. } => message.contains("AccessDenied"),
        _ => false,
    };

    if reachable {
        ProbeOutcome::Healthy
    } else {
        ProbeOutcome::Unhealthy(message)
    }
}

#[async_trait]
impl AttachmentStore for CloudAttachmentStore {
    fn mode(&self) -> StorageMode {
        StorageMode::Cloud(self.location.clone())
    }

    async fn upload(
        &self,
        submission_id: &SubmissionId,
        files: &[IncomingFile],
    ) -> StorageResult<Vec<UploadedFileRecord>> {
        try_join_all(files.iter().map(|file| self.upload_one(submission_id, file))).await
    }

    async fn fetch(&self, file_id: &str) -> StorageResult<StoredFile> {
        let key = AttachmentKey::parse_file_id(file_id)
            .ok_or_else(|| StorageError::InvalidFileId(file_id.to_string()))?;
        let storage_key = key.storage_key();
        let location = Path::from(storage_key.clone());
        let start = Instant::now();

        let result = self.store.get(&location).await.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(file_id.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.location.bucket,
                    key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 download failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let content_type = result
            .attributes
            .get(&Attribute::ContentType)
            .map(|value| AsRef::<str>::as_ref(value).to_string())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let file_name = metadata_value(&result.attributes, META_ORIGINAL_NAME)
            .and_then(|encoded| urlencoding::decode(encoded).ok())
            .map(Cow::into_owned)
            .unwrap_or_else(|| key.stored_name().to_string());

        let data = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::info!(
            bucket = %self.location.bucket,
            key = %storage_key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(StoredFile {
            file_name,
            content_type,
            data,
        })
    }

    async fn delete(&self, file_id: &str) -> StorageResult<()> {
        let key = AttachmentKey::parse_file_id(file_id)
            .ok_or_else(|| StorageError::InvalidFileId(file_id.to_string()))?;
        let location = Path::from(key.storage_key());

        self.store.delete(&location).await.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.location.bucket,
                key = %location,
                "S3 delete failed"
            );
            StorageError::DeleteFailed(e.to_string())
        })?;

        tracing::info!(bucket = %self.location.bucket, key = %location, "S3 delete successful");
        Ok(())
    }

    async fn probe(&self) -> ProbeOutcome {
        match self.store.get(&Path::from(HEALTH_CHECK_KEY)).await {
            Ok(_) => ProbeOutcome::Healthy,
            Err(e) => classify_probe_error(&e),
        }
    }
}
