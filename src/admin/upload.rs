use bytes::Bytes;
use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::admin::AdminError;
use crate::backends::ObjectStorage;
use crate::naming::storage_key;

/// A file received from the admin form
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub body: Bytes,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, body: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            body,
        }
    }
}

/// Fails before anything is sent when the bucket is missing or not listable.
pub async fn ensure_bucket(storage: Option<&dyn ObjectStorage>, token: &str) -> Result<(), AdminError> {
    let storage = storage.ok_or(AdminError::MissingBucket)?;
    match storage.bucket_accessible(token).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(AdminError::BucketUnavailable(storage.bucket().to_string())),
        Err(err) => {
            warn!("Bucket check for {} failed: {}", storage.bucket(), err);
            Err(AdminError::BucketUnavailable(storage.bucket().to_string()))
        }
    }
}

/// Upload a batch concurrently and return the storage keys in input order.
///
/// All uploads are awaited together; the first failure (in input order) is
/// returned and the batch is abandoned. Objects that did land stay in the
/// bucket.
pub async fn upload_batch(
    storage: Option<&dyn ObjectStorage>,
    token: &str,
    files: &[UploadFile],
) -> Result<Vec<String>, AdminError> {
    if files.is_empty() {
        return Ok(Vec::new());
    }
    ensure_bucket(storage, token).await?;
    let storage = storage.ok_or(AdminError::MissingBucket)?;

    let now = Utc::now();
    let keys: Vec<String> = files
        .iter()
        .enumerate()
        .map(|(index, file)| storage_key(&file.file_name, index, now))
        .collect();

    let results = join_all(files.iter().zip(&keys).map(|(file, key)| async move {
        debug!("Uploading {} as {}", file.file_name, key);
        storage
            .upload(token, key, file.body.clone(), &file.content_type)
            .await
            .map_err(|source| AdminError::Upload {
                file: file.file_name.clone(),
                source,
            })
    }))
    .await;

    for result in results {
        result?;
    }
    info!("⬆️  Uploaded {} image(s) to {}", keys.len(), storage.bucket());
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::backends::{MemoryStorage, StorageError};

    /// Bucket whose listing check answers with a fixed outcome
    struct UnlistedBucket {
        listing: fn() -> Result<bool, StorageError>,
        uploads: AtomicUsize,
    }

    impl UnlistedBucket {
        fn new(listing: fn() -> Result<bool, StorageError>) -> Self {
            Self {
                listing,
                uploads: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ObjectStorage for UnlistedBucket {
        fn bucket(&self) -> &str {
            "property-images"
        }

        fn can_sign(&self) -> bool {
            false
        }

        async fn signed_url(&self, _key: &str, _expires_in: Duration) -> Result<String, StorageError> {
            Err(StorageError::NoServiceCredential)
        }

        fn public_url(&self, _key: &str) -> String {
            String::new()
        }

        async fn bucket_accessible(&self, _token: &str) -> Result<bool, StorageError> {
            (self.listing)()
        }

        async fn upload(
            &self,
            _token: &str,
            _key: &str,
            _body: Bytes,
            _content_type: &str,
        ) -> Result<(), StorageError> {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn jpeg(name: &str) -> UploadFile {
        UploadFile::new(name, "image/jpeg", Bytes::from_static(b"\xff\xd8\xff"))
    }

    #[tokio::test]
    async fn keys_are_prefixed_indexed_and_sanitized() {
        let storage = MemoryStorage::new("property-images");
        let keys = upload_batch(
            Some(&storage),
            "token",
            &[jpeg("Front Door.JPG"), jpeg("back (1).png")],
        )
        .await
        .unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys[0].starts_with("properties/"));
        assert!(keys[0].ends_with("-0-Front_Door.JPG"));
        assert!(keys[1].ends_with("-1-back_1.png"));
        assert_eq!(storage.keys().await.len(), 2);
    }

    #[tokio::test]
    async fn missing_bucket_fails_before_upload() {
        let err = upload_batch(None, "token", &[jpeg("a.jpg")]).await.unwrap_err();
        assert!(matches!(err, AdminError::MissingBucket));
    }

    #[tokio::test]
    async fn empty_batch_needs_no_bucket() {
        assert!(upload_batch(None, "token", &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unlistable_bucket_fails_before_upload() {
        let storage = UnlistedBucket::new(|| Ok(false));
        let err = upload_batch(Some(&storage), "token", &[jpeg("a.jpg"), jpeg("b.jpg")])
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::BucketUnavailable(ref bucket) if bucket == "property-images"));
        assert_eq!(storage.uploads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_bucket_check_is_treated_as_unavailable() {
        let storage = UnlistedBucket::new(|| {
            Err(StorageError::Http {
                status: 500,
                body: "boom".to_string(),
            })
        });
        let err = upload_batch(Some(&storage), "token", &[jpeg("a.jpg")])
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::BucketUnavailable(_)));
        assert_eq!(storage.uploads.load(Ordering::SeqCst), 0);

        let listed = UnlistedBucket::new(|| Ok(true));
        upload_batch(Some(&listed), "token", &[jpeg("a.jpg")]).await.unwrap();
        assert_eq!(listed.uploads.load(Ordering::SeqCst), 1);
    }
}
