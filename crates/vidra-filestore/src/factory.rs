//! Object store construction per configured backend.

use std::sync::Arc;

use log::info;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::ObjectStore;

use vidra_commons::config::ObjectStoreSettings;

use crate::error::{FilestoreError, FilestoreResult};

/// Build the configured object store.
///
/// `local` serves development and tests from a directory; `s3` covers
/// both AWS and MinIO-style endpoints (set `endpoint` and the store
/// speaks path-style to it).
pub fn build_object_store(settings: &ObjectStoreSettings) -> FilestoreResult<Arc<dyn ObjectStore>> {
    match settings.backend.as_str() {
        "local" => {
            std::fs::create_dir_all(&settings.root_path)?;
            let store = LocalFileSystem::new_with_prefix(&settings.root_path)
                .map_err(FilestoreError::from)?;
            info!("object store: local filesystem at {}", settings.root_path);
            Ok(Arc::new(store))
        }
        "s3" => {
            let mut builder = AmazonS3Builder::new()
                .with_bucket_name(&settings.bucket)
                .with_region(if settings.region.is_empty() {
                    "us-east-1"
                } else {
                    &settings.region
                })
                .with_access_key_id(&settings.access_key)
                .with_secret_access_key(&settings.secret_key);

            if !settings.endpoint.is_empty() {
                builder = builder
                    .with_endpoint(&settings.endpoint)
                    .with_allow_http(true);
            }

            let store = builder.build().map_err(FilestoreError::from)?;
            info!("object store: s3 bucket {}", settings.bucket);
            Ok(Arc::new(store))
        }
        other => Err(FilestoreError::ObjectStore(format!(
            "unknown object store backend {other:?} (expected \"local\" or \"s3\")"
        ))),
    }
}
