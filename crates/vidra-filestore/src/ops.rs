//! Unified blob operations for the streaming pipeline.

use std::path::Path as FsPath;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use log::debug;
use object_store::path::Path;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions};

use crate::error::FilestoreResult;
use crate::layout::content_type_for;

/// Blob storage handle shared by the upload path, the transcode
/// worker and the read path.
///
/// Writes are idempotent under identical keys, which is what lets a
/// crashed transcode run be retried wholesale.
#[derive(Clone)]
pub struct BlobStore {
    store: Arc<dyn ObjectStore>,
}

impl BlobStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    fn put_options(content_type: &'static str) -> PutOptions {
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.into());
        PutOptions {
            attributes,
            ..Default::default()
        }
    }

    /// Upload a local file under `key`, content type derived from the
    /// key's extension.
    pub async fn put_file(&self, key: &str, local_path: &FsPath) -> FilestoreResult<()> {
        let data = tokio::fs::read(local_path).await?;
        debug!("uploading {} ({} bytes) to {key}", local_path.display(), data.len());
        self.put_bytes(key, Bytes::from(data)).await
    }

    /// Write raw bytes under `key`, replacing any existing object.
    pub async fn put_bytes(&self, key: &str, data: Bytes) -> FilestoreResult<()> {
        let options = Self::put_options(content_type_for(key));
        self.store
            .put_opts(&Path::from(key), data.into(), options)
            .await?;
        Ok(())
    }

    /// Read the full object at `key`.
    pub async fn get_bytes(&self, key: &str) -> FilestoreResult<Bytes> {
        let result = self.store.get(&Path::from(key)).await?;
        Ok(result.bytes().await?)
    }

    /// Download the object at `key` into a local file.
    pub async fn download_to(&self, key: &str, local_path: &FsPath) -> FilestoreResult<()> {
        let data = self.get_bytes(key).await?;
        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(local_path, &data).await?;
        debug!("downloaded {key} to {}", local_path.display());
        Ok(())
    }

    /// List object keys under a prefix.
    pub async fn list_keys(&self, prefix: &str) -> FilestoreResult<Vec<String>> {
        let prefix = Path::from(prefix);
        let mut stream = self.store.list(Some(&prefix));
        let mut keys = Vec::new();
        while let Some(meta) = stream.next().await {
            keys.push(meta?.location.to_string());
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;
    use vidra_commons::VideoId;

    fn memory_store() -> BlobStore {
        BlobStore::new(Arc::new(InMemory::new()))
    }

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let store = memory_store();
        let id = VideoId::try_new("v1").unwrap();
        let key = crate::layout::processed_key(&id, "segment0.ts").unwrap();

        store
            .put_bytes(&key, Bytes::from_static(b"segment bytes"))
            .await
            .unwrap();
        let got = store.get_bytes(&key).await.unwrap();
        assert_eq!(got, Bytes::from_static(b"segment bytes"));
    }

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let store = memory_store();
        let err = store.get_bytes("processed/v1/missing.ts").await.unwrap_err();
        assert!(matches!(err, crate::error::FilestoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_put_is_idempotent_under_same_key() {
        let store = memory_store();
        store
            .put_bytes("original/v1/a.mp4", Bytes::from_static(b"first"))
            .await
            .unwrap();
        store
            .put_bytes("original/v1/a.mp4", Bytes::from_static(b"second"))
            .await
            .unwrap();
        let got = store.get_bytes("original/v1/a.mp4").await.unwrap();
        assert_eq!(got, Bytes::from_static(b"second"));
    }

    #[tokio::test]
    async fn test_list_keys_under_prefix() {
        let store = memory_store();
        store
            .put_bytes("processed/v1/index.m3u8", Bytes::from_static(b"#EXTM3U"))
            .await
            .unwrap();
        store
            .put_bytes("processed/v1/segment0.ts", Bytes::from_static(b"ts"))
            .await
            .unwrap();
        store
            .put_bytes("processed/v2/index.m3u8", Bytes::from_static(b"#EXTM3U"))
            .await
            .unwrap();

        let mut keys = store.list_keys("processed/v1").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["processed/v1/index.m3u8", "processed/v1/segment0.ts"]);
    }
}
