//! # vidra-filestore
//!
//! Blob storage for the streaming pipeline on the `object_store`
//! abstraction: original uploads under `original/{video_id}/…`,
//! processed HLS artifacts under `processed/{video_id}/…`, local
//! filesystem or any S3-compatible endpoint behind one interface.

pub mod error;
pub mod factory;
pub mod layout;
pub mod ops;

pub use error::{FilestoreError, FilestoreResult};
pub use factory::build_object_store;
pub use layout::{content_type_for, original_key, processed_key};
pub use ops::BlobStore;
