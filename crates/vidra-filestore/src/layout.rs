//! Object key layout and content types.

use vidra_commons::VideoId;

use crate::error::{FilestoreError, FilestoreResult};

/// Validate one path segment (a file or segment name supplied from
/// outside). Traversal and separators are rejected because segments
/// are concatenated into object keys.
fn validate_segment(name: &str) -> FilestoreResult<()> {
    if name.is_empty() {
        return Err(FilestoreError::InvalidKey("empty segment".to_string()));
    }
    if name.contains("..") || name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(FilestoreError::InvalidKey(format!(
            "segment {name:?} contains traversal or separator characters"
        )));
    }
    Ok(())
}

/// Key of the original upload: `original/{video_id}/{file_name}`.
pub fn original_key(video_id: &VideoId, file_name: &str) -> FilestoreResult<String> {
    validate_segment(file_name)?;
    Ok(format!("original/{}/{}", video_id, file_name))
}

/// Key of a processed artifact: `processed/{video_id}/{file}`.
pub fn processed_key(video_id: &VideoId, file: &str) -> FilestoreResult<String> {
    validate_segment(file)?;
    Ok(format!("processed/{}/{}", video_id, file))
}

/// Content type by file extension. Playlists and segments carry the
/// HLS types players expect; everything else is an opaque blob.
pub fn content_type_for(file_name: &str) -> &'static str {
    match file_name.rsplit('.').next() {
        Some("m3u8") => "application/vnd.apple.mpegurl",
        Some("ts") => "video/MP2T",
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let id = VideoId::try_new("v1").unwrap();
        assert_eq!(original_key(&id, "clip.mp4").unwrap(), "original/v1/clip.mp4");
        assert_eq!(
            processed_key(&id, "index.m3u8").unwrap(),
            "processed/v1/index.m3u8"
        );
    }

    #[test]
    fn test_traversal_segments_rejected() {
        let id = VideoId::try_new("v1").unwrap();
        assert!(original_key(&id, "../escape.mp4").is_err());
        assert!(processed_key(&id, "a/b.ts").is_err());
        assert!(processed_key(&id, "").is_err());
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("index.m3u8"), "application/vnd.apple.mpegurl");
        assert_eq!(content_type_for("segment0.ts"), "video/MP2T");
        assert_eq!(content_type_for("clip.mp4"), "video/mp4");
        assert_eq!(content_type_for("notes.txt"), "application/octet-stream");
    }
}
