//! HTTP/JSON RPC handlers for the streaming service.
//!
//! The upload endpoint frames a client-streamed RPC over one chunked
//! request body: the first newline-terminated line is the JSON
//! metadata frame, everything after it is the raw byte stream.

use actix_web::{web, HttpResponse};
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use serde::Deserialize;

use vidra_commons::rpc::{RpcFailure, UploadMetadata, UploadResponse, VideoListResponse, VideoSummary};
use vidra_commons::{CommonError, Video, VideoId};

use crate::service::StreamingService;

/// Metadata frames larger than this are rejected rather than buffered.
const MAX_METADATA_BYTES: usize = 64 * 1024;

fn failure(err: CommonError) -> HttpResponse {
    let body = RpcFailure::new(err.to_string());
    HttpResponse::build(
        actix_web::http::StatusCode::from_u16(err.status_code())
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR),
    )
    .json(body)
}

fn summarize(videos: Vec<Video>) -> VideoListResponse {
    VideoListResponse {
        success: true,
        videos: videos
            .into_iter()
            .map(|v| VideoSummary {
                video_id: v.video_id,
                title: v.title,
                description: v.description,
                file_name: v.object_key,
                video_type: v.video_type,
                status: v.status,
                view_count: v.view_count,
            })
            .collect(),
    }
}

/// Read the metadata frame off the front of the body, returning the
/// leftover bytes that already belong to the file.
async fn read_metadata_frame(
    payload: &mut web::Payload,
) -> Result<(UploadMetadata, Bytes), CommonError> {
    let mut buffer = BytesMut::new();

    while let Some(chunk) = payload.next().await {
        let chunk =
            chunk.map_err(|e| CommonError::internal(format!("upload stream error: {e}")))?;
        buffer.extend_from_slice(&chunk);

        if let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
            let line = buffer.split_to(pos + 1);
            let metadata: UploadMetadata = serde_json::from_slice(&line[..line.len() - 1])
                .map_err(|e| CommonError::invalid_input(format!("bad upload metadata: {e}")))?;
            return Ok((metadata, buffer.freeze()));
        }
        if buffer.len() > MAX_METADATA_BYTES {
            return Err(CommonError::invalid_input("metadata frame too large"));
        }
    }

    // body ended before the metadata frame completed
    Err(CommonError::invalid_input("missing upload metadata"))
}

pub async fn upload(
    service: web::Data<StreamingService>,
    mut payload: web::Payload,
) -> HttpResponse {
    let (metadata, leftover) = match read_metadata_frame(&mut payload).await {
        Ok(parts) => parts,
        Err(e) => return failure(e),
    };

    let body = futures_util::stream::once(async move {
        Ok::<_, actix_web::error::PayloadError>(leftover)
    })
    .chain(payload);

    match service.upload_video(metadata, Box::pin(body)).await {
        Ok(video_id) => HttpResponse::Ok().json(UploadResponse {
            success: true,
            message: "upload accepted, transcoding queued".to_string(),
            video_id,
        }),
        Err(e) => failure(e),
    }
}

pub async fn get_video(
    service: web::Data<StreamingService>,
    path: web::Path<String>,
) -> HttpResponse {
    let video_id = match VideoId::try_new(path.into_inner()) {
        Ok(id) => id,
        Err(e) => return failure(CommonError::invalid_input(e.to_string())),
    };

    match service.get_video(&video_id).await {
        Ok(info) => HttpResponse::Ok().json(vidra_commons::rpc::GetVideoResponse {
            success: true,
            video_id: info.video_id,
            title: info.title,
            hls_url: info.hls_url,
        }),
        Err(e) => failure(e),
    }
}

pub async fn get_index_m3u8(
    service: web::Data<StreamingService>,
    path: web::Path<String>,
) -> HttpResponse {
    let video_id = match VideoId::try_new(path.into_inner()) {
        Ok(id) => id,
        Err(e) => return failure(CommonError::invalid_input(e.to_string())),
    };

    match service.get_index_m3u8(&video_id).await {
        Ok(bytes) => HttpResponse::Ok()
            .content_type("application/vnd.apple.mpegurl")
            .body(bytes),
        Err(e) => failure(e),
    }
}

pub async fn get_hls_segment(
    service: web::Data<StreamingService>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    let (video_id, segment) = path.into_inner();
    let video_id = match VideoId::try_new(video_id) {
        Ok(id) => id,
        Err(e) => return failure(CommonError::invalid_input(e.to_string())),
    };

    match service.get_hls_segment(&video_id, &segment).await {
        Ok(bytes) => HttpResponse::Ok().content_type("video/MP2T").body(bytes),
        Err(e) => failure(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub key_word: String,
}

pub async fn search(
    service: web::Data<StreamingService>,
    query: web::Query<SearchQuery>,
) -> HttpResponse {
    match service.search(&query.key_word).await {
        Ok(videos) => HttpResponse::Ok().json(summarize(videos)),
        Err(e) => failure(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    10
}

pub async fn recommend(
    service: web::Data<StreamingService>,
    query: web::Query<RecommendQuery>,
) -> HttpResponse {
    match service.recommend(query.limit).await {
        Ok(videos) => HttpResponse::Ok().json(summarize(videos)),
        Err(e) => failure(e),
    }
}
