//! Streaming route relays, including the multipart upload bridge.

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use log::warn;
use serde::Deserialize;
use serde_json::json;

use vidra_commons::rpc::UploadMetadata;
use vidra_commons::VideoType;

use crate::clients::BackendClients;
use crate::handlers::relay_response;

/// Chunk size the upload relay re-frames the file into.
const UPLOAD_CHUNK_SIZE: usize = 32 * 1024;

/// Relay the multipart upload as a client-streamed RPC.
///
/// Form fields `title`, `description`, `type` become the metadata
/// frame together with the file's name; the file part is re-framed
/// into 32 KiB chunks. The request to the backend runs on a spawned
/// task fed through a channel, because the multipart stream itself is
/// bound to the connection task.
pub async fn upload(clients: web::Data<BackendClients>, mut multipart: Multipart) -> HttpResponse {
    let mut title = String::new();
    let mut description = String::new();
    let mut video_type: Option<VideoType> = None;
    let mut relay: Option<tokio::task::JoinHandle<(u16, serde_json::Value)>> = None;

    while let Some(field) = multipart.next().await {
        let mut field = match field {
            Ok(field) => field,
            Err(e) => {
                return HttpResponse::BadRequest()
                    .json(json!({ "success": false, "message": format!("bad multipart: {e}") }))
            }
        };

        match field.name().unwrap_or_default() {
            "title" => title = read_text_field(&mut field).await,
            "description" => description = read_text_field(&mut field).await,
            "type" => {
                let raw = read_text_field(&mut field).await;
                video_type = VideoType::parse(&raw);
                if video_type.is_none() {
                    return HttpResponse::BadRequest().json(json!({
                        "success": false,
                        "message": format!("unknown video type {raw:?}"),
                    }));
                }
            }
            "file" => {
                // metadata fields must precede the file part
                let Some(video_type) = video_type else {
                    return HttpResponse::BadRequest().json(json!({
                        "success": false,
                        "message": "missing type field before file",
                    }));
                };
                let file_name = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .unwrap_or("upload.mp4")
                    .to_string();

                let metadata = UploadMetadata {
                    title: title.clone(),
                    description: description.clone(),
                    video_type,
                    file_name,
                };

                let (tx, rx) = tokio::sync::mpsc::channel::<Result<Bytes, std::io::Error>>(8);
                let clients = clients.clone();

                // the backend call is Send; the multipart field is not,
                // so it stays here feeding the channel
                relay = Some(tokio::spawn(async move {
                    let body = futures_util::stream::unfold(rx, |mut rx| async move {
                        rx.recv().await.map(|item| (item, rx))
                    });
                    clients
                        .streaming
                        .post_upload("/rpc/streaming/upload", &metadata, body)
                        .await
                }));

                let mut buffer = BytesMut::new();
                while let Some(chunk) = field.next().await {
                    match chunk {
                        Ok(chunk) => {
                            buffer.extend_from_slice(&chunk);
                            while buffer.len() >= UPLOAD_CHUNK_SIZE {
                                let out = buffer.split_to(UPLOAD_CHUNK_SIZE).freeze();
                                if tx.send(Ok(out)).await.is_err() {
                                    warn!("upload relay receiver dropped early");
                                    break;
                                }
                            }
                        }
                        Err(e) => {
                            let _ = tx
                                .send(Err(std::io::Error::other(e.to_string())))
                                .await;
                            break;
                        }
                    }
                }
                if !buffer.is_empty() {
                    let _ = tx.send(Ok(buffer.freeze())).await;
                }
                drop(tx);
            }
            other => {
                warn!("ignoring unknown multipart field {other:?}");
                while field.next().await.is_some() {}
            }
        }
    }

    match relay {
        Some(handle) => match handle.await {
            Ok((status, body)) => relay_response(status, body),
            Err(e) => HttpResponse::InternalServerError()
                .json(json!({ "success": false, "message": format!("relay task failed: {e}") })),
        },
        None => HttpResponse::BadRequest()
            .json(json!({ "success": false, "message": "Missing file" })),
    }
}

async fn read_text_field(field: &mut actix_multipart::Field) -> String {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = field.next().await {
        match chunk {
            Ok(chunk) => buffer.extend_from_slice(&chunk),
            Err(_) => break,
        }
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

pub async fn get_video(
    clients: web::Data<BackendClients>,
    path: web::Path<String>,
) -> HttpResponse {
    let (status, body) = clients
        .streaming
        .get_json(&format!("/rpc/streaming/video/{}", path.into_inner()), &[])
        .await;
    relay_response(status, body)
}

pub async fn get_index_m3u8(
    clients: web::Data<BackendClients>,
    path: web::Path<String>,
) -> HttpResponse {
    let (status, content_type, bytes) = clients
        .streaming
        .get_raw(&format!("/rpc/streaming/hls/{}/index", path.into_inner()))
        .await;
    raw_response(status, &content_type, bytes)
}

pub async fn get_hls_segment(
    clients: web::Data<BackendClients>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    let (video_id, segment) = path.into_inner();
    let (status, content_type, bytes) = clients
        .streaming
        .get_raw(&format!("/rpc/streaming/hls/{video_id}/{segment}"))
        .await;
    raw_response(status, &content_type, bytes)
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub key_word: String,
}

pub async fn search(
    clients: web::Data<BackendClients>,
    query: web::Query<SearchQuery>,
) -> HttpResponse {
    let (status, body) = clients
        .streaming
        .get_json("/rpc/streaming/search", &[("key_word", query.key_word.as_str())])
        .await;
    relay_response(status, body)
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
    clients: web::Data<BackendClients>,
    query: web::Query<RecommendQuery>,
) -> HttpResponse {
    let (status, body) = clients
        .streaming
        .get_json(
            "/rpc/streaming/recommend",
            &[("limit", query.limit.to_string().as_str())],
        )
        .await;
    relay_response(status, body)
}

fn raw_response(status: u16, content_type: &str, bytes: Bytes) -> HttpResponse {
    HttpResponse::build(
        actix_web::http::StatusCode::from_u16(status)
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR),
    )
    .content_type(content_type)
    .body(bytes)
}
