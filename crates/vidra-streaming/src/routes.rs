//! Route configuration for the streaming service.

use actix_web::{web, HttpResponse};

use crate::handlers;

/// Configure the streaming service routes.
///
/// RPC surface (consumed by the gateway):
/// - `POST /rpc/streaming/upload` (framed stream)
/// - `GET  /rpc/streaming/video/{video_id}`
/// - `GET  /rpc/streaming/search?key_word=`
/// - `GET  /rpc/streaming/recommend?limit=`
/// - `GET  /rpc/streaming/hls/{video_id}/index`
/// - `GET  /rpc/streaming/hls/{video_id}/{segment}`
///
/// Public playback routes (embedded in HLS URLs):
/// - `GET /video/hls/{video_id}/index.m3u8`
/// - `GET /video/hls/{video_id}/{segment}`
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .service(
            web::scope("/rpc/streaming")
                .route("/upload", web::post().to(handlers::upload))
                .route("/video/{video_id}", web::get().to(handlers::get_video))
                .route("/search", web::get().to(handlers::search))
                .route("/recommend", web::get().to(handlers::recommend))
                .route("/hls/{video_id}/index", web::get().to(handlers::get_index_m3u8))
                .route(
                    "/hls/{video_id}/{segment}",
                    web::get().to(handlers::get_hls_segment),
                ),
        )
        .service(
            web::scope("/video/hls")
                .route("/{video_id}/index.m3u8", web::get().to(handlers::get_index_m3u8))
                .route(
                    "/{video_id}/{segment}",
                    web::get().to(handlers::get_hls_segment),
                ),
        );
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("streaming service up")
}
