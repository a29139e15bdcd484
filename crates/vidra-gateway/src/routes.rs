//! Gateway route configuration.

use actix_web::web;

use crate::handlers::{self, member, streaming};
use crate::middleware::TokenAuth;

/// Configure the public edge routes.
///
/// - `GET  /` liveness
/// - `POST /debug?service=&status=` logging toggle
/// - `POST /member/register`, `POST /member/login`, `GET /member/find`
/// - `POST /member/logout` (auth)
/// - `POST /streaming/upload` and the read routes (auth)
///
/// The chat WebSocket is terminated by the chat service itself.
pub fn configure_routes(cfg: &mut web::ServiceConfig, jwt_secret: &str) {
    cfg.route("/", web::get().to(handlers::connect_check))
        .route("/debug", web::post().to(handlers::debug_log_flag))
        .service(
            web::scope("/member")
                .route("/register", web::post().to(member::register))
                .route("/login", web::post().to(member::login))
                .route("/find", web::get().to(member::find))
                .service(
                    web::scope("")
                        .wrap(TokenAuth::new(jwt_secret))
                        .route("/logout", web::post().to(member::logout)),
                ),
        )
        .service(
            web::scope("/streaming")
                .wrap(TokenAuth::new(jwt_secret))
                .route("/upload", web::post().to(streaming::upload))
                .route(
                    "/video/hls/{video_id}/index",
                    web::get().to(streaming::get_index_m3u8),
                )
                .route(
                    "/video/hls/{video_id}/{segment}",
                    web::get().to(streaming::get_hls_segment),
                )
                .route("/video/{video_id}", web::get().to(streaming::get_video))
                .route("/search", web::get().to(streaming::search))
                .route("/recommend", web::get().to(streaming::recommend)),
        );
}
