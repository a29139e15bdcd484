//! Route configuration for the member RPC surface.

use actix_web::{web, HttpResponse};

use crate::handlers;

/// Configure the member service routes.
///
/// - `POST /rpc/member/register`
/// - `POST /rpc/member/login`
/// - `POST /rpc/member/logout`
/// - `POST /rpc/member/force_logout`
/// - `POST /rpc/member/check_session`
/// - `POST /rpc/member/reconnect`
/// - `GET  /rpc/member/find?email=`
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health)).service(
        web::scope("/rpc/member")
            .route("/register", web::post().to(handlers::register))
            .route("/login", web::post().to(handlers::login))
            .route("/logout", web::post().to(handlers::logout))
            .route("/force_logout", web::post().to(handlers::force_logout))
            .route("/check_session", web::post().to(handlers::check_session))
            .route("/reconnect", web::post().to(handlers::reconnect))
            .route("/find", web::get().to(handlers::find_member)),
    );
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("member service up")
}
