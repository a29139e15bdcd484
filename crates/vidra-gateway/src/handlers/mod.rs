//! Gateway request handlers.

pub mod member;
pub mod streaming;

use actix_web::{web, HttpResponse};
use log::info;
use serde::Deserialize;
use serde_json::{json, Value};

/// Build an HTTP response from a relayed (status, body) pair.
pub(crate) fn relay_response(status: u16, body: Value) -> HttpResponse {
    HttpResponse::build(
        actix_web::http::StatusCode::from_u16(status)
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR),
    )
    .json(body)
}

/// Liveness probe.
pub async fn connect_check() -> HttpResponse {
    HttpResponse::Ok().body("vidra gateway up")
}

#[derive(Debug, Deserialize)]
pub struct DebugQuery {
    #[serde(default)]
    pub service: String,
    pub status: bool,
}

/// Toggle debug logging at runtime.
pub async fn debug_log_flag(query: web::Query<DebugQuery>) -> HttpResponse {
    vidra_commons::logging::set_debug(query.status);
    info!(
        "debug logging {} (service hint: {})",
        if query.status { "enabled" } else { "disabled" },
        if query.service.is_empty() { "-" } else { &query.service }
    );
    HttpResponse::Ok().json(json!({
        "success": true,
        "debug": query.status,
    }))
}
