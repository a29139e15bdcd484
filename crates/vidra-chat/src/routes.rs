//! WebSocket route with inline token validation.

use actix_web::{web, Error, HttpRequest, HttpResponse};
use log::warn;
use serde_json::json;

use vidra_auth::verify_token;
use vidra_commons::constants::{TOKEN_COOKIE, TOKEN_QUERY_PARAM};
use vidra_commons::MemberId;

use crate::session::ChatSession;
use crate::state::ChatServices;
use vidra_broker::RedisChatSubscriber;

/// Token verification context for the WS route.
#[derive(Clone)]
pub struct AuthContext {
    pub jwt_secret: String,
}

/// Configure the chat service routes.
///
/// - `GET /health`
/// - `GET /ws` (token via query parameter `auth` or cookie
///   `auth_token`; missing or invalid → 401, no upgrade)
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/ws", web::get().to(chat_ws));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("chat service up")
}

async fn chat_ws(
    req: HttpRequest,
    stream: web::Payload,
    services: web::Data<ChatServices>,
    subscriber: web::Data<RedisChatSubscriber>,
    auth: web::Data<AuthContext>,
) -> Result<HttpResponse, Error> {
    let member_id = match authenticate(&req, &auth.jwt_secret) {
        Ok(member_id) => member_id,
        Err(reason) => {
            warn!("websocket auth rejected: {reason}");
            return Ok(HttpResponse::Unauthorized().json(json!({ "error": reason })));
        }
    };

    let session = ChatSession::new(
        member_id,
        services.into_inner(),
        subscriber.get_ref().clone(),
    );
    actix_web_actors::ws::start(session, &req, stream)
}

/// Resolve the caller from the query parameter or cookie token.
fn authenticate(req: &HttpRequest, secret: &str) -> Result<MemberId, String> {
    let token = query_param(req.query_string(), TOKEN_QUERY_PARAM)
        .or_else(|| req.cookie(TOKEN_COOKIE).map(|c| c.value().to_string()))
        .ok_or_else(|| "missing token".to_string())?;

    verify_token(&token, secret)
        .map(|claims| claims.user_id)
        .map_err(|e| e.to_string())
}

fn query_param(query: &str, name: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}
