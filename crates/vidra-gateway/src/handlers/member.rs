//! Member route relays.

use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use vidra_commons::rpc::{LoginRequest, RegisterRequest};

use crate::clients::BackendClients;
use crate::handlers::relay_response;
use crate::middleware::AuthenticatedMember;

pub async fn register(
    clients: web::Data<BackendClients>,
    body: web::Json<RegisterRequest>,
) -> HttpResponse {
    let (status, body) = clients
        .member
        .post_json("/rpc/member/register", &json!(body.into_inner()))
        .await;
    relay_response(status, body)
}

pub async fn login(
    clients: web::Data<BackendClients>,
    body: web::Json<LoginRequest>,
) -> HttpResponse {
    let (status, body) = clients
        .member
        .post_json("/rpc/member/login", &json!(body.into_inner()))
        .await;
    relay_response(status, body)
}

#[derive(Debug, Deserialize)]
pub struct FindQuery {
    pub email: String,
}

pub async fn find(
    clients: web::Data<BackendClients>,
    query: web::Query<FindQuery>,
) -> HttpResponse {
    let (status, body) = clients
        .member
        .get_json("/rpc/member/find", &[("email", query.email.as_str())])
        .await;
    relay_response(status, body)
}

/// Logout forwards the caller's own token; the middleware already
/// verified it.
pub async fn logout(clients: web::Data<BackendClients>, req: HttpRequest) -> HttpResponse {
    let token = match req.extensions().get::<AuthenticatedMember>() {
        Some(member) => member.token.clone(),
        None => {
            return HttpResponse::Unauthorized().json(json!({ "error": "Missing token" }));
        }
    };

    let (status, body) = clients
        .member
        .post_json("/rpc/member/logout", &json!({ "token": token }))
        .await;
    relay_response(status, body)
}
