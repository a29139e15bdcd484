//! HTTP/JSON RPC handlers for the member service.

use actix_web::{web, HttpResponse};
use log::debug;
use serde::Deserialize;

use vidra_commons::rpc::{
    CheckSessionResponse, FindMemberResponse, ForceLogoutRequest, LoginRequest, LoginResponse,
    RegisterRequest, RpcAck, RpcFailure, TokenRequest,
};
use vidra_commons::CommonError;

use crate::service::MemberService;

/// Map a use-case error onto its transport status with the uniform
/// failure envelope.
pub(crate) fn failure(err: CommonError) -> HttpResponse {
    let body = RpcFailure::new(err.to_string());
    HttpResponse::build(
        actix_web::http::StatusCode::from_u16(err.status_code())
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR),
    )
    .json(body)
}

pub async fn register(
    service: web::Data<MemberService>,
    req: web::Json<RegisterRequest>,
) -> HttpResponse {
    match service.register(&req.email, &req.password).await {
        Ok(_) => HttpResponse::Ok().json(RpcAck::ok("registered")),
        Err(e) => failure(e),
    }
}

pub async fn login(
    service: web::Data<MemberService>,
    req: web::Json<LoginRequest>,
) -> HttpResponse {
    match service.login(&req.email, &req.password).await {
        Ok(token) => HttpResponse::Ok().json(LoginResponse {
            success: true,
            message: "login ok".to_string(),
            token,
        }),
        Err(e) => failure(e),
    }
}

pub async fn logout(
    service: web::Data<MemberService>,
    req: web::Json<TokenRequest>,
) -> HttpResponse {
    match service.logout(&req.token).await {
        Ok(()) => HttpResponse::Ok().json(RpcAck::ok("logged out")),
        Err(e) => failure(e),
    }
}

pub async fn force_logout(
    service: web::Data<MemberService>,
    req: web::Json<ForceLogoutRequest>,
) -> HttpResponse {
    match service.force_logout(&req.member_id).await {
        Ok(()) => HttpResponse::Ok().json(RpcAck::ok("logged out")),
        Err(e) => failure(e),
    }
}

pub async fn check_session(
    service: web::Data<MemberService>,
    req: web::Json<TokenRequest>,
) -> HttpResponse {
    match service.check_session(&req.token).await {
        Ok(expired) => {
            debug!("check_session -> expired={expired}");
            HttpResponse::Ok().json(CheckSessionResponse {
                success: true,
                expired,
            })
        }
        Err(e) => failure(e),
    }
}

pub async fn reconnect(
    service: web::Data<MemberService>,
    req: web::Json<TokenRequest>,
) -> HttpResponse {
    match service.reconnect(&req.token).await {
        Ok(()) => HttpResponse::Ok().json(RpcAck::ok("session extended")),
        Err(e) => failure(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct FindQuery {
    pub email: String,
}

pub async fn find_member(
    service: web::Data<MemberService>,
    query: web::Query<FindQuery>,
) -> HttpResponse {
    match service.find_member(&query.email).await {
        Ok(member) => HttpResponse::Ok().json(FindMemberResponse {
            success: true,
            member,
        }),
        Err(e) => failure(e),
    }
}
