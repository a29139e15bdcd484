//! Token authentication middleware.
//!
//! Extracts the bearer token from the `auth` query parameter or the
//! `auth_token` cookie, verifies it, and attaches the claims to the
//! request extensions. Missing or invalid tokens answer 401 without
//! ever invoking downstream.

use std::future::{ready, Ready};
use std::rc::Rc;

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpMessage, HttpResponse};
use futures_util::future::LocalBoxFuture;
use log::{debug, warn};
use serde_json::json;

use vidra_auth::verify_token;
use vidra_commons::constants::{TOKEN_COOKIE, TOKEN_QUERY_PARAM};
use vidra_commons::{MemberId, Role};

/// Identity attached to authenticated requests.
///
/// Handlers read it from the request extensions; the raw token rides
/// along for relays that need to forward it (logout).
#[derive(Debug, Clone)]
pub struct AuthenticatedMember {
    pub member_id: MemberId,
    pub role: Role,
    pub token: String,
}

/// Middleware factory validating the token on every request.
pub struct TokenAuth {
    jwt_secret: Rc<String>,
}

impl TokenAuth {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: Rc::new(jwt_secret.into()),
        }
    }
}

impl<S> Transform<S, ServiceRequest> for TokenAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse, Error = Error> + 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse;
    type Error = Error;
    type InitError = ();
    type Transform = TokenAuthService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TokenAuthService {
            service: Rc::new(service),
            jwt_secret: self.jwt_secret.clone(),
        }))
    }
}

pub struct TokenAuthService<S> {
    service: Rc<S>,
    jwt_secret: Rc<String>,
}

impl<S> Service<ServiceRequest> for TokenAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse, Error = Error> + 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let jwt_secret = self.jwt_secret.clone();

        Box::pin(async move {
            let token = extract_token(&req);

            let token = match token {
                Some(token) => token,
                None => {
                    debug!("request without token to {}", req.path());
                    return Ok(req.into_response(
                        HttpResponse::Unauthorized().json(json!({ "error": "Missing token" })),
                    ));
                }
            };

            match verify_token(&token, &jwt_secret) {
                Ok(claims) => {
                    req.extensions_mut().insert(AuthenticatedMember {
                        member_id: claims.user_id,
                        role: claims.role,
                        token,
                    });
                    service.call(req).await
                }
                Err(e) => {
                    warn!("token rejected on {}: {e}", req.path());
                    Ok(req.into_response(
                        HttpResponse::Unauthorized().json(json!({ "error": "Invalid token" })),
                    ))
                }
            }
        })
    }
}

fn extract_token(req: &ServiceRequest) -> Option<String> {
    query_param(req.query_string(), TOKEN_QUERY_PARAM)
        .or_else(|| req.cookie(TOKEN_COOKIE).map(|c| c.value().to_string()))
}

fn query_param(query: &str, name: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}
