use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web::Data,
};
use serde_json::json;
use tracing::debug;

use crate::{
    auth::{
        auth::AuthUser,
        jwt::{TokenType, verify_token},
    },
    config::Config,
};

fn reject(req: ServiceRequest, message: &str) -> Result<ServiceResponse<BoxBody>, Error> {
    debug!(path = %req.path(), reason = message, "Request rejected by auth");
    let resp = HttpResponse::Unauthorized().json(json!({ "message": message }));
    Ok(req.into_response(resp.map_into_boxed_body()))
}

/// Reads the bearer access token if present.
pub fn bearer_token(req: &actix_web::HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?
        .clone();

    let verified = bearer_token(req.request()).map(|token| verify_token(token, &config.jwt_secret));

    let claims = match verified {
        Some(Ok(claims)) => claims,
        Some(Err(_)) => return reject(req, "Invalid or expired token"),
        None => return reject(req, "Missing Authorization header"),
    };

    if claims.token_type != TokenType::Access {
        return reject(req, "Access token required");
    }

    req.extensions_mut().insert(AuthUser {
        account_id: claims.account_id,
        email: claims.sub,
        role: claims.role,
    });

    next.call(req).await
}
