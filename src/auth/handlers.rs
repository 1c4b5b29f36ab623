use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{
        jwt::{Claims, TokenType, generate_access_token, generate_refresh_token, verify_token},
        middleware::bearer_token,
        password::{hash_password, verify_password},
    },
    config::Config,
    db::Store,
    error::{AppError, AppResult},
    model::{account::NewAccount, role::Role},
};

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[schema(example = "Mr")]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "John")]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "Doe")]
    pub last_name: String,
    #[validate(email)]
    #[schema(example = "john@company.com", format = "email")]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    #[validate(must_match(other = "password"))]
    pub confirm_password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AuthenticateRequest {
    #[schema(example = "john@company.com", format = "email")]
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

fn signing_failed(e: jsonwebtoken::errors::Error) -> AppError {
    error!(error = %e, "Failed to sign token");
    AppError::Internal
}

/// Issues an access token and a stored refresh token for the account.
async fn issue_tokens(
    store: &Store,
    config: &Config,
    account_id: u64,
    email: &str,
    role: Role,
) -> AppResult<TokenResponse> {
    let access_token = generate_access_token(
        account_id,
        email,
        role,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(signing_failed)?;

    let (refresh_token, refresh_claims) = generate_refresh_token(
        account_id,
        email,
        role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(signing_failed)?;

    debug!(account_id, jti = %refresh_claims.jti, "Storing refresh token");
    store
        .store_refresh_token(account_id, &refresh_claims.jti, refresh_claims.exp as i64)
        .await?;

    Ok(TokenResponse {
        access_token,
        refresh_token,
    })
}

fn refresh_claims(req: &HttpRequest, config: &Config) -> AppResult<Claims> {
    let token =
        bearer_token(req).ok_or_else(|| AppError::Unauthorized("Refresh token required".into()))?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    if claims.token_type != TokenType::Refresh {
        return Err(AppError::Unauthorized("Refresh token required".into()));
    }
    Ok(claims)
}

/// Register account
#[utoipa::path(
    post,
    path = "/accounts/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, email verification pending", body = Object, example = json!({
            "message": "Registration successful, please verify your email"
        })),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Account"
)]
#[instrument(name = "account_register", skip_all, fields(email = %payload.email))]
pub async fn register(
    payload: web::Json<RegisterRequest>,
    store: web::Data<Store>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    payload.validate()?;

    let email = payload.email.trim().to_lowercase();
    if store.find_account_by_email(&email).await?.is_some() {
        info!("Registration refused: email taken");
        return Err(AppError::Conflict(format!(
            "Email \"{email}\" is already registered"
        )));
    }

    let password_hash = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        AppError::Internal
    })?;

    let verification_token = Uuid::new_v4().to_string();
    let (account_id, role) = store
        .register_account(&NewAccount {
            email,
            password_hash,
            title: payload.title.clone(),
            first_name: payload.first_name.trim().to_string(),
            last_name: payload.last_name.trim().to_string(),
            verification_token: verification_token.clone(),
        })
        .await?;

    info!(
        account_id,
        %role,
        verify = %format!(
            "/accounts/verify-email?token={verification_token}&origin={}",
            config.app_origin
        ),
        "Account registered, verification pending"
    );

    Ok(HttpResponse::Created().json(json!({
        "message": "Registration successful, please verify your email"
    })))
}

/// Authenticate
#[utoipa::path(
    post,
    path = "/accounts/authenticate",
    request_body = AuthenticateRequest,
    responses(
        (status = 200, description = "Tokens issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials or unverified account")
    ),
    tag = "Account"
)]
#[instrument(name = "account_authenticate", skip_all, fields(email = %payload.email))]
pub async fn authenticate(
    payload: web::Json<AuthenticateRequest>,
    store: web::Data<Store>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    let invalid = || AppError::Unauthorized("Email or password is incorrect".into());

    let email = payload.email.trim().to_lowercase();
    let account = store.find_account_by_email(&email).await?.ok_or_else(|| {
        info!("Invalid credentials: unknown email");
        invalid()
    })?;

    if let Err(e) = verify_password(&payload.password, &account.password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(invalid());
    }

    if !account.is_verified() {
        return Err(AppError::Unauthorized("Email has not been verified".into()));
    }
    if !account.is_active {
        return Err(AppError::Unauthorized("Account is inactive".into()));
    }

    let tokens = issue_tokens(&store, &config, account.id, &account.email, account.role).await?;

    info!(account_id = account.id, "Login successful");
    Ok(HttpResponse::Ok().json(tokens))
}

/// Exchanges a refresh token for a new token pair, revoking the old one.
pub async fn refresh_token(
    req: HttpRequest,
    store: web::Data<Store>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    let claims = refresh_claims(&req, &config)?;

    match store.find_refresh_token(&claims.jti).await? {
        Some(record) if !record.revoked && record.account_id == claims.account_id => {}
        _ => return Err(AppError::Unauthorized("Invalid or expired token".into())),
    }

    // Two concurrent refreshes of one token: only one revokes it.
    if !store.revoke_refresh_token(&claims.jti).await? {
        return Err(AppError::Unauthorized("Invalid or expired token".into()));
    }

    let tokens = issue_tokens(&store, &config, claims.account_id, &claims.sub, claims.role).await?;

    debug!(account_id = claims.account_id, "Refresh token rotated");
    Ok(HttpResponse::Ok().json(tokens))
}

/// Revokes the presented refresh token. Always answers 204.
pub async fn revoke_token(
    req: HttpRequest,
    store: web::Data<Store>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    let Ok(claims) = refresh_claims(&req, &config) else {
        return Ok(HttpResponse::NoContent().finish());
    };

    if store.revoke_refresh_token(&claims.jti).await? {
        info!(account_id = claims.account_id, "Refresh token revoked");
    }

    Ok(HttpResponse::NoContent().finish())
}
