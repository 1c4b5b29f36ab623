use actix_web::{HttpRequest, HttpResponse, http::header, web};
use serde::Deserialize;
use tracing::{info, warn};
use utoipa::IntoParams;

use crate::{
    auth::auth::AuthUser,
    config::Config,
    db::Store,
    error::AppResult,
    model::account::Account,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct VerifyEmailQuery {
    /// Token sent at registration
    pub token: Option<String>,
    /// Front-end origin for the login link
    pub origin: Option<String>,
}

/// List accounts (Admin)
#[utoipa::path(
    get,
    path = "/accounts",
    responses(
        (status = 200, description = "All accounts", body = [Account]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Account"
)]
pub async fn list_accounts(auth: AuthUser, store: web::Data<Store>) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let accounts = store.list_accounts().await?;
    Ok(HttpResponse::Ok().json(accounts))
}

/// Verify email
///
/// Marks the account verified and active, then renders a confirmation page.
#[utoipa::path(
    get,
    path = "/accounts/verify-email",
    params(VerifyEmailQuery),
    responses(
        (status = 200, description = "Verification page", content_type = "text/html"),
        (status = 400, description = "Missing or unknown token")
    ),
    tag = "Account"
)]
pub async fn verify_email(
    query: web::Query<VerifyEmailQuery>,
    store: web::Data<Store>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    let Some(token) = query.token.as_deref().filter(|t| !t.is_empty()) else {
        return Ok(HttpResponse::BadRequest().body("Token is required"));
    };

    if !store.verify_email(token).await? {
        warn!("Email verification failed: unknown token");
        return Ok(HttpResponse::BadRequest().body("Verification failed: invalid token"));
    }

    info!("Email verified");
    let origin = query.origin.as_deref().unwrap_or(&config.app_origin);
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(verification_page(origin)))
}

/// Legacy verification link, forwarded with its query string intact.
pub async fn redirect_verify_email(req: HttpRequest) -> HttpResponse {
    let location = format!("/accounts/verify-email?{}", req.query_string());
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn verification_page(origin: &str) -> String {
    let login = escape_html(&format!("{}/account/login", origin.trim_end_matches('/')));
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Email Verification</title>
    <style>
        body {{ font-family: Arial, sans-serif; text-align: center; padding: 40px; line-height: 1.6; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 20px; border: 1px solid #ddd; border-radius: 5px; }}
        .btn {{ display: inline-block; background-color: #4CAF50; color: white; padding: 10px 20px; text-decoration: none; border-radius: 4px; margin-top: 20px; }}
    </style>
</head>
<body>
    <div class="container">
        <h2>Email verification successful!</h2>
        <p>Your email has been verified successfully. You can now log in to your account.</p>
        <a href="{login}" class="btn">Proceed to Login</a>
    </div>
</body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, http::StatusCode, test};

    #[::core::prelude::v1::test]
    fn login_link_is_escaped() {
        let page = verification_page("http://x.io/\"><script>");
        assert!(page.contains("http://x.io/&quot;&gt;&lt;script&gt;/account/login"));
        assert!(!page.contains("<script>"));
    }

    #[actix_web::test]
    async fn legacy_link_redirects_with_query() {
        let app = test::init_service(
            App::new().route("/account/verify-email", web::get().to(redirect_verify_email)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/account/verify-email?token=abc&origin=http%3A%2F%2Fui")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/accounts/verify-email?token=abc&origin=http%3A%2F%2Fui"
        );
    }
}
