/// Session Routes
///
/// Login, refresh-token rotation and logout. Tokens travel only in the
/// HttpOnly `access`/`refresh` cookies; bodies just say `{"detail": "success"}`.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::audit::{AuditAction, AuditLog};
use crate::auth::{
    clear_token_cookies, refresh_cookie, require_user, session, set_token_cookies,
    verify_password_async, Claims,
};
use crate::configuration::{CookieSettings, JwtSettings};
use crate::error::{AppError, AuthError, ErrorContext};
use crate::models::User;
use crate::validators::require;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct DetailResponse {
    pub detail: String,
}

impl DetailResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }

    fn success() -> Self {
        Self::new("success")
    }
}

/// POST /api/v1/accounts/login
///
/// # Errors
/// - 400: username or password missing
/// - 401: Unknown username, wrong password or inactive account. All three
///   get the same response so accounts cannot be enumerated.
pub async fn login(
    form: web::Json<LoginRequest>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
    cookie_settings: web::Data<CookieSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");
    let form = form.into_inner();
    let username = require(form.username, "username")?;
    let password = require(form.password, "password")?;

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, fullname, email, password_hash, is_active
        FROM users
        WHERE username = $1
        "#,
    )
    .bind(&username)
    .fetch_optional(pool.get_ref())
    .await?;

    let password_valid =
        verify_password_async(password, user.as_ref().map(|u| u.password_hash.clone())).await?;

    let user = match user {
        Some(user) if password_valid && user.is_active => user,
        _ => {
            AuditLog::failure(AuditAction::Login, "Rejected credentials")
                .with_username(&username)
                .log();
            return Err(AppError::Auth(AuthError::NoActiveAccount));
        }
    };

    let pair = session::issue(pool.get_ref(), user.id, jwt_config.get_ref()).await?;

    AuditLog::success(AuditAction::Login, "User logged in")
        .with_user_id(user.id)
        .with_username(&user.username)
        .log();

    tracing::info!(
        request_id = %context.request_id,
        user_id = user.id,
        "User logged in successfully"
    );

    let mut response = HttpResponse::Ok();
    set_token_cookies(&mut response, &pair, cookie_settings.get_ref());
    Ok(response.json(DetailResponse::success()))
}

/// POST /api/v1/accounts/refresh
///
/// Refresh-token rotation: the presented token is blacklisted and a new
/// pair replaces both cookies. Replaying a rotated token fails.
///
/// # Errors
/// - 401: Cookie missing, token invalid/expired/unknown/blacklisted, or the
///   owner is no longer active
pub async fn refresh(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
    cookie_settings: web::Data<CookieSettings>,
) -> Result<HttpResponse, AppError> {
    let refresh_token =
        refresh_cookie(&req).ok_or(AppError::Auth(AuthError::MissingRefreshToken))?;

    let pair = match session::rotate(pool.get_ref(), &refresh_token, jwt_config.get_ref()).await {
        Ok(pair) => pair,
        Err(e) => {
            AuditLog::failure(AuditAction::TokenRefresh, e.to_string()).log();
            return Err(e);
        }
    };

    AuditLog::success(AuditAction::TokenRefresh, "Refresh token rotated")
        .with_user_id(pair.refresh.claims.user_id()?)
        .log();

    let mut response = HttpResponse::Ok();
    set_token_cookies(&mut response, &pair, cookie_settings.get_ref());
    Ok(response.json(DetailResponse::success()))
}

/// POST /api/v1/accounts/logout
///
/// # Errors
/// - 401: Not logged in, or the refresh cookie is missing or unusable
pub async fn logout(
    req: HttpRequest,
    claims: Option<web::ReqData<Claims>>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
    cookie_settings: web::Data<CookieSettings>,
) -> Result<HttpResponse, AppError> {
    let user = require_user(pool.get_ref(), claims).await?;
    let refresh_token =
        refresh_cookie(&req).ok_or(AppError::Auth(AuthError::MissingRefreshToken))?;

    let token_owner = session::revoke(pool.get_ref(), &refresh_token, jwt_config.get_ref()).await?;
    if token_owner != user.id {
        tracing::warn!(
            user_id = user.id,
            token_owner = token_owner,
            "Logout presented another user's refresh token"
        );
    }

    AuditLog::success(AuditAction::Logout, "User logged out")
        .with_user_id(user.id)
        .log();

    let mut response = HttpResponse::Ok();
    clear_token_cookies(&mut response, cookie_settings.get_ref());
    Ok(response.json(DetailResponse::success()))
}
