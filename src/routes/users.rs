/// Account routes
///
/// Registration and management of the requesting user's own account.
/// Any change to the account ends the current session: the refresh cookie's
/// token is blacklisted and both token cookies are cleared.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;

use crate::audit::{AuditAction, AuditLog};
use crate::auth::{
    clear_token_cookies, hash_password_async, refresh_cookie, require_user, session, Claims,
};
use crate::configuration::{ApplicationSettings, CookieSettings, JwtSettings};
use crate::email_client::EmailClient;
use crate::error::{AppError, ErrorContext};
use crate::models::{User, UserResponse};
use crate::validators::{is_valid_email, is_valid_fullname, is_valid_username, require};
use crate::verification_token::VerificationToken;

/// Body of `POST /users`, `PUT /users` and `PATCH /users`.
/// Every field is optional at the serde level so a missing field can be
/// reported by name.
#[derive(Deserialize, Default)]
pub struct UserRequest {
    pub username: Option<String>,
    pub fullname: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Validated field values; `None` means "keep the current value"
struct UserChanges {
    username: Option<String>,
    fullname: Option<String>,
    email: Option<String>,
    password_hash: Option<String>,
}

impl UserRequest {
    async fn validate(self, partial: bool) -> Result<UserChanges, AppError> {
        let (username, fullname, email, password) = if partial {
            (self.username, self.fullname, self.email, self.password)
        } else {
            (
                Some(require(self.username, "username")?),
                Some(require(self.fullname, "fullname")?),
                Some(require(self.email, "email")?),
                Some(require(self.password, "password")?),
            )
        };

        let username = username.as_deref().map(is_valid_username).transpose()?;
        let fullname = fullname.as_deref().map(is_valid_fullname).transpose()?;
        let email = email.as_deref().map(is_valid_email).transpose()?;
        let password_hash = match password {
            Some(password) => Some(hash_password_async(password).await?),
            None => None,
        };

        Ok(UserChanges {
            username,
            fullname,
            email,
            password_hash,
        })
    }
}

/// POST /api/v1/accounts/users
///
/// # Errors
/// - 400: Missing or invalid field (the response names the field)
/// - 409: Username already taken
pub async fn register(
    form: web::Json<UserRequest>,
    pool: web::Data<PgPool>,
    app_settings: web::Data<ApplicationSettings>,
    email_client: web::Data<EmailClient>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");

    let changes = form.into_inner().validate(false).await?;
    let (Some(username), Some(fullname), Some(email), Some(password_hash)) = (
        changes.username,
        changes.fullname,
        changes.email,
        changes.password_hash,
    ) else {
        return Err(AppError::Internal("validated registration is incomplete".to_string()));
    };

    let is_active = !app_settings.require_email_verification;
    let now = Utc::now();

    let mut transaction = pool.begin().await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, fullname, email, password_hash, is_active, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        RETURNING id, username, fullname, email, password_hash, is_active
        "#,
    )
    .bind(&username)
    .bind(&fullname)
    .bind(&email)
    .bind(&password_hash)
    .bind(is_active)
    .bind(now)
    .fetch_one(&mut transaction)
    .await
    .map_err(|e| {
        let err = AppError::from(e);
        context.log_error(&err);
        err
    })?;

    let verification = if app_settings.require_email_verification {
        let token = VerificationToken::new(user.id);
        token.store(&mut transaction).await?;
        Some(token)
    } else {
        None
    };

    transaction.commit().await?;

    if let Some(token) = verification {
        let link = token.activation_link(&app_settings.base_url);
        let email_client = email_client.get_ref().clone();
        let recipient = user.email.clone();
        let name = user.username.clone();
        let user_id = user.id;

        actix_web::rt::spawn(async move {
            if let Err(e) = email_client
                .send_verification_email(&recipient, &name, &link)
                .await
            {
                tracing::error!(user_id = user_id, error = %e, "Failed to send verification email");
            }
        });
    }

    AuditLog::success(AuditAction::Register, "User registered")
        .with_user_id(user.id)
        .with_username(&user.username)
        .log();

    tracing::info!(
        request_id = %context.request_id,
        user_id = user.id,
        "User registered successfully"
    );

    Ok(HttpResponse::Created().json(UserResponse::from(&user)))
}

/// GET /api/v1/accounts/users
pub async fn get_user(
    claims: Option<web::ReqData<Claims>>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user = require_user(pool.get_ref(), claims).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(&user)))
}

/// PUT /api/v1/accounts/users
pub async fn replace_user(
    req: HttpRequest,
    claims: Option<web::ReqData<Claims>>,
    form: web::Json<UserRequest>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
    cookie_settings: web::Data<CookieSettings>,
) -> Result<HttpResponse, AppError> {
    update_user(req, claims, form.into_inner(), false, pool, jwt_config, cookie_settings).await
}

/// PATCH /api/v1/accounts/users
pub async fn patch_user(
    req: HttpRequest,
    claims: Option<web::ReqData<Claims>>,
    form: web::Json<UserRequest>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
    cookie_settings: web::Data<CookieSettings>,
) -> Result<HttpResponse, AppError> {
    update_user(req, claims, form.into_inner(), true, pool, jwt_config, cookie_settings).await
}

async fn update_user(
    req: HttpRequest,
    claims: Option<web::ReqData<Claims>>,
    form: UserRequest,
    partial: bool,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
    cookie_settings: web::Data<CookieSettings>,
) -> Result<HttpResponse, AppError> {
    let user = require_user(pool.get_ref(), claims).await?;
    let context = ErrorContext::new("user_update").with_user_id(user.id);

    let changes = form.validate(partial).await?;

    let updated = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET username = COALESCE($1, username),
            fullname = COALESCE($2, fullname),
            email = COALESCE($3, email),
            password_hash = COALESCE($4, password_hash),
            updated_at = $5
        WHERE id = $6
        RETURNING id, username, fullname, email, password_hash, is_active
        "#,
    )
    .bind(changes.username)
    .bind(changes.fullname)
    .bind(changes.email)
    .bind(changes.password_hash)
    .bind(Utc::now())
    .bind(user.id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        let err = AppError::from(e);
        context.log_error(&err);
        err
    })?;

    session::revoke_quietly(pool.get_ref(), refresh_cookie(&req).as_deref(), jwt_config.get_ref())
        .await;

    AuditLog::success(AuditAction::ProfileUpdate, "Profile updated; session ended")
        .with_user_id(updated.id)
        .log();

    let mut response = HttpResponse::Ok();
    clear_token_cookies(&mut response, cookie_settings.get_ref());
    Ok(response.json(UserResponse::from(&updated)))
}

/// DELETE /api/v1/accounts/users
///
/// Posts, comments and issued tokens go with the account.
pub async fn delete_user(
    req: HttpRequest,
    claims: Option<web::ReqData<Claims>>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
    cookie_settings: web::Data<CookieSettings>,
) -> Result<HttpResponse, AppError> {
    let user = require_user(pool.get_ref(), claims).await?;

    // before the delete cascades the outstanding token away
    session::revoke_quietly(pool.get_ref(), refresh_cookie(&req).as_deref(), jwt_config.get_ref())
        .await;

    let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user.id)
        .execute(pool.get_ref())
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(AppError::not_found("user"));
    }

    AuditLog::success(AuditAction::AccountDelete, "Account deleted")
        .with_user_id(user.id)
        .with_username(&user.username)
        .log();

    let mut response = HttpResponse::NoContent();
    clear_token_cookies(&mut response, cookie_settings.get_ref());
    Ok(response.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    fn full_request() -> UserRequest {
        UserRequest {
            username: Some("alice".to_string()),
            fullname: Some("Alice".to_string()),
            email: Some("alice@example.com".to_string()),
            password: Some("ValidPassword123".to_string()),
        }
    }

    #[tokio::test]
    async fn test_full_update_requires_every_field() {
        let request = UserRequest {
            fullname: None,
            ..full_request()
        };

        match request.validate(false).await {
            Err(AppError::Validation(ValidationError::MissingField(field))) => {
                assert_eq!(field, "fullname")
            }
            _ => panic!("Expected missing fullname"),
        }
    }

    #[tokio::test]
    async fn test_partial_update_keeps_missing_fields() {
        let request = UserRequest {
            fullname: Some("Al".to_string()),
            ..Default::default()
        };

        let changes = request.validate(true).await.unwrap();
        assert_eq!(changes.fullname.as_deref(), Some("Al"));
        assert!(changes.username.is_none());
        assert!(changes.email.is_none());
        assert!(changes.password_hash.is_none());
    }

    #[tokio::test]
    async fn test_password_is_hashed() {
        let changes = full_request().validate(false).await.unwrap();
        let hash = changes.password_hash.unwrap();

        assert_ne!(hash, "ValidPassword123");
        assert!(hash.starts_with("$2"));
    }

    #[tokio::test]
    async fn test_invalid_username_is_rejected() {
        let request = UserRequest {
            username: Some("no spaces allowed".to_string()),
            ..full_request()
        };

        assert!(matches!(
            request.validate(false).await,
            Err(AppError::Validation(_))
        ));
    }
}
