/// Request permissions
///
/// The middleware only attaches claims; these helpers turn them into a user
/// and decide whether that user may act on a resource.

use actix_web::web;
use sqlx::PgPool;

use crate::auth::claims::Claims;
use crate::error::{AppError, AuthError};
use crate::models::User;

pub fn require_authenticated(claims: Option<web::ReqData<Claims>>) -> Result<Claims, AppError> {
    claims
        .map(|claims| claims.into_inner())
        .ok_or(AppError::Auth(AuthError::NotAuthenticated))
}

/// Resolve the request's claims to an active user.
/// Deleted and inactive users are treated as unauthenticated.
pub async fn require_user(
    pool: &PgPool,
    claims: Option<web::ReqData<Claims>>,
) -> Result<User, AppError> {
    let claims = require_authenticated(claims)?;
    let user_id = claims
        .user_id()
        .map_err(|_| AppError::Auth(AuthError::NotAuthenticated))?;

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, fullname, email, password_hash, is_active
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    match user {
        Some(user) if user.is_active => Ok(user),
        _ => {
            tracing::warn!(user_id = user_id, "Access token for missing or inactive user");
            Err(AppError::Auth(AuthError::NotAuthenticated))
        }
    }
}

pub fn ensure_owner(owner_id: i64, user: &User) -> Result<(), AppError> {
    if owner_id != user.id {
        tracing::warn!(user_id = user.id, owner_id = owner_id, "Permission denied");
        return Err(AppError::Auth(AuthError::PermissionDenied));
    }
    Ok(())
}
