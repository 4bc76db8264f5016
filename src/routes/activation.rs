use actix_web::{web, HttpResponse};
use sqlx::PgPool;

use crate::audit::{AuditAction, AuditLog};
use crate::error::AppError;
use crate::routes::auth::DetailResponse;
use crate::verification_token::{self, decode_uid};

/// GET /api/v1/accounts/activate/{uidb64}/{token}
///
/// # Errors
/// - 404: uid does not decode or names no user
/// - 400: token is wrong, expired or already used
pub async fn activate(
    path: web::Path<(String, String)>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let (uidb64, token) = path.into_inner();
    let user_id = decode_uid(&uidb64).ok_or_else(|| AppError::not_found("user"))?;

    let username = sqlx::query_scalar::<_, String>("SELECT username FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;

    let mut transaction = pool.begin().await?;

    if let Err(e) = verification_token::consume(&mut transaction, user_id, &token).await {
        AuditLog::failure(AuditAction::Activation, "Invalid verification token")
            .with_user_id(user_id)
            .log();
        return Err(e);
    }

    sqlx::query("UPDATE users SET is_active = TRUE, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .execute(&mut transaction)
        .await?;

    transaction.commit().await?;

    AuditLog::success(AuditAction::Activation, "Email verified")
        .with_user_id(user_id)
        .with_username(&username)
        .log();

    Ok(HttpResponse::Ok().json(DetailResponse::new(format!(
        "{} email verification completed.",
        username
    ))))
}
