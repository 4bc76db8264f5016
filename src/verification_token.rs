use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, ValidationError};

const TOKEN_LIFETIME_HOURS: i64 = 24;

/// One-time email verification token for a new account
#[derive(Clone, Debug)]
pub struct VerificationToken {
    token: String,
    user_id: i64,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl VerificationToken {
    pub fn new(user_id: i64) -> Self {
        let created_at = Utc::now();

        Self {
            token: Uuid::new_v4().to_string(),
            user_id,
            created_at,
            expires_at: created_at + Duration::hours(TOKEN_LIFETIME_HOURS),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// `{base_url}/api/v1/accounts/activate/{uidb64}/{token}`
    pub fn activation_link(&self, base_url: &str) -> String {
        format!(
            "{}/api/v1/accounts/activate/{}/{}",
            base_url.trim_end_matches('/'),
            encode_uid(self.user_id),
            self.token
        )
    }

    /// Stored in the caller's transaction so the account and its token
    /// are written together
    pub async fn store(&self, transaction: &mut Transaction<'_, Postgres>) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO verification_tokens (token, user_id, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&self.token)
        .bind(self.user_id)
        .bind(self.created_at)
        .bind(self.expires_at)
        .execute(&mut *transaction)
        .await?;

        Ok(())
    }
}

/// Consume the token for `user_id` inside the activation transaction.
/// Once that commits the token is gone, so a link works at most once.
pub async fn consume(
    transaction: &mut Transaction<'_, Postgres>,
    user_id: i64,
    token: &str,
) -> Result<(), AppError> {
    let expires_at = sqlx::query_scalar::<_, DateTime<Utc>>(
        "DELETE FROM verification_tokens WHERE token = $1 AND user_id = $2 RETURNING expires_at",
    )
    .bind(token)
    .bind(user_id)
    .fetch_optional(&mut *transaction)
    .await?;

    match expires_at {
        Some(expires_at) if expires_at > Utc::now() => Ok(()),
        _ => Err(AppError::Validation(ValidationError::InvalidFormat(
            "token".to_string(),
        ))),
    }
}

pub async fn purge_expired(pool: &PgPool, now: DateTime<Utc>) -> Result<u64, AppError> {
    let deleted = sqlx::query("DELETE FROM verification_tokens WHERE expires_at < $1")
        .bind(now)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(deleted)
}

/// User id as URL-safe base64 without padding
pub fn encode_uid(user_id: i64) -> String {
    URL_SAFE_NO_PAD.encode(user_id.to_string())
}

pub fn decode_uid(uidb64: &str) -> Option<i64> {
    let bytes = URL_SAFE_NO_PAD.decode(uidb64).ok()?;
    String::from_utf8(bytes).ok()?.parse().ok()
}
