/// Refresh token bookkeeping
///
/// Every refresh token handed out is recorded as an *outstanding* token,
/// keyed by its `jti`. Blacklisting a token adds a row pointing at its
/// outstanding record. Only the SHA-256 hash of the token itself is stored.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::error::{AppError, AuthError};

/// Hash a refresh token using SHA-256
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Outstanding token row together with its blacklist status
#[derive(Debug, sqlx::FromRow)]
pub struct OutstandingToken {
    pub id: i64,
    pub user_id: i64,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub blacklisted: bool,
}

/// Rows removed by one cleanup run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeReport {
    pub outstanding: u64,
    pub blacklisted: u64,
}

/// Record a newly issued refresh token
pub async fn record_outstanding(
    pool: &PgPool,
    user_id: i64,
    token: &str,
    claims: &Claims,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO outstanding_tokens (jti, user_id, token_hash, created_at, expires_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(claims.token_id()?)
    .bind(user_id)
    .bind(hash_token(token))
    .bind(claims.issued_at())
    .bind(claims.expires_at())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_outstanding(
    pool: &PgPool,
    jti: Uuid,
) -> Result<Option<OutstandingToken>, AppError> {
    let token = sqlx::query_as::<_, OutstandingToken>(
        r#"
        SELECT o.id, o.user_id, o.token_hash, o.expires_at,
               (b.id IS NOT NULL) AS blacklisted
        FROM outstanding_tokens o
        LEFT JOIN blacklisted_tokens b ON b.token_id = o.id
        WHERE o.jti = $1
        "#,
    )
    .bind(jti)
    .fetch_optional(pool)
    .await?;

    Ok(token)
}

/// Check a signature-valid refresh token against the outstanding table:
/// it must have been issued by us, match the stored hash, belong to the
/// claimed user and not be blacklisted.
pub async fn ensure_usable(pool: &PgPool, token: &str, claims: &Claims) -> Result<(), AppError> {
    let outstanding = find_outstanding(pool, claims.token_id()?).await?.ok_or_else(|| {
        tracing::warn!(jti = %claims.jti, "Refresh token is not outstanding");
        AppError::Auth(AuthError::TokenInvalid)
    })?;

    if outstanding.token_hash != hash_token(token) || outstanding.user_id != claims.user_id()? {
        tracing::warn!(jti = %claims.jti, "Refresh token does not match its outstanding record");
        return Err(AppError::Auth(AuthError::TokenInvalid));
    }

    if outstanding.blacklisted {
        tracing::warn!(
            user_id = outstanding.user_id,
            jti = %claims.jti,
            "Attempt to use blacklisted refresh token"
        );
        return Err(AppError::Auth(AuthError::TokenBlacklisted));
    }

    Ok(())
}

/// Blacklist a refresh token.
///
/// The insert is conditional on the token not being blacklisted yet, so of
/// two concurrent callers presenting the same token exactly one succeeds;
/// the other gets `TokenBlacklisted`.
pub async fn blacklist(pool: &PgPool, claims: &Claims) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"
        INSERT INTO blacklisted_tokens (token_id, blacklisted_at)
        SELECT id, $2 FROM outstanding_tokens WHERE jti = $1
        ON CONFLICT (token_id) DO NOTHING
        "#,
    )
    .bind(claims.token_id()?)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::Auth(AuthError::TokenBlacklisted));
    }

    tracing::info!(user_id = %claims.sub, jti = %claims.jti, "Refresh token blacklisted");
    Ok(())
}

/// Delete outstanding tokens that expired before `now`, together with their
/// blacklist entries, in one transaction.
pub async fn purge_expired(pool: &PgPool, now: DateTime<Utc>) -> Result<PurgeReport, AppError> {
    let mut transaction: Transaction<'_, Postgres> = pool.begin().await?;

    let blacklisted = sqlx::query(
        r#"
        DELETE FROM blacklisted_tokens
        WHERE token_id IN (SELECT id FROM outstanding_tokens WHERE expires_at < $1)
        "#,
    )
    .bind(now)
    .execute(&mut transaction)
    .await?
    .rows_affected();

    let outstanding = sqlx::query("DELETE FROM outstanding_tokens WHERE expires_at < $1")
        .bind(now)
        .execute(&mut transaction)
        .await?
        .rows_affected();

    transaction.commit().await?;

    Ok(PurgeReport {
        outstanding,
        blacklisted,
    })
}
