/// Session lifecycle
///
/// - `issue`: sign a new access/refresh pair and record the refresh token
/// - `rotate`: trade a usable refresh token for a new pair, blacklisting it
/// - `revoke`: blacklist a refresh token (logout)
/// - `revoke_quietly`: best-effort revoke used when a profile changes

use sqlx::PgPool;

use crate::auth::jwt::{generate_token_pair, validate_refresh_token, TokenPair};
use crate::auth::token_store;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

pub async fn issue(pool: &PgPool, user_id: i64, config: &JwtSettings) -> Result<TokenPair, AppError> {
    let pair = generate_token_pair(user_id, config)?;
    token_store::record_outstanding(pool, user_id, &pair.refresh.token, &pair.refresh.claims)
        .await?;
    Ok(pair)
}

/// Refresh-token rotation.
///
/// The presented token must validate, be outstanding and not blacklisted,
/// and its owner must still be an active user. It is blacklisted before the
/// new pair is issued, so it can never be used twice.
pub async fn rotate(pool: &PgPool, refresh_token: &str, config: &JwtSettings) -> Result<TokenPair, AppError> {
    let claims = validate_refresh_token(refresh_token, config)?;
    token_store::ensure_usable(pool, refresh_token, &claims).await?;

    let user_id = claims.user_id()?;
    let is_active = sqlx::query_scalar::<_, bool>("SELECT is_active FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    if is_active != Some(true) {
        tracing::warn!(user_id = user_id, "Refresh attempted for missing or inactive user");
        return Err(AppError::Auth(AuthError::TokenInvalid));
    }

    token_store::blacklist(pool, &claims).await?;
    issue(pool, user_id, config).await
}

/// Logout: the token must be valid and usable, then it is blacklisted.
pub async fn revoke(pool: &PgPool, refresh_token: &str, config: &JwtSettings) -> Result<i64, AppError> {
    let claims = validate_refresh_token(refresh_token, config)?;
    token_store::ensure_usable(pool, refresh_token, &claims).await?;
    token_store::blacklist(pool, &claims).await?;
    claims.user_id()
}

/// Forced logout after the account was updated or is about to be deleted.
/// A missing or unusable refresh token is not an error here.
pub async fn revoke_quietly(pool: &PgPool, refresh_token: Option<&str>, config: &JwtSettings) {
    let Some(token) = refresh_token else {
        return;
    };

    if let Err(e) = revoke(pool, token, config).await {
        match e {
            AppError::Auth(_) => {
                tracing::debug!(error = %e, "Refresh cookie was not revocable; clearing only");
            }
            _ => tracing::error!(error = %e, "Failed to blacklist refresh token"),
        }
    }
}
