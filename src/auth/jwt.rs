/// JWT Token Generation and Validation

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::{Claims, TokenType};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

/// A freshly signed token together with the claims it carries
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub claims: Claims,
}

/// Access/refresh pair handed to the client as cookies
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: SignedToken,
    pub refresh: SignedToken,
}

fn sign(claims: Claims, config: &JwtSettings) -> Result<SignedToken, AppError> {
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

    Ok(SignedToken { token, claims })
}

pub fn generate_access_token(user_id: i64, config: &JwtSettings) -> Result<SignedToken, AppError> {
    sign(
        Claims::new(user_id, TokenType::Access, config.access_token_expiry, config.issuer.clone()),
        config,
    )
}

pub fn generate_refresh_token(user_id: i64, config: &JwtSettings) -> Result<SignedToken, AppError> {
    sign(
        Claims::new(user_id, TokenType::Refresh, config.refresh_token_expiry, config.issuer.clone()),
        config,
    )
}

pub fn generate_token_pair(user_id: i64, config: &JwtSettings) -> Result<TokenPair, AppError> {
    Ok(TokenPair {
        access: generate_access_token(user_id, config)?,
        refresh: generate_refresh_token(user_id, config)?,
    })
}

/// Validate signature, expiry and issuer, then check the token is of the
/// expected type so a refresh token cannot be replayed as an access token.
pub fn validate_token(
    token: &str,
    expected: TokenType,
    config: &JwtSettings,
) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);
    validation.leeway = 0;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("JWT validation error: {}", e);
        AppError::Auth(AuthError::TokenInvalid)
    })?;

    if claims.token_type != expected {
        tracing::debug!(
            expected = ?expected,
            actual = ?claims.token_type,
            "JWT presented with wrong token type"
        );
        return Err(AppError::Auth(AuthError::TokenInvalid));
    }

    Ok(claims)
}

pub fn validate_access_token(token: &str, config: &JwtSettings) -> Result<Claims, AppError> {
    validate_token(token, TokenType::Access, config)
}

pub fn validate_refresh_token(token: &str, config: &JwtSettings) -> Result<Claims, AppError> {
    validate_token(token, TokenType::Refresh, config)
}
