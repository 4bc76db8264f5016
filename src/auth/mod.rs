/// Authentication module
///
/// Handles JWT token generation/validation, password hashing, the
/// outstanding/blacklisted refresh token store, session rotation and the
/// HttpOnly cookies that carry the tokens.

mod claims;
mod cookies;
mod jwt;
mod password;
pub mod permissions;
pub mod session;
pub mod token_store;

pub use claims::{Claims, TokenType};
pub use cookies::{
    clear_token_cookies, refresh_cookie, removal_cookie, set_token_cookies, ACCESS_COOKIE,
    REFRESH_COOKIE,
};
pub use jwt::{
    generate_access_token, generate_refresh_token, generate_token_pair, validate_access_token,
    validate_refresh_token, validate_token, SignedToken, TokenPair,
};
pub use password::{hash_password, hash_password_async, verify_password, verify_password_async};
pub use permissions::{ensure_owner, require_authenticated, require_user};
