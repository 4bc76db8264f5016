/// Middleware module
///
/// Request identity (JWT from cookie or bearer header).

mod jwt_middleware;

pub use jwt_middleware::JwtMiddleware;
