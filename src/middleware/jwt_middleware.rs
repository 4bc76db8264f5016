/// JWT Authentication Middleware
///
/// Resolves the request's identity and injects the access token claims into
/// request extensions. It never requires authentication itself; handlers
/// decide via `auth::permissions`. Endpoints that work without an identity
/// (login, refresh, registration, activation) are mounted outside it.
///
/// Resolution order:
/// 1. `access` cookie. Valid: authenticated. Invalid: anonymous.
/// 2. `Authorization: Bearer <token>`. Another scheme: anonymous.
///    A malformed bearer header or an invalid token is answered with 401.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{validate_access_token, Claims, ACCESS_COOKIE};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

const BEARER: &str = "Bearer";

pub struct JwtMiddleware {
    jwt_config: JwtSettings,
}

impl JwtMiddleware {
    pub fn new(jwt_config: JwtSettings) -> Self {
        Self { jwt_config }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            jwt_config: self.jwt_config.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    jwt_config: JwtSettings,
}

/// What the `Authorization` header says about the caller
#[derive(Debug, PartialEq, Eq)]
enum BearerHeader {
    Absent,
    Token(String),
    Malformed,
}

fn parse_authorization(header: Option<&str>) -> BearerHeader {
    let Some(header) = header else {
        return BearerHeader::Absent;
    };

    let mut parts = header.split_whitespace();
    match parts.next() {
        Some(scheme) if scheme == BEARER => {}
        _ => return BearerHeader::Absent,
    }

    match (parts.next(), parts.next()) {
        (Some(token), None) => BearerHeader::Token(token.to_string()),
        _ => BearerHeader::Malformed,
    }
}

impl<S> JwtMiddlewareService<S> {
    fn resolve_identity(&self, req: &ServiceRequest) -> Result<Option<Claims>, AppError> {
        let cookie_token = req
            .cookie(ACCESS_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|value| !value.is_empty());

        if let Some(token) = cookie_token {
            return match validate_access_token(&token, &self.jwt_config) {
                Ok(claims) => Ok(Some(claims)),
                Err(e) => {
                    tracing::debug!("Ignoring invalid access cookie: {}", e);
                    Ok(None)
                }
            };
        }

        let header = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok());

        match parse_authorization(header) {
            BearerHeader::Absent => Ok(None),
            BearerHeader::Malformed => {
                tracing::warn!("Malformed bearer authorization header");
                Err(AppError::Auth(AuthError::TokenInvalid))
            }
            BearerHeader::Token(token) => {
                validate_access_token(&token, &self.jwt_config)
                    .map(Some)
                    .map_err(|e| {
                        tracing::warn!("JWT validation failed: {}", e);
                        AppError::Auth(AuthError::TokenInvalid)
                    })
            }
        }
    }
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let claims = match self.resolve_identity(&req) {
            Ok(claims) => claims,
            Err(error) => {
                // answered here so outer middleware still decorates the 401
                let res = req.error_response(error).map_into_right_body();
                return Box::pin(async move { Ok(res) });
            }
        };

        if let Some(claims) = claims {
            tracing::debug!(user_id = %claims.sub, "JWT validated successfully");
            req.extensions_mut().insert(claims);
        }

        let service = self.service.clone();
        Box::pin(async move {
            service
                .call(req)
                .await
                .map(ServiceResponse::map_into_left_body)
        })
    }
}
