/// HttpOnly cookie handling for the access/refresh token pair

use actix_web::cookie::{time::Duration, Cookie};
use actix_web::{HttpRequest, HttpResponseBuilder};

use crate::auth::jwt::TokenPair;
use crate::configuration::CookieSettings;

pub const ACCESS_COOKIE: &str = "access";
pub const REFRESH_COOKIE: &str = "refresh";

fn build<'c>(name: &'c str, value: String, max_age: i64, settings: &CookieSettings) -> Cookie<'c> {
    Cookie::build(name, value)
        .http_only(true)
        .secure(settings.secure)
        .same_site(settings.same_site.into())
        .path(settings.path.clone())
        .max_age(Duration::seconds(max_age))
        .finish()
}

/// Cookie that instructs the browser to drop `name`
pub fn removal_cookie<'c>(name: &'c str, settings: &CookieSettings) -> Cookie<'c> {
    let mut cookie = build(name, String::new(), 0, settings);
    cookie.make_removal();
    cookie
}

/// Put both tokens on the response; each cookie lives as long as its token
pub fn set_token_cookies(
    builder: &mut HttpResponseBuilder,
    pair: &TokenPair,
    settings: &CookieSettings,
) {
    builder
        .cookie(build(
            ACCESS_COOKIE,
            pair.access.token.clone(),
            pair.access.claims.remaining_lifetime(),
            settings,
        ))
        .cookie(build(
            REFRESH_COOKIE,
            pair.refresh.token.clone(),
            pair.refresh.claims.remaining_lifetime(),
            settings,
        ));
}

pub fn clear_token_cookies(builder: &mut HttpResponseBuilder, settings: &CookieSettings) {
    builder
        .cookie(removal_cookie(ACCESS_COOKIE, settings))
        .cookie(removal_cookie(REFRESH_COOKIE, settings));
}

pub fn refresh_cookie(req: &HttpRequest) -> Option<String> {
    req.cookie(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_token_pair;
    use crate::configuration::{JwtSettings, SameSitePolicy};
    use actix_web::cookie::SameSite;
    use actix_web::HttpResponse;

    fn cookie_settings() -> CookieSettings {
        CookieSettings {
            secure: true,
            same_site: SameSitePolicy::Strict,
            path: "/".to_string(),
        }
    }

    fn jwt_settings() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 259200,
            issuer: "test".to_string(),
        }
    }

    #[test]
    fn test_token_cookies_are_http_only() {
        let pair = generate_token_pair(1, &jwt_settings()).unwrap();
        let mut builder = HttpResponse::Ok();
        set_token_cookies(&mut builder, &pair, &cookie_settings());
        let response = builder.finish();

        let cookies: Vec<Cookie> = response.cookies().collect();
        assert_eq!(cookies.len(), 2);
        for cookie in &cookies {
            assert_eq!(cookie.http_only(), Some(true));
            assert_eq!(cookie.secure(), Some(true));
            assert_eq!(cookie.same_site(), Some(SameSite::Strict));
            assert_eq!(cookie.path(), Some("/"));
        }

        let access = cookies.iter().find(|c| c.name() == ACCESS_COOKIE).unwrap();
        assert_eq!(access.value(), pair.access.token);
        let max_age = access.max_age().unwrap().whole_seconds();
        assert!(max_age > 890 && max_age <= 900);
    }

    #[test]
    fn test_clear_token_cookies_expires_both() {
        let mut builder = HttpResponse::Ok();
        clear_token_cookies(&mut builder, &cookie_settings());
        let response = builder.finish();

        let cookies: Vec<Cookie> = response.cookies().collect();
        assert_eq!(cookies.len(), 2);
        for cookie in cookies {
            assert_eq!(cookie.value(), "");
            assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        }
    }

    #[test]
    fn test_refresh_cookie_extraction() {
        let req = actix_web::test::TestRequest::default()
            .cookie(Cookie::new(REFRESH_COOKIE, "abc"))
            .to_http_request();
        assert_eq!(refresh_cookie(&req), Some("abc".to_string()));

        let empty = actix_web::test::TestRequest::default()
            .cookie(Cookie::new(REFRESH_COOKIE, ""))
            .to_http_request();
        assert_eq!(refresh_cookie(&empty), None);

        let none = actix_web::test::TestRequest::default().to_http_request();
        assert_eq!(refresh_cookie(&none), None);
    }
}
