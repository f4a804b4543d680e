//! Auth cookie construction
//!
//! Both cookies are `HttpOnly`, `SameSite=Strict` and scoped to `/`. Their
//! Max-Age matches the lifetime of the token they carry.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use gatehouse_core::{
    ACCESS_TOKEN_COOKIE, ACCESS_TOKEN_TTL_SECS, REFRESH_TOKEN_COOKIE, REFRESH_TOKEN_TTL_SECS,
};

use super::tokens::TokenPair;

fn auth_cookie(name: &'static str, value: String, max_age_secs: u64, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .max_age(time::Duration::seconds(max_age_secs as i64))
        .build()
}

/// Add both token cookies to `jar`
pub fn set_auth_cookies(jar: CookieJar, pair: &TokenPair, secure: bool) -> CookieJar {
    jar.add(auth_cookie(
        ACCESS_TOKEN_COOKIE,
        pair.access_token.clone(),
        ACCESS_TOKEN_TTL_SECS,
        secure,
    ))
    .add(auth_cookie(
        REFRESH_TOKEN_COOKIE,
        pair.refresh_token.clone(),
        REFRESH_TOKEN_TTL_SECS,
        secure,
    ))
}

/// Expire both token cookies, whether or not the request carried them
pub fn clear_auth_cookies(jar: CookieJar) -> CookieJar {
    [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE]
        .into_iter()
        .fold(jar, |jar, name| {
            let mut cookie = Cookie::build((name, "")).path("/").build();
            cookie.make_removal();
            jar.add(cookie)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::RefreshTokenRecord;
    use uuid::Uuid;

    fn pair() -> TokenPair {
        TokenPair {
            access_token: "a.b.c".to_string(),
            refresh_token: "d.e.f".to_string(),
            record: RefreshTokenRecord::new(Uuid::new_v4()),
        }
    }

    #[test]
    fn test_auth_cookie_attributes() {
        let jar = set_auth_cookies(CookieJar::new(), &pair(), false);

        let access = jar.get(ACCESS_TOKEN_COOKIE).unwrap();
        assert_eq!(access.value(), "a.b.c");
        assert_eq!(access.http_only(), Some(true));
        assert_eq!(access.same_site(), Some(SameSite::Strict));
        assert_eq!(access.max_age(), Some(time::Duration::seconds(3600)));
        assert_eq!(access.path(), Some("/"));

        let refresh = jar.get(REFRESH_TOKEN_COOKIE).unwrap();
        assert_eq!(refresh.value(), "d.e.f");
        assert_eq!(refresh.max_age(), Some(time::Duration::seconds(31_536_000)));
    }

    #[test]
    fn test_secure_flag() {
        let jar = set_auth_cookies(CookieJar::new(), &pair(), true);
        assert_eq!(jar.get(ACCESS_TOKEN_COOKIE).unwrap().secure(), Some(true));
    }

    #[test]
    fn test_clear_auth_cookies() {
        let jar = clear_auth_cookies(set_auth_cookies(CookieJar::new(), &pair(), false));

        for name in [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE] {
            let cookie = jar.get(name).unwrap();
            assert_eq!(cookie.value(), "");
            assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
        }
    }
}
