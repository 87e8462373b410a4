//! Moving cookies between HTTP headers and a [`CookieJar`].

use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use cookie::{Cookie, CookieJar};

/// Load every request cookie as an original, so only cookies added later
/// show up in the jar's delta.
pub fn jar_from_headers(headers: &HeaderMap) -> CookieJar {
    let mut jar = CookieJar::new();
    for value in headers.get_all(header::COOKIE) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        for cookie in Cookie::split_parse(value).flatten() {
            jar.add_original(cookie.into_owned());
        }
    }
    jar
}

/// Attach a `Set-Cookie` header for every cookie added to `jar`.
pub fn with_cookies(jar: &CookieJar, response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    for cookie in jar.delta() {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(cookie = cookie.name(), error = %e, "Dropped unencodable cookie"),
        }
    }
    response
}
