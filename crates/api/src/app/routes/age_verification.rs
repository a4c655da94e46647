//! Age gate consent, kept in a browser cookie rather than on the server.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::json;
use time::{Duration, OffsetDateTime};

use crate::app::dto::AgeVerificationRequest;

pub const CONSENT_COOKIE: &str = "AgeVerificationConsent";
const CONSENT_TTL_DAYS: i64 = 365;

pub fn router() -> Router {
    Router::new().route("/", get(status).post(record).delete(clear))
}

/// `Some(true|false)` once the visitor answered, `None` before that or when
/// the cookie is unreadable.
pub fn consent(jar: &CookieJar) -> Option<bool> {
    jar.get(CONSENT_COOKIE)
        .and_then(|c| c.value().trim().to_ascii_lowercase().parse::<bool>().ok())
}

fn locked_down(cookie: &mut Cookie<'static>) {
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(true);
    cookie.set_same_site(SameSite::Strict);
}

pub fn consent_cookie(verified: bool, now: OffsetDateTime) -> Cookie<'static> {
    let value = if verified { "True" } else { "False" };
    let ttl = Duration::days(CONSENT_TTL_DAYS);
    let mut cookie = Cookie::new(CONSENT_COOKIE, value);
    locked_down(&mut cookie);
    cookie.set_max_age(ttl);
    cookie.set_expires(now + ttl);
    cookie
}

pub fn expired_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::new(CONSENT_COOKIE, "");
    locked_down(&mut cookie);
    cookie.make_removal();
    cookie
}

pub async fn status(jar: CookieJar) -> Response {
    Json(json!({ "verified": consent(&jar) })).into_response()
}

pub async fn record(jar: CookieJar, Json(body): Json<AgeVerificationRequest>) -> Response {
    let jar = jar.add(consent_cookie(body.verified, OffsetDateTime::now_utc()));
    (jar, Json(json!({ "verified": body.verified }))).into_response()
}

pub async fn clear(jar: CookieJar) -> Response {
    (StatusCode::NO_CONTENT, jar.add(expired_cookie())).into_response()
}
