//! Signed-cookie sessions, one-shot flash messages and the sign-in guard.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use sha2::{Digest, Sha512};
use tracing::warn;

use super::HttpState;

pub const SESSION_COOKIE: &str = "rxlens_session";
pub const FLASH_COOKIE: &str = "rxlens_flash";
pub const LOGIN_PATH: &str = "/login";

/// The signed-in user, available to guarded handlers as an extension.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
}

/// Derive the cookie signing key from the configured secret.
pub fn session_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

fn cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn start_session(jar: SignedCookieJar, user_id: i64) -> SignedCookieJar {
    jar.add(cookie(SESSION_COOKIE, user_id.to_string()))
}

pub fn end_session(jar: SignedCookieJar) -> SignedCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

pub fn set_flash(jar: SignedCookieJar, message: impl Into<String>) -> SignedCookieJar {
    jar.add(cookie(FLASH_COOKIE, message.into()))
}

/// Read and clear the pending flash message.
pub fn take_flash(jar: SignedCookieJar) -> (SignedCookieJar, Option<String>) {
    match jar.get(FLASH_COOKIE) {
        Some(flash) => {
            let message = flash.value().to_string();
            (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), Some(message))
        }
        None => (jar, None),
    }
}

fn session_user_id(jar: &SignedCookieJar) -> Option<i64> {
    jar.get(SESSION_COOKIE)?.value().parse().ok()
}

/// Redirect to the login page unless the request carries a valid session.
pub async fn require_session(
    State(state): State<HttpState>,
    jar: SignedCookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(user_id) = session_user_id(&jar) else {
        return Redirect::to(LOGIN_PATH).into_response();
    };

    let user = match state.auth.find_user(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!(
                target = "rxlens::http::session",
                user_id, "session refers to a missing user"
            );
            return (end_session(jar), Redirect::to(LOGIN_PATH)).into_response();
        }
        Err(err) => {
            warn!(
                target = "rxlens::http::session",
                user_id,
                error = %err,
                "failed to load session user"
            );
            return Redirect::to(LOGIN_PATH).into_response();
        }
    };

    let current = CurrentUser {
        id: user.id,
        username: user.username,
    };
    request.extensions_mut().insert(current.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(current);
    response
}
