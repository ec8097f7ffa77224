//! Registration, sign-in and sign-out pages.

use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::SignedCookieJar;
use serde::Deserialize;

use crate::{
    application::{auth::AuthError, error::HttpError},
    presentation::views::{LoginTemplate, RegisterTemplate, render_template_response},
};

use super::{
    HttpState,
    session::{LOGIN_PATH, end_session, set_flash, start_session, take_flash},
};

const REGISTER_PATH: &str = "/register";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CredentialsForm {
    username: String,
    password: String,
}

pub async fn register_page(jar: SignedCookieJar) -> Response {
    let (jar, flash) = take_flash(jar);
    (
        jar,
        render_template_response(RegisterTemplate { flash }, StatusCode::OK),
    )
        .into_response()
}

pub async fn register(
    State(state): State<HttpState>,
    jar: SignedCookieJar,
    Form(form): Form<CredentialsForm>,
) -> Response {
    match state.auth.register(&form.username, &form.password).await {
        Ok(_) => Redirect::to(LOGIN_PATH).into_response(),
        Err(err @ (AuthError::UsernameTaken | AuthError::MissingCredentials)) => {
            (set_flash(jar, err.to_string()), Redirect::to(REGISTER_PATH)).into_response()
        }
        Err(err) => HttpError::from_error(
            "infra::http::auth::register",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Registration failed",
            &err,
        )
        .into_response(),
    }
}

pub async fn login_page(jar: SignedCookieJar) -> Response {
    let (jar, flash) = take_flash(jar);
    (
        jar,
        render_template_response(LoginTemplate { flash }, StatusCode::OK),
    )
        .into_response()
}

pub async fn login(
    State(state): State<HttpState>,
    jar: SignedCookieJar,
    Form(form): Form<CredentialsForm>,
) -> Response {
    match state.auth.authenticate(&form.username, &form.password).await {
        Ok(user) => (start_session(jar, user.id), Redirect::to("/")).into_response(),
        Err(err @ AuthError::InvalidCredentials) => {
            (set_flash(jar, err.to_string()), Redirect::to(LOGIN_PATH)).into_response()
        }
        Err(err) => HttpError::from_error(
            "infra::http::auth::login",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Sign-in failed",
            &err,
        )
        .into_response(),
    }
}

pub async fn logout(jar: SignedCookieJar) -> Response {
    (end_session(jar), Redirect::to(LOGIN_PATH)).into_response()
}
