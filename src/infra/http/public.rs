use axum::{
    Extension,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sqlx::Error as SqlxError;

use crate::{
    application::error::ErrorReport,
    presentation::views::{IndexTemplate, render_template_response},
};

use super::{HttpState, session::CurrentUser};

pub async fn index(
    State(state): State<HttpState>,
    Extension(user): Extension<CurrentUser>,
) -> Response {
    let template = IndexTemplate {
        username: user.username,
        quote: state.lookup.quotes().pick(),
    };
    render_template_response(template, StatusCode::OK)
}

pub async fn db_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.health_check().await)
}

fn db_health_response(result: Result<(), SqlxError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
