//! HTTP surface: HTML pages, JSON endpoints and the session guard.

mod api;
mod auth;
mod middleware;
mod public;
pub mod session;

pub use api::ApiError;

use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    middleware as axum_middleware,
    routing::{get, post},
};
use axum_extra::extract::cookie::Key;

use crate::{
    application::{
        auth::AuthService, export::ExportService, lookup::LookupService, speech::Speaker,
    },
    infra::db::SqliteRepositories,
};

use middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub lookup: LookupService,
    pub export: ExportService,
    pub auth: AuthService,
    pub speaker: Arc<dyn Speaker>,
    pub db: Arc<SqliteRepositories>,
    pub session_key: Key,
}

impl FromRef<HttpState> for Key {
    fn from_ref(state: &HttpState) -> Self {
        state.session_key.clone()
    }
}

pub fn build_router(state: HttpState) -> Router {
    let guarded = Router::new()
        .route("/", get(public::index))
        .route("/get_drug_info", post(api::get_drug_info))
        .route("/get_drug_label", post(api::get_drug_label))
        .route("/speak", post(api::speak))
        .route("/download_results", post(api::download_results))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            session::require_session,
        ));

    let open = Router::new()
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/_health/db", get(public::db_health));

    guarded
        .merge(open)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
