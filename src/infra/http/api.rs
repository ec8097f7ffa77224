//! JSON endpoints used by the lookup page.

use std::error::Error as StdError;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{
        HeaderValue, StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::{
    application::{
        error::ErrorReport,
        export::{ExportError, XLSX_CONTENT_TYPE},
        lookup::LookupError,
    },
    domain::drug::{CombinedResult, LabelRecord},
};

use super::HttpState;

const NO_DRUG_NAME: &str = "No drug name provided";
const NO_TEXT: &str = "No text provided";

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    error: String,
}

/// JSON error response: `{"error": "..."}` plus an [`ErrorReport`] for the
/// response logger.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    report: ErrorReport,
}

impl ApiError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            status,
            message: message.into(),
            report: ErrorReport::from_message(source, status, detail),
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
        error: &dyn StdError,
    ) -> Self {
        Self {
            status,
            message: message.into(),
            report: ErrorReport::from_error(source, status, error),
        }
    }

    pub fn bad_request(source: &'static str, message: &'static str) -> Self {
        Self::new(source, StatusCode::BAD_REQUEST, message, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.message,
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        const SOURCE: &str = "infra::http::api::lookup_error";
        match &err {
            LookupError::Domain(_) => {
                ApiError::from_error(SOURCE, StatusCode::BAD_REQUEST, "Invalid drug name", &err)
            }
            LookupError::Classification(_) => ApiError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch data from RxClass API",
                &err,
            ),
            LookupError::Label(_) => ApiError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch data from the FDA API",
                &err,
            ),
            LookupError::NotCached { .. } => {
                ApiError::from_error(SOURCE, StatusCode::NOT_FOUND, err.to_string(), &err)
            }
            LookupError::Cache(_) | LookupError::Task(_) => ApiError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                &err,
            ),
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Lookup(inner) => inner.into(),
            other => ApiError::from_error(
                "infra::http::api::export_error",
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to build spreadsheet",
                &other,
            ),
        }
    }
}

fn json_rejection(source: &'static str, rejection: JsonRejection) -> ApiError {
    ApiError::from_error(
        source,
        StatusCode::BAD_REQUEST,
        "Invalid JSON body",
        &rejection,
    )
}

#[derive(Debug, Deserialize)]
pub struct DrugRequest {
    #[serde(default)]
    drug_name: Option<String>,
}

impl DrugRequest {
    fn drug_name(&self, source: &'static str) -> Result<&str, ApiError> {
        self.drug_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request(source, NO_DRUG_NAME))
    }
}

#[derive(Debug, Deserialize)]
pub struct SpeakRequest {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SpeakResponse {
    status: &'static str,
}

pub async fn get_drug_info(
    State(state): State<HttpState>,
    payload: Result<Json<DrugRequest>, JsonRejection>,
) -> Result<Json<CombinedResult>, ApiError> {
    const SOURCE: &str = "infra::http::api::get_drug_info";
    let Json(request) = payload.map_err(|rejection| json_rejection(SOURCE, rejection))?;
    let drug_name = request.drug_name(SOURCE)?;

    let combined = state.lookup.lookup(drug_name).await?;
    Ok(Json(combined))
}

pub async fn get_drug_label(
    State(state): State<HttpState>,
    payload: Result<Json<DrugRequest>, JsonRejection>,
) -> Result<Json<LabelRecord>, ApiError> {
    const SOURCE: &str = "infra::http::api::get_drug_label";
    let Json(request) = payload.map_err(|rejection| json_rejection(SOURCE, rejection))?;
    let drug_name = request.drug_name(SOURCE)?;

    let label = state.lookup.label_only(drug_name).await?;
    Ok(Json(label))
}

pub async fn speak(
    State(state): State<HttpState>,
    payload: Result<Json<SpeakRequest>, JsonRejection>,
) -> Result<Json<SpeakResponse>, ApiError> {
    const SOURCE: &str = "infra::http::api::speak";
    let Json(request) = payload.map_err(|rejection| json_rejection(SOURCE, rejection))?;
    let text = request
        .text
        .as_deref()
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request(SOURCE, NO_TEXT))?;

    state.speaker.speak(text).await.map_err(|err| {
        ApiError::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Speech engine failed",
            &err,
        )
    })?;

    Ok(Json(SpeakResponse { status: "success" }))
}

pub async fn download_results(
    State(state): State<HttpState>,
    payload: Result<Json<DrugRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    const SOURCE: &str = "infra::http::api::download_results";
    let Json(request) = payload.map_err(|rejection| json_rejection(SOURCE, rejection))?;
    let drug_name = request.drug_name(SOURCE)?;

    let spreadsheet = state.export.export(drug_name).await?;
    let disposition = HeaderValue::from_bytes(
        format!("attachment; filename=\"{}\"", spreadsheet.filename).as_bytes(),
    )
    .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=\"drug_info.xlsx\""));

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static(XLSX_CONTENT_TYPE)),
            (CONTENT_DISPOSITION, disposition),
        ],
        spreadsheet.bytes,
    )
        .into_response())
}
