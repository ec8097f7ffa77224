#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use httpmock::{Mock, MockServer};
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;
use tower::ServiceExt;

use rxlens::{
    application::{
        auth::AuthService,
        export::ExportService,
        lookup::LookupService,
        quotes::FixedQuote,
        repos::UsersRepo,
        sources::{ClassificationSource, LabelSource},
        speech::{SpeechError, Speaker},
    },
    cache::{FDA_KIND, RXNAV_KIND, RecordStore},
    domain::drug::ClassCategory,
    infra::{
        db::SqliteRepositories,
        http::{HttpState, build_router, session::session_key},
        sources::{OpenFdaClient, RxClassClient},
    },
};

pub const RXCLASS_PATH: &str = "/REST/rxclass/class/byDrugName.json";
pub const OPENFDA_PATH: &str = "/drug/label.json";

/// Speaker that records what it was asked to say.
#[derive(Default)]
pub struct RecordingSpeaker {
    pub spoken: Mutex<Vec<String>>,
}

#[async_trait]
impl Speaker for RecordingSpeaker {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        self.spoken
            .lock()
            .expect("speaker lock")
            .push(text.to_string());
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub upstream: MockServer,
    pub cache_dir: TempDir,
    pub speaker: Arc<RecordingSpeaker>,
}

impl TestApp {
    pub async fn new() -> Self {
        let upstream = MockServer::start();
        let cache_dir = TempDir::new().expect("cache dir");

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("memory pool");
        SqliteRepositories::run_migrations(&pool)
            .await
            .expect("migrations");
        let repositories = Arc::new(SqliteRepositories::new(pool));

        let client = reqwest::Client::new();
        let classifications: Arc<dyn ClassificationSource> =
            Arc::new(RxClassClient::new(client.clone(), upstream.base_url()));
        let labels: Arc<dyn LabelSource> =
            Arc::new(OpenFdaClient::new(client, upstream.base_url()));

        let lookup = LookupService::new(
            classifications,
            labels,
            Arc::new(RecordStore::open(cache_dir.path(), RXNAV_KIND).expect("rxnav store")),
            Arc::new(RecordStore::open(cache_dir.path(), FDA_KIND).expect("fda store")),
            Arc::new(FixedQuote(4)),
        );

        let users: Arc<dyn UsersRepo> = repositories.clone();
        let speaker = Arc::new(RecordingSpeaker::default());
        let state = HttpState {
            export: ExportService::new(lookup.clone()),
            lookup,
            auth: AuthService::new(users),
            speaker: speaker.clone(),
            db: repositories,
            session_key: session_key("integration-secret"),
        };

        Self {
            router: build_router(state),
            upstream,
            cache_dir,
            speaker,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    /// Register and sign in, returning the `Cookie` header value.
    pub async fn sign_in(&self, username: &str, password: &str) -> String {
        let form = format!("username={username}&password={password}");
        let registered = self.send(form_request("/register", &form, None)).await;
        assert_eq!(registered.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&registered), "/login");

        let response = self.send(form_request("/login", &form, None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
        cookie_header(&response)
    }

    /// Mock the eight classification queries and the label search for `drug`.
    pub fn mock_upstreams(&self, drug: &str, effects: &[&str]) -> (Vec<Mock<'_>>, Mock<'_>) {
        let classes = ClassCategory::ALL
            .iter()
            .map(|category| {
                let body = if *category == ClassCategory::Effect {
                    rxclass_body(effects)
                } else {
                    "{}".to_string()
                };
                self.upstream.mock(|when, then| {
                    when.method("GET")
                        .path(RXCLASS_PATH)
                        .query_param("drugName", drug)
                        .query_param("relas", category.code());
                    then.status(200)
                        .header("content-type", "application/json")
                        .body(body);
                })
            })
            .collect();

        let search = format!("openfda.brand_name:\"{drug}\"");
        let label = self.upstream.mock(|when, then| {
            when.method("GET")
                .path(OPENFDA_PATH)
                .query_param("search", search.as_str())
                .query_param("limit", "1");
            then.status(200)
                .header("content-type", "application/json")
                .body(
                    r#"{"meta":{},"results":[{"ask_doctor":["A"],"ask_doctor_or_pharmacist":["B"],"purpose":["Pain reliever"]}]}"#,
                );
        });

        (classes, label)
    }
}

pub fn rxclass_body(names: &[&str]) -> String {
    let entries: Vec<String> = names
        .iter()
        .map(|name| format!(r#"{{"rxclassMinConceptItem":{{"className":"{name}"}}}}"#))
        .collect();
    format!(
        r#"{{"rxclassDrugInfoList":{{"rxclassDrugInfo":[{}]}}}}"#,
        entries.join(",")
    )
}

pub fn form_request(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri).header(
        header::CONTENT_TYPE,
        "application/x-www-form-urlencoded",
    );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub fn json_request(uri: &str, body: serde_json::Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request")
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

/// Fold every `Set-Cookie` into one `Cookie` request header.
pub fn cookie_header(response: &Response<Body>) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).expect("utf-8 body")
}
