mod common;

use axum::http::{StatusCode, header};
use serde_json::json;

use common::{
    OPENFDA_PATH, RXCLASS_PATH, TestApp, body_bytes, body_json, json_request, location,
    rxclass_body,
};
use rxlens::application::export::XLSX_CONTENT_TYPE;
use rxlens::application::quotes::QUOTES;
use rxlens::domain::drug::ClassCategory;

#[tokio::test]
async fn json_routes_require_a_session() {
    let app = TestApp::new().await;

    for uri in [
        "/get_drug_info",
        "/get_drug_label",
        "/speak",
        "/download_results",
    ] {
        let response = app
            .send(json_request(uri, json!({"drug_name": "aspirin"}), None))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), "/login", "{uri}");
    }
}

#[tokio::test]
async fn lookup_combines_both_sources_and_merges_ask_doctor() {
    let app = TestApp::new().await;
    let cookie = app.sign_in("alice", "secret").await;
    let (class_mocks, label_mock) = app.mock_upstreams("aspirin", &["Analgesic", "Antipyretic"]);

    let response = app
        .send(json_request(
            "/get_drug_info",
            json!({"drug_name": "aspirin"}),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["drug_name"], "aspirin");
    assert_eq!(body["quote"], QUOTES[4]);

    let mut effects: Vec<&str> = body["rxnav"]["classes"]["Effects"]
        .as_array()
        .expect("effects")
        .iter()
        .filter_map(|value| value.as_str())
        .collect();
    effects.sort_unstable();
    assert_eq!(effects, ["Analgesic", "Antipyretic"]);
    assert_eq!(
        body["rxnav"]["classes"]
            .as_object()
            .expect("classes object")
            .len(),
        ClassCategory::ALL.len()
    );

    let first = &body["fda"]["results"][0];
    assert_eq!(first["ask_doctor"], "A B");
    assert!(first.get("ask_doctor_or_pharmacist").is_none());
    assert_eq!(first["purpose"], json!(["Pain reliever"]));

    for mock in &class_mocks {
        mock.assert_hits(1);
    }
    label_mock.assert_hits(1);

    assert!(app.cache_dir.path().join("aspirin_rxnav.json").exists());
    assert!(app.cache_dir.path().join("aspirin_fda.json").exists());
}

#[tokio::test]
async fn respelled_name_is_served_from_cache() {
    let app = TestApp::new().await;
    let cookie = app.sign_in("alice", "secret").await;
    let (class_mocks, label_mock) = app.mock_upstreams("aspirin", &["Analgesic"]);

    for name in ["aspirin", "  ASPIRIN ", "Aspirin"] {
        let response = app
            .send(json_request(
                "/get_drug_info",
                json!({"drug_name": name}),
                Some(&cookie),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK, "{name}");
    }

    for mock in &class_mocks {
        mock.assert_hits(1);
    }
    label_mock.assert_hits(1);
}

#[tokio::test]
async fn disk_entries_answer_without_network_calls() {
    let app = TestApp::new().await;
    let cookie = app.sign_in("alice", "secret").await;

    std::fs::write(
        app.cache_dir.path().join("tylenol_rxnav.json"),
        r#"{"drug_name":"Tylenol","classes":{"Effects":["x","y"]}}"#,
    )
    .expect("write classification");
    std::fs::write(
        app.cache_dir.path().join("tylenol_fda.json"),
        r#"{"results":[{"purpose":["Pain reliever"]}]}"#,
    )
    .expect("write label");

    let (class_mocks, label_mock) = app.mock_upstreams("Tylenol", &["z"]);

    let response = app
        .send(json_request(
            "/get_drug_info",
            json!({"drug_name": "Tylenol"}),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["rxnav"]["classes"]["Effects"], json!(["x", "y"]));

    for mock in &class_mocks {
        mock.assert_hits(0);
    }
    label_mock.assert_hits(0);
}

#[tokio::test]
async fn failed_category_query_fails_the_lookup_without_caching() {
    let app = TestApp::new().await;
    let cookie = app.sign_in("alice", "secret").await;

    for category in ClassCategory::ALL {
        let status = if category == ClassCategory::ContraindicatedMechanism {
            500
        } else {
            200
        };
        app.upstream.mock(|when, then| {
            when.method("GET")
                .path(RXCLASS_PATH)
                .query_param("relas", category.code());
            then.status(status)
                .header("content-type", "application/json")
                .body(rxclass_body(&["Analgesic"]));
        });
    }
    app.upstream.mock(|when, then| {
        when.method("GET").path(OPENFDA_PATH);
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"results":[]}"#);
    });

    let response = app
        .send(json_request(
            "/get_drug_info",
            json!({"drug_name": "aspirin"}),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Failed to fetch data from RxClass API");

    assert!(!app.cache_dir.path().join("aspirin_rxnav.json").exists());
}

#[tokio::test]
async fn label_failure_is_reported_as_fda_error() {
    let app = TestApp::new().await;
    let cookie = app.sign_in("alice", "secret").await;

    app.upstream.mock(|when, then| {
        when.method("GET").path(RXCLASS_PATH);
        then.status(200)
            .header("content-type", "application/json")
            .body("{}");
    });
    app.upstream.mock(|when, then| {
        when.method("GET").path(OPENFDA_PATH);
        then.status(404)
            .body(r#"{"error":{"code":"NOT_FOUND"}}"#);
    });

    let response = app
        .send(json_request(
            "/get_drug_info",
            json!({"drug_name": "nosuchdrug"}),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Failed to fetch data from the FDA API");
    assert!(!app.cache_dir.path().join("nosuchdrug_fda.json").exists());
}

#[tokio::test]
async fn rejects_missing_or_unusable_drug_names() {
    let app = TestApp::new().await;
    let cookie = app.sign_in("alice", "secret").await;

    let cases = [
        (json!({}), "No drug name provided"),
        (json!({"drug_name": ""}), "No drug name provided"),
        (json!({"drug_name": "   "}), "No drug name provided"),
        (json!({"drug_name": "!!!"}), "Invalid drug name"),
    ];
    for (payload, expected) in cases {
        let response = app
            .send(json_request("/get_drug_info", payload.clone(), Some(&cookie)))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{payload}");
        assert_eq!(body_json(response).await["error"], expected, "{payload}");
    }

    let response = app
        .send(
            axum::http::Request::post("/get_drug_info")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::COOKIE, &cookie)
                .body(axum::body::Body::from("{not json"))
                .expect("request"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn label_endpoint_returns_the_stored_body() {
    let app = TestApp::new().await;
    let cookie = app.sign_in("alice", "secret").await;
    let (_, label_mock) = app.mock_upstreams("aspirin", &[]);

    let response = app
        .send(json_request(
            "/get_drug_label",
            json!({"drug_name": "aspirin"}),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["results"][0]["ask_doctor"], json!(["A"]));
    assert_eq!(body["results"][0]["ask_doctor_or_pharmacist"], json!(["B"]));

    label_mock.assert_hits(1);
    assert!(!app.cache_dir.path().join("aspirin_rxnav.json").exists());
}

#[tokio::test]
async fn download_without_cached_data_is_not_found() {
    let app = TestApp::new().await;
    let cookie = app.sign_in("alice", "secret").await;

    let response = app
        .send(json_request(
            "/download_results",
            json!({"drug_name": "aspirin"}),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "RxNav data not found");
}

#[tokio::test]
async fn download_after_lookup_returns_a_workbook() {
    let app = TestApp::new().await;
    let cookie = app.sign_in("alice", "secret").await;
    let _mocks = app.mock_upstreams("aspirin", &["x", "y"]);

    let lookup = app
        .send(json_request(
            "/get_drug_info",
            json!({"drug_name": "aspirin"}),
            Some(&cookie),
        ))
        .await;
    assert_eq!(lookup.status(), StatusCode::OK);

    let response = app
        .send(json_request(
            "/download_results",
            json!({"drug_name": "aspirin"}),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).expect("type"),
        XLSX_CONTENT_TYPE
    );
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .expect("disposition"),
        "attachment; filename=\"aspirin_drug_info.xlsx\""
    );

    let bytes = body_bytes(response).await;
    assert!(bytes.starts_with(b"PK"), "xlsx is a zip archive");
}

#[tokio::test]
async fn speak_validates_text_and_invokes_the_engine() {
    let app = TestApp::new().await;
    let cookie = app.sign_in("alice", "secret").await;

    let response = app
        .send(json_request("/speak", json!({"text": ""}), Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "No text provided");

    let response = app
        .send(json_request(
            "/speak",
            json!({"text": "Take with food."}),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "success"}));

    let spoken = app.speaker.spoken.lock().expect("speaker lock").clone();
    assert_eq!(spoken, ["Take with food."]);
}
