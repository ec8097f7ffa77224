mod common;

use axum::http::StatusCode;

use common::{TestApp, body_text, cookie_header, form_request, get_request, location};
use rxlens::application::quotes::QUOTES;

#[tokio::test]
async fn index_redirects_anonymous_visitors_to_login() {
    let app = TestApp::new().await;

    let response = app.send(get_request("/", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let login = app.send(get_request("/login", None)).await;
    assert_eq!(login.status(), StatusCode::OK);
    assert!(body_text(login).await.contains("<form"));
}

#[tokio::test]
async fn signed_in_index_greets_the_user() {
    let app = TestApp::new().await;
    let cookie = app.sign_in("alice", "secret").await;

    let response = app.send(get_request("/", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("alice"));
    assert!(page.contains(QUOTES[4]));
}

#[tokio::test]
async fn duplicate_registration_is_flashed() {
    let app = TestApp::new().await;
    app.sign_in("alice", "secret").await;

    let response = app
        .send(form_request(
            "/register",
            "username=alice&password=other",
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/register");

    let flash = cookie_header(&response);
    let page = app.send(get_request("/register", Some(&flash))).await;
    assert_eq!(page.status(), StatusCode::OK);
    assert!(body_text(page).await.contains("Username already exists"));
}

#[tokio::test]
async fn blank_credentials_are_rejected() {
    let app = TestApp::new().await;

    let response = app
        .send(form_request("/register", "username=+++&password=", None))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/register");

    let flash = cookie_header(&response);
    let page = app.send(get_request("/register", Some(&flash))).await;
    assert!(
        body_text(page)
            .await
            .contains("Username and password are required")
    );
}

#[tokio::test]
async fn login_failures_share_one_message() {
    let app = TestApp::new().await;
    app.sign_in("alice", "secret").await;

    let mut pages = Vec::new();
    for form in [
        "username=alice&password=wrong",
        "username=nobody&password=secret",
    ] {
        let response = app.send(form_request("/login", form, None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{form}");
        assert_eq!(location(&response), "/login", "{form}");
        assert!(!cookie_header(&response).contains("rxlens_session="));

        let flash = cookie_header(&response);
        let page = app.send(get_request("/login", Some(&flash))).await;
        pages.push(body_text(page).await);
    }

    assert!(pages[0].contains("Invalid username or password"));
    assert_eq!(pages[0], pages[1]);
}

#[tokio::test]
async fn flash_is_shown_once() {
    let app = TestApp::new().await;

    let response = app
        .send(form_request(
            "/login",
            "username=nobody&password=secret",
            None,
        ))
        .await;
    let flash = cookie_header(&response);

    let first = app.send(get_request("/login", Some(&flash))).await;
    let cleared = cookie_header(&first);
    assert!(body_text(first).await.contains("Invalid username or password"));

    let second = app.send(get_request("/login", Some(&cleared))).await;
    assert!(!body_text(second).await.contains("Invalid username or password"));
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = TestApp::new().await;
    let cookie = app.sign_in("alice", "secret").await;

    let response = app.send(get_request("/logout", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let cleared = cookie_header(&response);
    let index = app.send(get_request("/", Some(&cleared))).await;
    assert_eq!(index.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&index), "/login");
}

#[tokio::test]
async fn forged_session_cookie_is_ignored() {
    let app = TestApp::new().await;
    app.sign_in("alice", "secret").await;

    let response = app
        .send(get_request("/", Some("rxlens_session=1")))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn database_health_reports_no_content() {
    let app = TestApp::new().await;

    let response = app.send(get_request("/_health/db", None)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
