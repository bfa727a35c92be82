#[macro_use]
mod common;

use actix_web::http::{header, StatusCode};
use actix_web::test;
use serde_json::json;

fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

#[actix_web::test]
async fn test_login_sets_tokens_and_cookies() {
    let state = common::state().await;
    let app = app!(state);

    let resp = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({ "email": "Candidate@Example.com", "password": common::PASSWORD }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cookies: Vec<String> = resp.response().cookies().map(|c| c.name().to_string()).collect();
    assert!(cookies.contains(&"access_token".to_string()));
    assert!(cookies.contains(&"refresh_token".to_string()));

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 3600);
    assert_eq!(body["user"]["email"], common::CANDIDATE);
    assert_eq!(body["user"]["is_admin"], false);
    assert!(body["access_token"].as_str().is_some());
}

#[actix_web::test]
async fn test_invalid_login() {
    let state = common::state().await;
    let app = app!(state);

    for email in [common::CANDIDATE, "nobody@example.com"] {
        let resp = test::TestRequest::post()
            .uri("/login")
            .set_json(json!({ "email": email, "password": "wrong" }))
            .send_request(&app)
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "invalid_credentials");
    }
}

#[actix_web::test]
async fn test_login_is_rate_limited() {
    let mut settings = common::settings();
    settings.rate_limit.login_attempts = 2;
    let state = common::state_with(settings).await;
    let app = app!(state);

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let resp = test::TestRequest::post()
            .uri("/login")
            .set_json(json!({ "email": common::CANDIDATE, "password": "wrong" }))
            .send_request(&app)
            .await;
        statuses.push(resp.status());
    }
    assert_eq!(
        statuses,
        vec![StatusCode::UNAUTHORIZED, StatusCode::UNAUTHORIZED, StatusCode::TOO_MANY_REQUESTS]
    );
}

#[actix_web::test]
async fn test_api_requires_access_token() {
    let state = common::state().await;
    let app = app!(state);

    let resp = test::TestRequest::get().uri("/api/auth/me").send_request(&app).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "missing_token");

    let resp = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer("not-a-token"))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_me_accepts_bearer_or_cookie() {
    let state = common::state().await;
    let app = app!(state);
    let login = login!(app, common::CANDIDATE);
    let token = login["access_token"].as_str().unwrap();

    let resp = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(token))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["name"], "Candidate");

    let resp = test::TestRequest::get()
        .uri("/api/auth/me")
        .cookie(actix_web::cookie::Cookie::new("access_token", token))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_refresh_token_is_not_an_access_token() {
    let state = common::state().await;
    let app = app!(state);

    let resp = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({ "email": common::CANDIDATE, "password": common::PASSWORD }))
        .send_request(&app)
        .await;
    let refresh = resp
        .response()
        .cookies()
        .find(|c| c.name() == "refresh_token")
        .map(|c| c.value().to_string())
        .unwrap();

    let resp = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&refresh))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "wrong_token_kind");
}

#[actix_web::test]
async fn test_refresh_rotates_and_rejects_replay() {
    let state = common::state().await;
    let app = app!(state);

    let resp = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({ "email": common::CANDIDATE, "password": common::PASSWORD }))
        .send_request(&app)
        .await;
    let first = resp
        .response()
        .cookies()
        .find(|c| c.name() == "refresh_token")
        .map(|c| c.value().to_string())
        .unwrap();

    let resp = test::TestRequest::post()
        .uri("/api/refresh")
        .cookie(actix_web::cookie::Cookie::new("refresh_token", first.clone()))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let rotated = resp
        .response()
        .cookies()
        .find(|c| c.name() == "refresh_token")
        .map(|c| c.value().to_string())
        .unwrap();
    assert_ne!(rotated, first);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    let access = body["access_token"].as_str().unwrap().to_string();

    // The replaced token is dead.
    let resp = test::TestRequest::post()
        .uri("/api/refresh")
        .insert_header(bearer(&first))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "revoked_token");

    // The fresh access token works.
    let resp = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&access))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_refresh_without_token() {
    let state = common::state().await;
    let app = app!(state);

    let resp = test::TestRequest::post().uri("/api/refresh").send_request(&app).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_logout_revokes_refresh_session() {
    let state = common::state().await;
    let app = app!(state);

    let resp = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({ "email": common::CANDIDATE, "password": common::PASSWORD }))
        .send_request(&app)
        .await;
    let refresh = resp
        .response()
        .cookies()
        .find(|c| c.name() == "refresh_token")
        .map(|c| c.value().to_string())
        .unwrap();
    let body: serde_json::Value = test::read_body_json(resp).await;
    let access = body["access_token"].as_str().unwrap();

    let resp = test::TestRequest::post()
        .uri("/api/logout")
        .insert_header(bearer(access))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::TestRequest::post()
        .uri("/api/refresh")
        .insert_header(bearer(&refresh))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
