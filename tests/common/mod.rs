#![allow(dead_code, unused_macros)]

use actix_web::web;
use interview_gate::config::{CampaignOverride, SeedUser};
use interview_gate::{AppState, Settings};

pub const CANDIDATE: &str = "candidate@example.com";
pub const OTHER: &str = "other@example.com";
pub const ADMIN: &str = "admin@example.com";
pub const PASSWORD: &str = "correct horse battery staple";

fn seed(email: &str, name: &str, is_admin: bool) -> SeedUser {
    SeedUser {
        email: email.into(),
        name: name.into(),
        password: PASSWORD.into(),
        is_admin,
    }
}

pub fn settings() -> Settings {
    let mut settings = Settings::new_for_test().expect("Failed to load test config");
    settings.seed_users = vec![
        seed(CANDIDATE, "Candidate", false),
        seed(OTHER, "Other Candidate", false),
        seed(ADMIN, "Admin", true),
    ];
    settings.attempts.campaigns.insert(
        "two-tries".into(),
        CampaignOverride {
            max_attempts: 2,
            allow_retake_after_completion: Some(true),
        },
    );
    settings
}

pub async fn state_with(settings: Settings) -> web::Data<AppState> {
    web::Data::new(AppState::in_memory(settings).await.expect("Failed to build state"))
}

pub async fn state() -> web::Data<AppState> {
    state_with(settings()).await
}

/// Builds the full app, gate included, over the given state.
macro_rules! app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(interview_gate::auth::AuthGateLayer::new($state.gate.clone()))
                .app_data($state.clone())
                .configure(interview_gate::configure),
        )
        .await
    };
}

/// Logs in and returns the parsed response body.
macro_rules! login {
    ($app:expr, $email:expr) => {{
        let resp = actix_web::test::TestRequest::post()
            .uri("/login")
            .set_json(serde_json::json!({ "email": $email, "password": crate::common::PASSWORD }))
            .send_request(&$app)
            .await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
        let body: serde_json::Value = actix_web::test::read_body_json(resp).await;
        body
    }};
}

/// Logs in and returns just the access token.
macro_rules! access_token {
    ($app:expr, $email:expr) => {{
        let body = login!($app, $email);
        body["access_token"].as_str().unwrap().to_string()
    }};
}
