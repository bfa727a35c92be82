use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::extract::AuthenticatedUser;
use super::gate::{bearer_token, ACCESS_COOKIE, REFRESH_COOKIE};
use super::token::IssuedToken;
use super::users::authenticate;
use crate::error::{AppError, AuthError};
use crate::retry::with_storage_retry;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub success: bool,
    pub access_token: String,
}

fn session_cookie(name: &'static str, value: String, max_age: i64, state: &AppState) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .secure(state.config.is_production())
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::seconds(max_age.max(0)))
        .finish()
}

fn access_cookie(issued: &IssuedToken, state: &AppState) -> Cookie<'static> {
    let ttl = state.tokens.access_ttl().num_seconds();
    session_cookie(ACCESS_COOKIE, issued.token.clone(), ttl, state)
}

fn refresh_cookie(issued: &IssuedToken, state: &AppState) -> Cookie<'static> {
    let ttl = state.tokens.refresh_ttl().num_seconds();
    session_cookie(REFRESH_COOKIE, issued.token.clone(), ttl, state)
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::ZERO)
        .finish()
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received login request for email: {}", req.email);

    let email = req.email.trim().to_lowercase();
    if !state.login_limiter.check(&email).await {
        warn!("Login rate limited for email: {}", email);
        return Err(AuthError::RateLimited.into());
    }

    let user = match authenticate(&*state.users, &email, &req.password).await {
        Ok(user) => user,
        Err(e) => {
            error!("Login failed for email: {}: {}", email, e);
            return Err(e);
        }
    };

    let access = state.tokens.issue_access(&user)?;
    let (refresh, token_id) = state.tokens.issue_refresh(&user)?;
    with_storage_retry("session start", || state.sessions.set_current(user.id, &token_id)).await?;

    info!("Login successful for email: {}", email);
    Ok(HttpResponse::Ok()
        .cookie(access_cookie(&access, &state))
        .cookie(refresh_cookie(&refresh, &state))
        .json(LoginResponse {
            access_token: access.token,
            token_type: "Bearer",
            expires_in: state.tokens.access_ttl().num_seconds(),
            user: UserProfile {
                id: user.id,
                name: user.display_name,
                email: user.email,
                is_admin: user.is_admin,
            },
        }))
}

pub async fn refresh(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = bearer_token(&req)
        .or_else(|| req.cookie(REFRESH_COOKIE).map(|c| c.value().to_string()))
        .ok_or(AuthError::MissingToken)?;

    let outcome = state.refresh.refresh(&token).await?;

    let mut builder = HttpResponse::Ok();
    builder.cookie(access_cookie(&outcome.access_token, &state));
    if let Some(rotated) = &outcome.refresh_token {
        builder.cookie(refresh_cookie(rotated, &state));
    }
    Ok(builder.json(RefreshResponse {
        success: true,
        access_token: outcome.access_token.token,
    }))
}

pub async fn me(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let record = with_storage_retry("user lookup", || state.users.find(user.id()))
        .await?
        .ok_or(AuthError::UnknownUser)?;

    Ok(HttpResponse::Ok().json(UserProfile {
        id: record.id,
        name: record.display_name,
        email: record.email,
        is_admin: record.is_admin,
    }))
}

pub async fn logout(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    with_storage_retry("session revoke", || state.sessions.revoke(user.id())).await?;
    info!("User {} logged out", user.id());

    Ok(HttpResponse::Ok()
        .cookie(removal_cookie(ACCESS_COOKIE))
        .cookie(removal_cookie(REFRESH_COOKIE))
        .json(serde_json::json!({
            "message": "Successfully logged out"
        })))
}
