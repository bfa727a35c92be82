use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::issuer::submission_for_room;
use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AttemptError, AuthError, RoomError};
use crate::retry::with_storage_retry;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub room_name: String,
    pub participant_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub room: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub server_url: String,
}

async fn issue(
    user: AuthenticatedUser,
    request: TokenRequest,
    state: &AppState,
) -> Result<HttpResponse, AppError> {
    let submission_id = submission_for_room(&request.room_name)
        .ok_or_else(|| RoomError::NotAnInterviewRoom(request.room_name.clone()))?;

    let attempt = with_storage_retry("find submission", || state.ledger.find(submission_id))
        .await?
        .ok_or(AttemptError::UnknownSubmission)?;
    // Room credentials are personal, even for admins.
    if attempt.user_id != user.id() {
        return Err(AuthError::Forbidden.into());
    }

    let participant_name = match request.participant_name.filter(|n| !n.trim().is_empty()) {
        Some(name) => name,
        None => with_storage_retry("user lookup", || state.users.find(user.id()))
            .await?
            .map(|u| u.display_name)
            .unwrap_or_else(|| user.id().to_string()),
    };

    // Not retried: a storage hiccup after the slot was taken must surface.
    let credential = state.rooms.issue_for(submission_id, &participant_name).await?;

    Ok(HttpResponse::Ok().json(TokenResponse {
        token: credential.join_token,
        room: credential.room_name,
        expires_at: credential.expires_at,
        server_url: credential.server_url,
    }))
}

pub async fn token_from_body(
    user: AuthenticatedUser,
    body: web::Json<TokenRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    issue(user, body.into_inner(), &state).await
}

pub async fn token_from_query(
    user: AuthenticatedUser,
    query: web::Query<TokenRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    issue(user, query.into_inner(), &state).await
}

pub async fn revoke_token(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let submission_id = path.into_inner();
    if let Some(attempt) = with_storage_retry("find submission", || state.ledger.find(submission_id)).await? {
        user.acting_for(Some(attempt.user_id))?;
    }

    with_storage_retry("revoke room credential", || state.rooms.revoke(submission_id)).await?;
    Ok(HttpResponse::NoContent().finish())
}
