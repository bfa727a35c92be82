use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AttemptError};
use crate::retry::with_storage_retry;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmissionQuery {
    pub campaign_id: String,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubmission {
    pub campaign_id: String,
    pub user_id: Option<Uuid>,
}

fn require_campaign(campaign_id: &str) -> Result<(), AppError> {
    if campaign_id.trim().is_empty() {
        return Err(AppError::ValidationError("campaign_id is required".into()));
    }
    Ok(())
}

pub async fn list_submissions(
    user: AuthenticatedUser,
    query: web::Query<SubmissionQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    require_campaign(&query.campaign_id)?;
    let user_id = user.acting_for(query.user_id)?;

    let records = with_storage_retry("list submissions", || {
        state.ledger.list(user_id, &query.campaign_id)
    })
    .await?;
    Ok(HttpResponse::Ok().json(records))
}

pub async fn create_submission(
    user: AuthenticatedUser,
    body: web::Json<CreateSubmission>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    require_campaign(&body.campaign_id)?;
    let user_id = user.acting_for(body.user_id)?;
    let policy = state.campaigns.policy(&body.campaign_id);

    let record = with_storage_retry("start attempt", || {
        state.ledger.try_start_attempt(user_id, &policy)
    })
    .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "submission_id": record.submission_id,
        "campaign_id": record.campaign_id,
        "user_id": record.user_id,
        "created_at": record.created_at,
    })))
}

pub async fn submission_status(
    user: AuthenticatedUser,
    query: web::Query<SubmissionQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    require_campaign(&query.campaign_id)?;
    let user_id = user.acting_for(query.user_id)?;
    let policy = state.campaigns.policy(&query.campaign_id);

    let status = with_storage_retry("attempt status", || state.ledger.status(user_id, &policy)).await?;
    Ok(HttpResponse::Ok().json(status))
}

pub async fn complete_submission(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let submission_id = path.into_inner();
    let record = with_storage_retry("find submission", || state.ledger.find(submission_id))
        .await?
        .ok_or(AttemptError::UnknownSubmission)?;
    user.acting_for(Some(record.user_id))?;

    let record = with_storage_retry("complete submission", || {
        state.ledger.mark_completed(submission_id)
    })
    .await?;
    info!("User {} completed submission {}", user.id(), submission_id);

    Ok(HttpResponse::Ok().json(record))
}
