use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use uuid::Uuid;

use super::gate::access_token_from;
use super::token::{Claims, TokenKind};
use crate::error::{AppError, AuthError};
use crate::AppState;

/// Caller identity taken from a verified access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub claims: Claims,
}

impl AuthenticatedUser {
    pub fn id(&self) -> Uuid {
        self.claims.user_id()
    }

    pub fn is_admin(&self) -> bool {
        self.claims.admin
    }

    /// Resolves the user an operation targets. Only admins may act for others.
    pub fn acting_for(&self, requested: Option<Uuid>) -> Result<Uuid, AppError> {
        match requested {
            Some(user_id) if user_id != self.id() && !self.is_admin() => {
                Err(AuthError::Forbidden.into())
            }
            Some(user_id) => Ok(user_id),
            None => Ok(self.id()),
        }
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::InternalError("application state not configured".into()))?;
    let token = access_token_from(req).ok_or(AuthError::MissingToken)?;
    let claims = state.tokens.verify(&token, TokenKind::Access)?;
    Ok(AuthenticatedUser { claims })
}
