use thiserror::Error;
use actix_web::{ResponseError, HttpResponse, http::StatusCode};
use serde_json::json;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    AuthError(#[from] AuthError),

    #[error("Attempt denied: {0}")]
    AttemptError(#[from] AttemptError),

    #[error("Room credential error: {0}")]
    RoomError(#[from] RoomError),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl AppError {
    /// Only transient storage failures may be retried locally.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::StorageError(StorageError::Unavailable(_)))
    }

    /// Stable machine-readable code rendered alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::AuthError(e) => match e {
                AuthError::MissingToken => "missing_token",
                AuthError::MalformedToken => "malformed_token",
                AuthError::ExpiredToken => "expired_token",
                AuthError::RevokedToken => "revoked_token",
                AuthError::WrongKind => "wrong_token_kind",
                AuthError::InvalidCredentials => "invalid_credentials",
                AuthError::UnknownUser => "unknown_user",
                AuthError::Forbidden => "forbidden",
                AuthError::RateLimited => "rate_limited",
            },
            AppError::AttemptError(e) => match e {
                AttemptError::MaxAttemptsReached => "max_attempts_reached",
                AttemptError::AlreadyCompleted => "already_completed",
                AttemptError::UnknownSubmission => "unknown_submission",
            },
            AppError::RoomError(e) => match e {
                RoomError::AlreadyIssued => "already_issued",
                RoomError::NotAnInterviewRoom(_) => "not_an_interview_room",
                RoomError::InvalidJoinToken => "invalid_join_token",
                RoomError::CredentialRevoked => "credential_revoked",
            },
            AppError::StorageError(StorageError::Unavailable(_)) => "storage_unavailable",
            AppError::StorageError(_) => "storage_error",
            AppError::ConfigError(_) => "config_error",
            AppError::InternalError(_) => "internal_error",
            AppError::ValidationError(_) => "validation_error",
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::StorageError(err.into())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::StorageError(StorageError::Query(err.to_string()))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::InternalError(format!("Token signing failed: {}", err))
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let response = json!({
            "error": {
                "status": status.as_u16(),
                "code": self.code(),
                "message": self.to_string()
            }
        });
        HttpResponse::build(status).json(response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::AuthError(e) => match e {
                AuthError::Forbidden => StatusCode::FORBIDDEN,
                AuthError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                _ => StatusCode::UNAUTHORIZED,
            },
            AppError::AttemptError(AttemptError::UnknownSubmission) => StatusCode::NOT_FOUND,
            AppError::AttemptError(_) => StatusCode::FORBIDDEN,
            AppError::RoomError(RoomError::NotAnInterviewRoom(_)) => StatusCode::BAD_REQUEST,
            AppError::RoomError(RoomError::InvalidJoinToken) => StatusCode::UNAUTHORIZED,
            AppError::RoomError(_) => StatusCode::FORBIDDEN,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("No token provided")]
    MissingToken,

    #[error("Malformed token")]
    MalformedToken,

    #[error("Token expired")]
    ExpiredToken,

    #[error("Token has been superseded or revoked")]
    RevokedToken,

    #[error("Wrong token kind")]
    WrongKind,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unknown user")]
    UnknownUser,

    #[error("Forbidden")]
    Forbidden,

    #[error("Rate limited")]
    RateLimited,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    #[error("Maximum number of attempts reached")]
    MaxAttemptsReached,

    #[error("An attempt for this campaign was already completed")]
    AlreadyCompleted,

    #[error("Unknown submission")]
    UnknownSubmission,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    #[error("A room credential was already issued for this submission")]
    AlreadyIssued,

    #[error("Not an interview room: {0}")]
    NotAnInterviewRoom(String),

    #[error("Invalid join token")]
    InvalidJoinToken,

    #[error("Room credential has been revoked")]
    CredentialRevoked,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Query error: {0}")]
    Query(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => StorageError::Unavailable(err.to_string()),
            _ => StorageError::Query(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::InternalError(_)));

        let config_err = config::ConfigError::NotFound(String::from("key not found"));
        let app_err: AppError = config_err.into();
        assert!(matches!(app_err, AppError::ConfigError(_)));

        let app_err: AppError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(app_err, AppError::StorageError(StorageError::Unavailable(_))));
        assert!(app_err.is_retryable());

        let app_err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(app_err, AppError::StorageError(StorageError::Query(_))));
        assert!(!app_err.is_retryable());
    }

    #[test]
    fn test_error_status_codes() {
        let err = AppError::AuthError(AuthError::ExpiredToken);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err = AppError::AuthError(AuthError::RevokedToken);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err = AppError::AuthError(AuthError::Forbidden);
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let err = AppError::AttemptError(AttemptError::MaxAttemptsReached);
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let err = AppError::RoomError(RoomError::AlreadyIssued);
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let err = AppError::AttemptError(AttemptError::UnknownSubmission);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = AppError::StorageError(StorageError::Unavailable("down".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = AppError::ValidationError("invalid input".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_error_display() {
        let err = AppError::ValidationError("test error".to_string());
        assert_eq!(err.to_string(), "Validation error: test error");

        let err = AppError::AuthError(AuthError::InvalidCredentials);
        assert_eq!(err.to_string(), "Authentication error: Invalid credentials");

        let err = AppError::AttemptError(AttemptError::MaxAttemptsReached);
        assert_eq!(err.to_string(), "Attempt denied: Maximum number of attempts reached");
        assert_eq!(err.code(), "max_attempts_reached");
    }
}
