//! Signed, expiring access and refresh tokens.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::db::User;
use crate::error::{AppError, AuthError};

const TOKEN_ID_BYTES: usize = 32;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,   // User ID
    pub kind: TokenKind,
    pub iat: i64,    // Issued at
    pub exp: i64,    // Expiration time
    #[serde(default)]
    pub admin: bool,
    /// Refresh token identifier tracked by the session store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl Claims {
    pub fn user_id(&self) -> Uuid {
        self.sub
    }

    /// `None` when `exp` is outside the representable range.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Encodes and verifies tokens with the process-wide signing key.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenCodec {
    pub fn new(config: &AuthConfig) -> Result<Self, AppError> {
        if config.jwt_secret.is_empty() {
            return Err(AppError::ConfigError("auth.jwt_secret must not be empty".into()));
        }
        if config.access_ttl_seconds <= 0 || config.refresh_ttl_hours <= 0 {
            return Err(AppError::ConfigError("token lifetimes must be positive".into()));
        }

        // Expiry is checked against an explicit clock in `verify_at`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            access_ttl: Duration::seconds(config.access_ttl_seconds),
            refresh_ttl: Duration::hours(config.refresh_ttl_hours),
        })
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn issue_access(&self, user: &User) -> Result<IssuedToken, AppError> {
        self.issue_access_at(user, Utc::now())
    }

    pub fn issue_access_at(&self, user: &User, now: DateTime<Utc>) -> Result<IssuedToken, AppError> {
        let expires_at = now + self.access_ttl;
        let claims = Claims {
            sub: user.id,
            kind: TokenKind::Access,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            admin: user.is_admin,
            jti: None,
        };
        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Returns the signed refresh token together with its fresh `token_id`.
    pub fn issue_refresh(&self, user: &User) -> Result<(IssuedToken, String), AppError> {
        self.issue_refresh_at(user, Utc::now())
    }

    pub fn issue_refresh_at(
        &self,
        user: &User,
        now: DateTime<Utc>,
    ) -> Result<(IssuedToken, String), AppError> {
        let token_id = new_token_id();
        let expires_at = now + self.refresh_ttl;
        let claims = Claims {
            sub: user.id,
            kind: TokenKind::Refresh,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            admin: false,
            jti: Some(token_id.clone()),
        };
        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok((IssuedToken { token, expires_at }, token_id))
    }

    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, AuthError> {
        self.verify_at(token, expected, Utc::now())
    }

    /// A token is expired once `now` reaches `exp`.
    pub fn verify_at(
        &self,
        token: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| AuthError::MalformedToken)?
            .claims;

        if claims.kind == TokenKind::Refresh && claims.jti.is_none() {
            return Err(AuthError::MalformedToken);
        }
        if now.timestamp() >= claims.exp {
            return Err(AuthError::ExpiredToken);
        }
        if claims.kind != expected {
            return Err(AuthError::WrongKind);
        }

        Ok(claims)
    }
}

fn new_token_id() -> String {
    let mut bytes = [0u8; TOKEN_ID_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
