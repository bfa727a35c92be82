//! Route-level authentication gate.
//!
//! `AuthGate::decide` is a pure function of the path and the presented
//! access token. `AuthGateLayer` applies it to every request as actix-web
//! middleware; it never refreshes tokens itself.

use std::rc::Rc;
use std::sync::Arc;

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::{header, StatusCode};
use actix_web::{Error, HttpRequest, HttpResponse};
use futures::future::{ready, LocalBoxFuture, Ready};
use serde_json::json;
use tracing::debug;

use super::token::{TokenCodec, TokenKind};
use crate::config::GateConfig;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    DenyRedirect(String),
    DenyStatus(StatusCode),
}

impl GateDecision {
    pub fn into_response(self) -> HttpResponse {
        match self {
            GateDecision::Allow => HttpResponse::Ok().finish(),
            GateDecision::DenyRedirect(to) => HttpResponse::Found()
                .insert_header((header::LOCATION, to))
                .finish(),
            GateDecision::DenyStatus(status) => HttpResponse::build(status).json(json!({
                "error": {
                    "status": status.as_u16(),
                    "message": status.canonical_reason().unwrap_or("Denied")
                }
            })),
        }
    }
}

pub struct AuthGate {
    tokens: Arc<TokenCodec>,
    login_path: String,
    api_prefix: String,
    public_paths: Vec<String>,
    admin_prefixes: Vec<String>,
}

impl AuthGate {
    pub fn new(config: &GateConfig, tokens: Arc<TokenCodec>) -> Self {
        Self {
            tokens,
            login_path: config.login_path.clone(),
            api_prefix: config.api_prefix.clone(),
            public_paths: config.public_paths.clone(),
            admin_prefixes: config.admin_prefixes.clone(),
        }
    }

    pub fn decide(&self, path: &str, access_token: Option<&str>) -> GateDecision {
        if path == self.login_path || self.public_paths.iter().any(|p| matches_prefix(path, p)) {
            return GateDecision::Allow;
        }
        // API handlers authenticate themselves so failures carry status codes.
        if matches_prefix(path, &self.api_prefix) {
            return GateDecision::Allow;
        }

        let Some(token) = access_token else {
            return self.redirect_to_login(path);
        };
        let claims = match self.tokens.verify(token, TokenKind::Access) {
            Ok(claims) => claims,
            Err(e) => {
                debug!("Gate rejected token for {}: {}", path, e);
                return self.redirect_to_login(path);
            }
        };

        if !claims.admin && self.admin_prefixes.iter().any(|p| matches_prefix(path, p)) {
            return GateDecision::DenyStatus(StatusCode::FORBIDDEN);
        }
        GateDecision::Allow
    }

    fn redirect_to_login(&self, path: &str) -> GateDecision {
        let next: String = url::form_urlencoded::byte_serialize(path.as_bytes()).collect();
        GateDecision::DenyRedirect(format!("{}?next={}", self.login_path, next))
    }
}

/// `/` matches only itself; any other prefix matches whole path segments.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return path == "/";
    }
    let prefix = prefix.trim_end_matches('/');
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Access token from `Authorization: Bearer` or the `access_token` cookie.
pub fn access_token_from(req: &HttpRequest) -> Option<String> {
    bearer_token(req).or_else(|| req.cookie(ACCESS_COOKIE).map(|c| c.value().to_string()))
}

pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

pub struct AuthGateLayer {
    gate: Arc<AuthGate>,
}

impl AuthGateLayer {
    pub fn new(gate: Arc<AuthGate>) -> Self {
        Self { gate }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthGateLayer
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthGateMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthGateMiddleware {
            service: Rc::new(service),
            gate: self.gate.clone(),
        }))
    }
}

pub struct AuthGateMiddleware<S> {
    service: Rc<S>,
    gate: Arc<AuthGate>,
}

impl<S, B> Service<ServiceRequest> for AuthGateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = access_token_from(req.request());
        match self.gate.decide(req.path(), token.as_deref()) {
            GateDecision::Allow => {
                let fut = self.service.call(req);
                Box::pin(async move { Ok(fut.await?.map_into_left_body()) })
            }
            denied => {
                debug!("Gate denied {} with {:?}", req.path(), denied);
                let response = denied.into_response();
                Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::tests::test_codec;
    use crate::db::User;

    fn gate() -> (Arc<TokenCodec>, AuthGate) {
        let tokens = Arc::new(test_codec());
        let config = GateConfig {
            login_path: "/login".into(),
            api_prefix: "/api".into(),
            public_paths: vec!["/".into(), "/register".into(), "/campaigns".into()],
            admin_prefixes: vec!["/admin".into()],
        };
        (tokens.clone(), AuthGate::new(&config, tokens))
    }

    #[test]
    fn test_public_and_api_paths_allowed() {
        let (_, gate) = gate();
        for path in ["/", "/login", "/register", "/campaigns", "/campaigns/42", "/api/auth/me", "/api"] {
            assert_eq!(gate.decide(path, None), GateDecision::Allow, "{}", path);
        }
        // Garbage tokens do not matter on public paths
        assert_eq!(gate.decide("/campaigns", Some("garbage")), GateDecision::Allow);
    }

    #[test]
    fn test_protected_paths_redirect_to_login() {
        let (_, gate) = gate();
        assert_eq!(
            gate.decide("/interview/7", None),
            GateDecision::DenyRedirect("/login?next=%2Finterview%2F7".into())
        );
        assert_eq!(
            gate.decide("/campaignsx", Some("garbage")),
            GateDecision::DenyRedirect("/login?next=%2Fcampaignsx".into())
        );
        assert!(matches!(gate.decide("/apix", None), GateDecision::DenyRedirect(_)));
    }

    #[test]
    fn test_expired_token_redirects() {
        let (tokens, gate) = gate();
        let user = User::new("ada@example.com", "Ada", "hash", false);
        let stale = tokens
            .issue_access_at(&user, chrono::Utc::now() - chrono::Duration::hours(2))
            .unwrap();
        assert!(matches!(gate.decide("/dashboard", Some(&stale.token)), GateDecision::DenyRedirect(_)));
    }

    #[test]
    fn test_valid_token_and_admin_paths() {
        let (tokens, gate) = gate();
        let candidate = tokens.issue_access(&User::new("a@example.com", "A", "h", false)).unwrap();
        let admin = tokens.issue_access(&User::new("b@example.com", "B", "h", true)).unwrap();
        let (refresh, _) = tokens.issue_refresh(&User::new("c@example.com", "C", "h", true)).unwrap();

        assert_eq!(gate.decide("/dashboard", Some(&candidate.token)), GateDecision::Allow);
        assert_eq!(
            gate.decide("/admin/campaigns", Some(&candidate.token)),
            GateDecision::DenyStatus(StatusCode::FORBIDDEN)
        );
        assert_eq!(gate.decide("/admin/campaigns", Some(&admin.token)), GateDecision::Allow);
        // A refresh token is not an access token
        assert!(matches!(gate.decide("/dashboard", Some(&refresh.token)), GateDecision::DenyRedirect(_)));
    }
}
