//! Authentication middleware for Axum
//!
//! Verifies the bearer token, stores an [`AuthenticatedUser`] in the request
//! extensions and records the caller's activity.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use tracing::{debug, warn};

use crate::domain::{Identity, RepositoryProvider, Role};
use crate::infrastructure::crypto::jwt::{verify_token, JwtConfig, TokenClaims};

/// Authentication error types
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    ExpiredToken,
}

/// Authentication state containing JWT config and the user store
#[derive(Clone)]
pub struct AuthState {
    pub jwt_config: JwtConfig,
    pub repos: Arc<dyn RepositoryProvider>,
}

/// Caller resolved from a verified token
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub username: String,
    pub roles: Vec<Role>,
}

impl AuthenticatedUser {
    /// Unknown role names in the token are ignored.
    pub fn from_claims(claims: TokenClaims) -> Self {
        Self {
            username: claims.sub.to_lowercase(),
            roles: claims.roles.iter().filter_map(|r| Role::parse(r)).collect(),
        }
    }

    pub fn identity(&self) -> Identity {
        Identity::new(self.username.clone(), self.roles.clone())
    }
}

fn extract_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// JWT authentication middleware
pub async fn auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(String::from);
    let Some(auth_header) = auth_header else {
        return auth_error_response(AuthError::MissingToken);
    };

    let Some(token) = extract_token(&auth_header) else {
        return auth_error_response(AuthError::InvalidToken);
    };

    let claims = match verify_token(token, &auth_state.jwt_config) {
        Ok(claims) => claims,
        Err(e) => {
            debug!(error = %e, "Rejected bearer token");
            return auth_error_response(AuthError::InvalidToken);
        }
    };
    if claims.is_expired() {
        return auth_error_response(AuthError::ExpiredToken);
    }

    let user = AuthenticatedUser::from_claims(claims);

    // Record activity (fire and forget)
    let repos = auth_state.repos.clone();
    let username = user.username.clone();
    tokio::spawn(async move {
        if let Err(e) = repos.users().touch_last_active(&username, Utc::now()).await {
            warn!(username = %username, error = %e, "Failed to update last active");
        }
    });

    request.extensions_mut().insert(user);
    next.run(request).await
}

fn auth_error_response(error: AuthError) -> Response {
    let message = match error {
        AuthError::MissingToken => "Missing authentication token",
        AuthError::InvalidToken => "Invalid authentication token",
        AuthError::ExpiredToken => "Token has expired",
    };

    let body = Json(json!({
        "success": false,
        "data": null,
        "error": message
    }));

    (StatusCode::UNAUTHORIZED, body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(extract_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_token("Basic abc"), None);
        assert_eq!(extract_token("Bearer "), None);
    }

    #[test]
    fn claims_map_to_identity() {
        let claims = TokenClaims {
            sub: "Lisa".into(),
            roles: vec!["Member".into(), "moderator".into(), "Wizard".into()],
            exp: 0,
            iat: 0,
            iss: "test".into(),
        };
        let identity = AuthenticatedUser::from_claims(claims).identity();
        assert_eq!(identity.username, "lisa");
        assert_eq!(identity.roles, vec![Role::Member, Role::Moderator]);
    }
}
