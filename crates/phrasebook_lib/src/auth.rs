//! Passthrough JWT authentication: requests carrying a valid access token
//! are annotated with its claims, all other requests continue anonymously.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use phrasebook_common_types::Role;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::metrics;

/// The payload of an access token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Expiration time, in seconds since the Unix epoch. Tokens without it
    /// never expire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

/// Who is making a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Viewer {
    #[default]
    Anonymous,
    Authenticated(Claims),
}

impl Viewer {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Viewer::Authenticated(_))
    }

    /// The viewer's role. Unknown role names are ignored.
    pub fn role(&self) -> Option<Role> {
        match self {
            Viewer::Authenticated(claims) => claims
                .role
                .as_deref()
                .and_then(|role| Role::from_str(role).ok()),
            Viewer::Anonymous => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no JWT secret is configured")]
    NoSecret,
    #[error("the Authorization header is not valid UTF-8")]
    MalformedHeader,
    #[error("the Authorization header doesn't use the Bearer scheme")]
    NotBearer,
    #[error("invalid access token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

/// Verifies HS256 access tokens.
#[derive(Clone)]
pub struct Authenticator {
    key: Option<DecodingKey>,
    validation: Validation,
    log_rejections: bool,
}

impl Authenticator {
    /// Without a `secret`, every token is rejected. `log_rejections` logs the
    /// reason for each rejected token at debug level.
    pub fn new(secret: Option<&str>, log_rejections: bool) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // `exp` is checked when present, but not required.
        validation.required_spec_claims.clear();
        validation.validate_aud = false;

        Self {
            key: secret.map(|secret| DecodingKey::from_secret(secret.as_bytes())),
            validation,
            log_rejections,
        }
    }

    /// Verifies the value of an `Authorization` header, e.g. `Bearer <token>`.
    pub fn verify(&self, authorization: &str) -> Result<Claims, AuthError> {
        let key = self.key.as_ref().ok_or(AuthError::NoSecret)?;
        let (scheme, token) = authorization
            .trim()
            .split_once(' ')
            .ok_or(AuthError::NotBearer)?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(AuthError::NotBearer);
        }

        let data = decode::<Claims>(token.trim(), key, &self.validation)?;
        Ok(data.claims)
    }

    /// Like [`Authenticator::verify`], but never fails: a missing or invalid
    /// token makes the viewer anonymous.
    pub fn viewer(&self, authorization: Option<Result<&str, AuthError>>) -> Viewer {
        let Some(authorization) = authorization else {
            return Viewer::Anonymous;
        };

        match authorization.and_then(|value| self.verify(value)) {
            Ok(claims) => {
                metrics()
                    .jwt_verifications
                    .with_label_values(&["valid"])
                    .inc();
                Viewer::Authenticated(claims)
            }
            Err(err) => {
                metrics()
                    .jwt_verifications
                    .with_label_values(&["rejected"])
                    .inc();
                if self.log_rejections {
                    debug!(error = %err, "Continuing without authentication");
                }
                Viewer::Anonymous
            }
        }
    }

    pub fn viewer_from_headers(&self, headers: &HeaderMap) -> Viewer {
        let authorization = headers.get(AUTHORIZATION).map(|value| {
            value.to_str().map_err(|_| AuthError::MalformedHeader)
        });
        self.viewer(authorization)
    }

    /// Reads the token of a WebSocket `connection_init` payload, i.e.
    /// `{"authorization": "Bearer <token>"}`. Returns `None` if the payload
    /// has no token.
    pub fn viewer_from_connection_init(&self, payload: &serde_json::Value) -> Option<Viewer> {
        let authorization = payload
            .get("authorization")
            .or_else(|| payload.get("Authorization"))?;

        Some(self.viewer(Some(
            authorization.as_str().ok_or(AuthError::MalformedHeader),
        )))
    }
}

/// Middleware that stores the request's [`Viewer`] in its extensions. It
/// never rejects a request.
pub async fn jwt_passthrough(
    State(authenticator): State<Arc<Authenticator>>,
    mut request: Request,
    next: Next,
) -> Response {
    let viewer = authenticator.viewer_from_headers(request.headers());
    request.extensions_mut().insert(viewer);

    next.run(request).await
}
