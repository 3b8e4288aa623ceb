//! Helpers for tests that need signed access tokens.

use jsonwebtoken::{encode, EncodingKey, Header};
use phrasebook_common_types::Role;

use crate::auth::{Authenticator, Claims, Viewer};

pub const TEST_JWT_SECRET: &str = "phrasebook-test-secret";

/// An [`Authenticator`] that accepts tokens signed with [`TEST_JWT_SECRET`].
pub fn test_authenticator() -> Authenticator {
    Authenticator::new(Some(TEST_JWT_SECRET), true)
}

pub fn test_claims(role: Option<Role>) -> Claims {
    Claims {
        sub: Some("test-user".to_string()),
        role: role.map(|role| role.to_string()),
        exp: None,
    }
}

/// A valid `Authorization` header value.
pub fn bearer(role: Option<Role>) -> String {
    let token = encode(
        &Header::default(),
        &test_claims(role),
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("Failed to sign test token");

    format!("Bearer {token}")
}

/// The [`Viewer`] a [`bearer`] token with the same role authenticates as.
pub fn test_viewer(role: Option<Role>) -> Viewer {
    Viewer::Authenticated(test_claims(role))
}
