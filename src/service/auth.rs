//! HTTP Basic authentication for protected routes.

use axum::{
    Json,
    extract::{Extension, Request},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::HashMap;
use std::sync::Arc;

use crate::storage::protocol::ErrorResponse;

const REALM: &str = "Basic realm=\"biomarker-backend\"";

/// Known users and their passwords.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    users: HashMap<String, String>,
}

impl Credentials {
    pub fn new(users: HashMap<String, String>) -> Self {
        Self { users }
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .is_some_and(|expected| expected == password)
    }
}

/// Username of the caller, inserted into request extensions once verified.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser(pub String);

/// Splits an `Authorization: Basic <base64(user:pass)>` header value.
pub fn parse_basic_auth(value: &str) -> Option<(String, String)> {
    let encoded = value.strip_prefix("Basic ")?.trim();
    let decoded = STANDARD.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, REALM)],
        Json(ErrorResponse::new("Unauthorized Access")),
    )
        .into_response()
}

pub async fn require_basic_auth(
    Extension(credentials): Extension<Arc<Credentials>>,
    mut request: Request,
    next: Next,
) -> Response {
    let supplied = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_basic_auth);

    match supplied {
        Some((username, password)) if credentials.verify(&username, &password) => {
            request.extensions_mut().insert(AuthenticatedUser(username));
            next.run(request).await
        }
        Some((username, _)) => {
            tracing::warn!("Rejected credentials for user '{}'", username);
            unauthorized()
        }
        None => unauthorized(),
    }
}
