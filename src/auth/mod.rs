//! Shared-secret authentication for the admin routes.
//!
//! The secret is accepted from `x-api-key` or as an `Authorization: Bearer` token
//! and compared in constant time.

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::errors::AppError;

/// Header carrying the admin key.
pub const ADMIN_KEY_HEADER: &str = "x-api-key";

/// Reject requests that do not present `expected_key`. No key configured means open access.
pub async fn admin_auth_layer(
    expected_key: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = expected_key else {
        return next.run(request).await;
    };

    match presented_key(request.headers()) {
        Some(provided) if constant_time_compare(provided, &expected) => next.run(request).await,
        Some(_) => AppError::Unauthorized("Invalid admin credentials".to_string()).into_response(),
        None => AppError::Unauthorized("Missing admin credentials".to_string()).into_response(),
    }
}

/// The key from `x-api-key`, falling back to a bearer token.
fn presented_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        })
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
