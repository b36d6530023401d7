//! Bearer-token presence check. No session or identity system behind
//! it; token issuance and rotation are out of scope here.

use crate::state::AppState;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if bearer_matches(header_value, &state.api_token) {
        Ok(next.run(request).await)
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

fn bearer_matches(header_value: Option<&str>, expected: &str) -> bool {
    header_value.and_then(|v| v.strip_prefix("Bearer ")) == Some(expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_bearer_token_passes() {
        assert!(bearer_matches(Some("Bearer secret"), "secret"));
    }

    #[test]
    fn missing_header_is_rejected() {
        assert!(!bearer_matches(None, "secret"));
    }

    #[test]
    fn wrong_token_is_rejected() {
        assert!(!bearer_matches(Some("Bearer wrong"), "secret"));
    }

    #[test]
    fn missing_bearer_prefix_is_rejected() {
        assert!(!bearer_matches(Some("secret"), "secret"));
    }
}
