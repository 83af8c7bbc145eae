//! Admin gate
//!
//! The back-office surface requires an authenticated admin principal. The
//! contract here is a boolean gate: requests carry `x-admin-token` and it
//! must equal the configured secret. Admin routes reject outright when no
//! secret is configured.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::core::ServerState;
use crate::utils::AppError;

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Extractor gating admin handlers
///
/// ```ignore
/// pub async fn list(_admin: RequireAdmin, State(state): State<ServerState>) -> ... {}
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin;

impl FromRequestParts<ServerState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.admin_token.as_deref() else {
            tracing::warn!(uri = %parts.uri, "Admin request rejected: ADMIN_TOKEN not configured");
            return Err(AppError::unauthorized());
        };

        let provided = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok());

        match provided {
            Some(token) if token_matches(token, expected) => Ok(RequireAdmin),
            Some(_) => {
                tracing::warn!(uri = %parts.uri, "Admin request with invalid token");
                Err(AppError::forbidden("Invalid admin token"))
            }
            None => Err(AppError::unauthorized()),
        }
    }
}

/// Constant-time comparison over the token bytes
fn token_matches(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        return false;
    }
    provided
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_comparison() {
        assert!(token_matches("secret", "secret"));
        assert!(!token_matches("secret", "secre7"));
        assert!(!token_matches("secret", "secrets"));
        assert!(!token_matches("", "secret"));
    }
}
