use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::warn;

use crate::AppState;
use crate::errors::ApiError;

/// Guards admin routes with `Authorization: Bearer <ADMIN_TOKEN>`.
///
/// Without a configured token every request passes.
#[derive(Debug, Clone, Copy)]
pub struct AdminAuth;

impl<S: AppState> FromRequestParts<S> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config().admin_token.as_deref() else {
            return Ok(AdminAuth);
        };

        let provided = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim);

        match provided {
            Some(token) if constant_time_eq(token.as_bytes(), expected.as_bytes()) => {
                Ok(AdminAuth)
            }
            _ => {
                warn!(path = %parts.uri.path(), "Rejected admin request");
                Err(ApiError::Unauthorized)
            }
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
