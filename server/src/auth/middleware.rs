//! Authentication extractor.
//!
//! With `AUTH_SECRET` unset every request is let through. Otherwise the
//! request must carry `Authorization: Bearer <secret>`.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::AppError;
use crate::AppState;

/// Caller that passed the bearer check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthUser {
    /// No secret configured
    Anonymous,
    Operator,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(secret) = state.config.auth_secret.as_deref() else {
            return Ok(AuthUser::Anonymous);
        };

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::Unauthorized("Missing authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthorized("Invalid authorization header format"))?;

        if token.is_empty() {
            return Err(AppError::Unauthorized("Empty bearer token"));
        }
        if token != secret {
            return Err(AppError::Unauthorized("Invalid bearer token"));
        }

        Ok(AuthUser::Operator)
    }
}
