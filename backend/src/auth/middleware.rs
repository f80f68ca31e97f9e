//! Authentication extractor
//!
//! Validates the bearer access token with the pre-computed keys held in
//! AppState. Only access tokens are accepted here; a refresh token presented
//! as a bearer credential is rejected by the typed decoder.

use super::jwt::Access;
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::FromRef,
    http::{header::AUTHORIZATION, request::Parts},
};
use reelforge_shared::AuthError;
use uuid::Uuid;

/// Authenticated user extracted from a bearer access token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::MissingToken)?;

        let token = bearer_token(auth_header).ok_or(AuthError::InvalidToken)?;

        let user_id = app_state
            .jwt()
            .decode_as::<Access>(token)
            .and_then(|claims| claims.user_id())
            .ok_or(AuthError::InvalidToken)?;

        Ok(AuthUser { user_id })
    }
}

/// Token part of an `Authorization: Bearer <token>` header value
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
