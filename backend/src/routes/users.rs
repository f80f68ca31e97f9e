//! User profile routes

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use reelforge_shared::{UpdateProfileRequest, UserProfile};
use uuid::Uuid;

/// Create user routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me).put(update_me))
        .route("/:user_id", get(get_user))
}

/// GET /api/v1/users/me
async fn get_me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Json<UserProfile>> {
    let user = state.auth().current_user(auth_user.user_id).await?;
    Ok(Json(state.users().me(&user)))
}

/// PUT /api/v1/users/me
async fn update_me(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UserProfile>> {
    let user = state.auth().current_user(auth_user.user_id).await?;
    let profile = state.users().update_me(user.id, req).await?;
    Ok(Json(profile))
}

/// GET /api/v1/users/{user_id}
///
/// Self or superuser only.
async fn get_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<UserProfile>> {
    let caller = state.auth().current_user(auth_user.user_id).await?;
    let profile = state.users().get_by_id(&caller, user_id).await?;
    Ok(Json(profile))
}
