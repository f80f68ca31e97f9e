//! Authentication routes
//!
//! Registration, login, token refresh and logout. Login takes the
//! OAuth2 password form (`username` carries the email); everything else
//! speaks JSON.

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Form, Json, Router,
};
use reelforge_shared::{AuthTokens, MessageResponse, RefreshTokenRequest, UserProfile};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Create auth routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh_token))
        .route("/logout", post(logout))
        .route("/logout-all", post(logout_all))
        .route("/me", get(get_current_user))
}

/// Registration body
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: SecretString,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// OAuth2 password-grant form
#[derive(Deserialize)]
pub struct LoginForm {
    /// The account email
    pub username: String,
    pub password: SecretString,
}

/// Register a new user
///
/// POST /api/v1/auth/register
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    let profile = state
        .auth()
        .register(
            &req.email,
            &req.username,
            req.password.expose_secret(),
            req.full_name.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Login with email and password
///
/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> ApiResult<Json<AuthTokens>> {
    let tokens = state
        .auth()
        .login(&form.username, form.password.expose_secret())
        .await?;
    Ok(Json(tokens))
}

/// Exchange a refresh token for a new pair
///
/// POST /api/v1/auth/refresh
async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> ApiResult<Json<AuthTokens>> {
    let tokens = state.auth().refresh(&req.refresh_token).await?;
    Ok(Json(tokens))
}

/// Revoke one refresh token
///
/// POST /api/v1/auth/logout
async fn logout(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let message = state.auth().logout(&req.refresh_token).await?;
    Ok(Json(message))
}

/// Revoke every refresh token of the caller
///
/// POST /api/v1/auth/logout-all
async fn logout_all(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Json<MessageResponse>> {
    let user = state.auth().current_user(auth_user.user_id).await?;
    let message = state.auth().logout_all(user.id).await?;
    Ok(Json(message))
}

/// Current user profile
///
/// GET /api/v1/auth/me
async fn get_current_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Json<UserProfile>> {
    let user = state.auth().current_user(auth_user.user_id).await?;
    Ok(Json(user.to_profile()))
}
