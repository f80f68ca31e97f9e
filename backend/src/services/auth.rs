//! Authentication service
//!
//! Register, login, refresh, logout and logout-all over the user store, the
//! JWT codec and the refresh-token whitelist.
//!
//! Refresh tokens rotate: every successful refresh consumes the presented
//! token and whitelists a new one, so a stolen token stops working after
//! the legitimate client has used it. Access tokens are never tracked and
//! stay valid until they expire, even after logout.

use crate::auth::{
    seed_accounts, Consumed, JwtService, PasswordService, Refresh, RevocationStore,
};
use crate::error::ApiError;
use crate::repositories::{CreateUserError, NewUser, UserRecord, UserStore};
use reelforge_shared::{validation, AuthError, AuthTokens, MessageResponse, UserProfile};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Authentication service
///
/// Cheap to clone; every field is shared behind `Arc`.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    jwt: JwtService,
    revocation: RevocationStore,
    seed_accounts: bool,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        jwt: JwtService,
        revocation: RevocationStore,
        seed_accounts: bool,
    ) -> Self {
        Self {
            users,
            jwt,
            revocation,
            seed_accounts,
        }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    pub fn revocation(&self) -> &RevocationStore {
        &self.revocation
    }

    /// Register a new user
    ///
    /// Password hashing is offloaded to the blocking thread pool.
    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<UserProfile, ApiError> {
        let email = normalize_email(email);
        let username = username.trim();
        let full_name = full_name.map(str::trim).filter(|n| !n.is_empty());

        validation::validate_registration(&email, username, password, full_name)?;

        if self
            .users
            .get_by_email(&email)
            .await
            .map_err(ApiError::Internal)?
            .is_some()
        {
            metrics::counter!("auth_register_total", "outcome" => "conflict").increment(1);
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }
        if self
            .users
            .get_by_username(username)
            .await
            .map_err(ApiError::Internal)?
            .is_some()
        {
            metrics::counter!("auth_register_total", "outcome" => "conflict").increment(1);
            return Err(ApiError::Conflict("Username already taken".to_string()));
        }

        let password_hash = PasswordService::hash_async(password.to_string())
            .await
            .map_err(ApiError::Internal)?;

        let user = self
            .users
            .create(NewUser {
                email,
                username: username.to_string(),
                password_hash,
                full_name: full_name.map(str::to_string),
                is_superuser: false,
            })
            .await
            .map_err(conflict_from)?;

        metrics::counter!("auth_register_total", "outcome" => "success").increment(1);
        info!(user_id = %user.id, "user registered");
        Ok(user.to_profile())
    }

    /// Login with email and password
    ///
    /// Unknown email, wrong password and inactive account all produce the
    /// same `Unauthorized` response.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthTokens, ApiError> {
        let email = normalize_email(email);

        let user = match self
            .users
            .get_by_email(&email)
            .await
            .map_err(ApiError::Internal)?
        {
            Some(user) => {
                let valid =
                    PasswordService::verify_async(password.to_string(), user.password_hash.clone())
                        .await
                        .map_err(ApiError::Internal)?;
                if !valid {
                    return Err(login_failed(AuthError::InvalidCredentials));
                }
                user
            }
            None => match self.provision_seed_account(&email, password).await? {
                Some(user) => user,
                None => {
                    PasswordService::dummy_verify(password.to_string())
                        .await
                        .map_err(ApiError::Internal)?;
                    return Err(login_failed(AuthError::InvalidCredentials));
                }
            },
        };

        if !user.is_active {
            return Err(login_failed(AuthError::InactiveUser));
        }

        let tokens = self.issue_pair(user.id).await?;
        metrics::counter!("auth_login_total", "outcome" => "success").increment(1);
        info!(user_id = %user.id, "user logged in");
        Ok(tokens)
    }

    /// Exchange a refresh token for a new token pair
    ///
    /// The presented token is consumed with an atomic test-and-delete, so
    /// of several concurrent refreshes with one token exactly one succeeds.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, ApiError> {
        let claims = self
            .jwt
            .decode_as::<Refresh>(refresh_token)
            .ok_or_else(|| refresh_failed(AuthError::InvalidToken))?;
        let user_id = claims
            .user_id()
            .ok_or_else(|| refresh_failed(AuthError::InvalidToken))?;

        match self.revocation.consume(user_id, refresh_token).await {
            Consumed::Consumed => {}
            Consumed::Missing => {
                warn!(%user_id, "rotated or revoked refresh token presented");
                return Err(refresh_failed(AuthError::TokenRevoked));
            }
            Consumed::Unavailable if self.revocation.fail_open() => {
                warn!(%user_id, "revocation store unavailable; accepting refresh token on signature alone");
            }
            Consumed::Unavailable => {
                return Err(refresh_failed(AuthError::TokenRevoked));
            }
        }

        let user = self
            .users
            .get_by_id(user_id)
            .await
            .map_err(ApiError::Internal)?
            .filter(|user| user.is_active)
            .ok_or_else(|| refresh_failed(AuthError::UserNotFound))?;

        let tokens = self.issue_pair(user.id).await?;
        metrics::counter!("auth_refresh_total", "outcome" => "success").increment(1);
        Ok(tokens)
    }

    /// Revoke one refresh token
    ///
    /// Idempotent: revoking an already revoked or expired entry succeeds.
    pub async fn logout(&self, refresh_token: &str) -> Result<MessageResponse, ApiError> {
        let user_id = self
            .jwt
            .decode_as::<Refresh>(refresh_token)
            .and_then(|claims| claims.user_id())
            .ok_or_else(|| ApiError::BadRequest("Invalid refresh token".to_string()))?;

        self.revocation.revoke(user_id, refresh_token).await;

        metrics::counter!("auth_logout_total", "scope" => "single").increment(1);
        info!(%user_id, "user logged out");
        Ok(MessageResponse::new("Successfully logged out"))
    }

    /// Revoke every refresh token of `user_id`
    pub async fn logout_all(&self, user_id: Uuid) -> Result<MessageResponse, ApiError> {
        self.revocation.revoke_all(user_id).await;

        metrics::counter!("auth_logout_total", "scope" => "all").increment(1);
        info!(%user_id, "user logged out from all devices");
        Ok(MessageResponse::new("Successfully logged out from all devices"))
    }

    /// Load the active user behind an authenticated request
    pub async fn current_user(&self, user_id: Uuid) -> Result<UserRecord, ApiError> {
        let user = self
            .users
            .get_by_id(user_id)
            .await
            .map_err(ApiError::Internal)?
            .ok_or(AuthError::UserNotFound)?;

        if !user.is_active {
            return Err(ApiError::BadRequest("Inactive user".to_string()));
        }
        Ok(user)
    }

    async fn issue_pair(&self, user_id: Uuid) -> Result<AuthTokens, ApiError> {
        let access_token = self.jwt.issue_access(user_id).map_err(ApiError::Internal)?;
        let refresh_token = self.jwt.issue_refresh(user_id).map_err(ApiError::Internal)?;

        let whitelisted = self
            .revocation
            .whitelist(user_id, &refresh_token, self.jwt.refresh_token_expiry_secs())
            .await;
        if !whitelisted && self.revocation.is_available() {
            warn!(%user_id, "refresh token could not be whitelisted");
        }

        Ok(AuthTokens::bearer(
            access_token,
            refresh_token,
            self.jwt.access_token_expiry_secs(),
        ))
    }

    /// Create the seed account matching these credentials, if enabled
    async fn provision_seed_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, ApiError> {
        if !self.seed_accounts {
            return Ok(None);
        }
        let Some(account) = seed_accounts::verify_credentials(email, password) else {
            return Ok(None);
        };

        let password_hash = PasswordService::hash_async(account.password.to_string())
            .await
            .map_err(ApiError::Internal)?;

        let created = self
            .users
            .create(NewUser {
                email: account.email.to_string(),
                username: account.username.to_string(),
                password_hash,
                full_name: Some(account.full_name().to_string()),
                is_superuser: account.is_superuser(),
            })
            .await;

        match created {
            Ok(user) => {
                info!(user_id = %user.id, email = account.email, "provisioned seed account");
                Ok(Some(user))
            }
            // Another request provisioned it first
            Err(CreateUserError::Duplicate(_)) => self
                .users
                .get_by_email(account.email)
                .await
                .map_err(ApiError::Internal),
            Err(CreateUserError::Other(e)) => Err(ApiError::Internal(e)),
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Map a racing insert that lost on a unique column
fn conflict_from(err: CreateUserError) -> ApiError {
    if matches!(err, CreateUserError::Duplicate(_)) {
        metrics::counter!("auth_register_total", "outcome" => "conflict").increment(1);
    }
    match err {
        CreateUserError::Duplicate("username") => {
            ApiError::Conflict("Username already taken".to_string())
        }
        CreateUserError::Duplicate(_) => ApiError::Conflict("Email already registered".to_string()),
        CreateUserError::Other(e) => ApiError::Internal(e),
    }
}

fn login_failed(reason: AuthError) -> ApiError {
    metrics::counter!("auth_login_total", "outcome" => "failure").increment(1);
    reason.into()
}

fn refresh_failed(reason: AuthError) -> ApiError {
    metrics::counter!("auth_refresh_total", "outcome" => "failure").increment(1);
    reason.into()
}
