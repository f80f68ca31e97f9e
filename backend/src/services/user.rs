//! User profile service
//!
//! Reads and updates user profiles on behalf of an authenticated caller.

use crate::error::ApiError;
use crate::repositories::{UpdateUser, UserRecord, UserStore};
use reelforge_shared::{validation, UpdateProfileRequest, UserProfile};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// User profile service
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Public profile of the authenticated user
    pub fn me(&self, user: &UserRecord) -> UserProfile {
        user.to_profile()
    }

    /// Apply a partial profile update for `user_id`
    pub async fn update_me(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<UserProfile, ApiError> {
        let full_name = request.full_name.map(|n| n.trim().to_string());
        let avatar_url = request.avatar_url.map(|u| u.trim().to_string());
        validation::validate_profile_update(
            full_name.as_deref(),
            request.bio.as_deref(),
            avatar_url.as_deref(),
        )?;

        let user = self
            .users
            .update(
                user_id,
                UpdateUser {
                    full_name,
                    bio: request.bio,
                    avatar_url,
                },
            )
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        info!(%user_id, "profile updated");
        Ok(user.to_profile())
    }

    /// Look up another user's profile
    ///
    /// Only the user themselves or a superuser may read it.
    pub async fn get_by_id(
        &self,
        caller: &UserRecord,
        user_id: Uuid,
    ) -> Result<UserProfile, ApiError> {
        if caller.id != user_id && !caller.is_superuser {
            return Err(ApiError::Forbidden("Not enough permissions".to_string()));
        }

        self.users
            .get_by_id(user_id)
            .await
            .map_err(ApiError::Internal)?
            .map(|user| user.to_profile())
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }
}
