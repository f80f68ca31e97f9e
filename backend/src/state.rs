//! Application state management
//!
//! This module provides the shared application state that is passed
//! to all request handlers via Axum's state extraction.
//!
//! Everything here is built once at startup and is cheap to clone: the pool
//! and the services hold their resources behind `Arc`.

use crate::auth::{Clock, JwtService, RevocationStore, SystemClock};
use crate::config::AppConfig;
use crate::repositories::{PgUserRepository, UserStore};
use crate::services::{AuthService, UserService};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Pre-initialized JWT service with cached keys
    pub jwt: JwtService,
    /// Refresh-token whitelist
    pub revocation: RevocationStore,
    pub auth: AuthService,
    pub users: UserService,
    /// Prometheus render handle; `None` when no recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create the production state backed by PostgreSQL
    ///
    /// JWT keys are derived from the config secret here, once.
    pub fn new(db: PgPool, revocation: RevocationStore, config: AppConfig) -> Self {
        let users = Arc::new(PgUserRepository::new(db.clone()));
        Self::with_store(db, users, revocation, config, Arc::new(SystemClock))
    }

    /// Create state over an arbitrary user store and time source
    pub fn with_store(
        db: PgPool,
        users: Arc<dyn UserStore>,
        revocation: RevocationStore,
        config: AppConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let jwt = JwtService::with_clock(
            &config.jwt.secret,
            config.jwt.access_token_expiry_secs,
            config.jwt.refresh_token_expiry_secs,
            clock,
        );
        let auth = AuthService::new(
            users.clone(),
            jwt.clone(),
            revocation.clone(),
            config.auth.seed_accounts,
        );

        Self {
            db,
            config: Arc::new(config),
            jwt,
            revocation,
            auth,
            users: UserService::new(users),
            metrics: None,
        }
    }

    /// Attach the Prometheus handle served on `/metrics`
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    #[inline]
    pub fn db(&self) -> &PgPool {
        &self.db
    }

    #[inline]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[inline]
    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    #[inline]
    pub fn revocation(&self) -> &RevocationStore {
        &self.revocation
    }

    #[inline]
    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    #[inline]
    pub fn users(&self) -> &UserService {
        &self.users
    }
}
