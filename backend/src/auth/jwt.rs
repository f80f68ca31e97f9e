//! JWT token generation and validation
//!
//! Access and refresh tokens share one claim shape and one HS256 key.
//! Decoding is type-parametrised: [`JwtService::decode_as`] with
//! [`Refresh`] never yields an access token and vice versa.

use super::clock::{Clock, SystemClock};
use anyhow::Result;
use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

/// Signing algorithm for every token this service issues
pub const ALGORITHM: Algorithm = Algorithm::HS256;

/// JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Token type: "access" or "refresh"
    #[serde(rename = "type")]
    pub token_type: String,
    /// Unique token ID; keeps two tokens minted in the same second distinct
    pub jti: String,
}

/// Kind of bearer token, fixed at the type level
pub trait TokenKind {
    /// Value of the `type` claim
    const TYPE: &'static str;
}

/// Short-lived API credential
#[derive(Debug, Clone, Copy)]
pub enum Access {}

/// Long-lived credential exchanged for a new token pair
#[derive(Debug, Clone, Copy)]
pub enum Refresh {}

impl TokenKind for Access {
    const TYPE: &'static str = "access";
}

impl TokenKind for Refresh {
    const TYPE: &'static str = "refresh";
}

/// Claims whose `type` has been checked against `K`
pub struct TokenClaims<K> {
    claims: Claims,
    kind: PhantomData<fn() -> K>,
}

impl<K> TokenClaims<K> {
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn subject(&self) -> &str {
        &self.claims.sub
    }

    /// Subject parsed as a user ID
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.claims.sub).ok()
    }
}

impl<K> Clone for TokenClaims<K> {
    fn clone(&self) -> Self {
        Self {
            claims: self.claims.clone(),
            kind: PhantomData,
        }
    }
}

impl<K: TokenKind> fmt::Debug for TokenClaims<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClaims")
            .field("kind", &K::TYPE)
            .field("claims", &self.claims)
            .finish()
    }
}

/// Pre-computed JWT keys for efficient token operations
/// These are expensive to create, so we cache them in AppState
#[derive(Clone)]
pub struct JwtKeys {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
}

impl JwtKeys {
    /// Create new JWT keys from secret
    /// This should be called once at startup
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
        }
    }

    pub fn encoding(&self) -> &EncodingKey {
        &self.encoding
    }

    pub fn decoding(&self) -> &DecodingKey {
        &self.decoding
    }
}

/// Token lifetimes
#[derive(Debug, Clone, Copy)]
pub struct TokenLifetimes {
    pub access_token_expiry_secs: i64,
    pub refresh_token_expiry_secs: i64,
}

/// JWT service for token operations
///
/// Keys are derived once and shared behind `Arc`, so cloning is cheap.
#[derive(Clone)]
pub struct JwtService {
    keys: JwtKeys,
    lifetimes: TokenLifetimes,
    validation: Arc<Validation>,
    clock: Arc<dyn Clock>,
}

impl JwtService {
    /// Create a new JWT service reading the wall clock
    ///
    /// Call this once at application startup and store in AppState.
    pub fn new(secret: &str, access_token_expiry_secs: i64, refresh_token_expiry_secs: i64) -> Self {
        Self::with_clock(
            secret,
            access_token_expiry_secs,
            refresh_token_expiry_secs,
            Arc::new(SystemClock),
        )
    }

    /// Create a JWT service with an explicit time source
    pub fn with_clock(
        secret: &str,
        access_token_expiry_secs: i64,
        refresh_token_expiry_secs: i64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        // Expiry is checked against `clock` in `decode`, not by jsonwebtoken,
        // so the presence of `exp` is still required here.
        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            keys: JwtKeys::new(secret),
            lifetimes: TokenLifetimes {
                access_token_expiry_secs,
                refresh_token_expiry_secs,
            },
            validation: Arc::new(validation),
            clock,
        }
    }

    /// Issue an access token for a user
    #[inline]
    pub fn issue_access(&self, user_id: Uuid) -> Result<String> {
        self.issue::<Access>(user_id, self.lifetimes.access_token_expiry_secs)
    }

    /// Issue a refresh token for a user
    #[inline]
    pub fn issue_refresh(&self, user_id: Uuid) -> Result<String> {
        self.issue::<Refresh>(user_id, self.lifetimes.refresh_token_expiry_secs)
    }

    fn issue<K: TokenKind>(&self, user_id: Uuid, expiry_secs: i64) -> Result<String> {
        let now = self.clock.now();
        let exp = now + Duration::seconds(expiry_secs);

        let claims = Claims {
            sub: user_id.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            token_type: K::TYPE.to_string(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(ALGORITHM), &claims, self.keys.encoding())
            .map_err(|e| anyhow::anyhow!("Failed to generate {} token: {}", K::TYPE, e))
    }

    /// Verify signature and expiry; `None` on any failure
    ///
    /// Does not look at the `type` claim. Prefer [`JwtService::decode_as`].
    pub fn decode(&self, token: &str) -> Option<Claims> {
        let claims = decode::<Claims>(token, self.keys.decoding(), &self.validation)
            .map_err(|e| tracing::debug!(error = %e, "token rejected"))
            .ok()?
            .claims;

        if claims.exp <= self.clock.now().timestamp() {
            tracing::debug!(sub = %claims.sub, "token expired");
            return None;
        }
        Some(claims)
    }

    /// Decode a token that must be of kind `K`
    pub fn decode_as<K: TokenKind>(&self, token: &str) -> Option<TokenClaims<K>> {
        let claims = self.decode(token)?;
        if claims.token_type != K::TYPE {
            tracing::debug!(
                expected = K::TYPE,
                actual = %claims.token_type,
                "token kind mismatch"
            );
            return None;
        }
        Some(TokenClaims {
            claims,
            kind: PhantomData,
        })
    }

    /// Access token lifetime in seconds
    #[inline]
    pub fn access_token_expiry_secs(&self) -> i64 {
        self.lifetimes.access_token_expiry_secs
    }

    /// Refresh token lifetime in seconds
    #[inline]
    pub fn refresh_token_expiry_secs(&self) -> i64 {
        self.lifetimes.refresh_token_expiry_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use proptest::prelude::*;

    fn create_test_service() -> JwtService {
        JwtService::new("test-secret", 1800, 604800)
    }

    fn create_clocked_service() -> (JwtService, ManualClock) {
        let clock = ManualClock::new();
        let service = JwtService::with_clock("test-secret", 1800, 604800, Arc::new(clock.clone()));
        (service, clock)
    }

    #[test]
    fn test_issue_and_decode_access_token() {
        let service = create_test_service();
        let user_id = Uuid::new_v4();

        let token = service.issue_access(user_id).unwrap();
        let claims = service.decode(&token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.token_type, "access");
    }

    #[test]
    fn test_issue_and_decode_refresh_token() {
        let service = create_test_service();
        let user_id = Uuid::new_v4();

        let token = service.issue_refresh(user_id).unwrap();
        let claims = service.decode_as::<Refresh>(&token).unwrap();

        assert_eq!(claims.user_id(), Some(user_id));
        assert_eq!(claims.claims().token_type, "refresh");
    }

    #[test]
    fn test_type_parametrised_decode_rejects_other_kind() {
        let service = create_test_service();
        let user_id = Uuid::new_v4();

        let access = service.issue_access(user_id).unwrap();
        let refresh = service.issue_refresh(user_id).unwrap();

        assert!(service.decode_as::<Refresh>(&access).is_none());
        assert!(service.decode_as::<Access>(&refresh).is_none());
        // The untyped codec accepts both
        assert!(service.decode(&access).is_some());
        assert!(service.decode(&refresh).is_some());
    }

    #[test]
    fn test_access_token_expires_after_ttl() {
        let (service, clock) = create_clocked_service();
        let token = service.issue_access(Uuid::new_v4()).unwrap();

        clock.advance(Duration::seconds(1799));
        assert!(service.decode(&token).is_some());

        clock.advance(Duration::seconds(1));
        assert!(service.decode(&token).is_none());
    }

    #[test]
    fn test_refresh_token_outlives_access_token() {
        let (service, clock) = create_clocked_service();
        let user_id = Uuid::new_v4();
        let access = service.issue_access(user_id).unwrap();
        let refresh = service.issue_refresh(user_id).unwrap();

        clock.advance(Duration::hours(1));

        assert!(service.decode_as::<Access>(&access).is_none());
        assert!(service.decode_as::<Refresh>(&refresh).is_some());
    }

    #[test]
    fn test_tokens_for_same_subject_are_distinct() {
        let service = create_test_service();
        let user_id = Uuid::new_v4();

        let first = service.issue_refresh(user_id).unwrap();
        let second = service.issue_refresh(user_id).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_invalid_token_rejected() {
        let service = create_test_service();
        assert!(service.decode("invalid.token.here").is_none());
        assert!(service.decode("").is_none());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let service = create_test_service();
        let other = JwtService::new("another-secret", 1800, 604800);

        let token = other.issue_access(Uuid::new_v4()).unwrap();

        assert!(service.decode(&token).is_none());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let service = create_test_service();
        let token = service.issue_access(Uuid::new_v4()).unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let forged = create_test_service().issue_refresh(Uuid::new_v4()).unwrap();
        parts[1] = forged.split('.').nth(1).unwrap().to_string();
        let tampered = parts.join(".");

        // Same secret, but the signature covers the original payload
        assert!(service.decode(&tampered).is_none());
    }

    #[test]
    fn test_service_is_clone_cheap() {
        let service = create_test_service();
        let _cloned = service.clone();
    }

    proptest! {
        #[test]
        fn prop_round_trip_preserves_subject(raw in any::<u128>()) {
            let service = create_test_service();
            let user_id = Uuid::from_u128(raw);

            let token = service.issue_access(user_id).unwrap();
            let claims = service.decode_as::<Access>(&token).unwrap();

            prop_assert_eq!(claims.subject(), user_id.to_string());
        }

        #[test]
        fn prop_garbage_never_decodes(token in "[a-zA-Z0-9_-]{1,40}(\\.[a-zA-Z0-9_-]{1,40}){0,3}") {
            let service = create_test_service();
            prop_assert!(service.decode(&token).is_none());
        }
    }
}
