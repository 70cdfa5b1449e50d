//! JWT authentication module.
//!
//! Handles token generation and validation, and the extractors that turn a
//! bearer token into a [`Principal`].
//!
//! ## Request Flow
//! ```text
//! Authorization: Bearer <jwt>
//!        │
//!        ▼
//! JwtManager::validate_token ──► Claims { sub = user id }
//!        │
//!        ▼
//! db.users().get(sub) ──► must exist and be active
//!        │
//!        ▼
//! AuthUser(Principal) ──► AdminUser when the role is admin
//! ```

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use stockroom_core::{Principal, User, UserStatus};
use stockroom_db::DbError;
use tracing::{debug, Span};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Role name at the time of login
    pub role: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

/// JWT token manager.
#[derive(Debug, Clone)]
pub struct JwtManager {
    secret: String,
    lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(secret: String, lifetime_secs: i64) -> Self {
        JwtManager {
            secret,
            lifetime_secs,
        }
    }

    /// Generate an access token for a user.
    pub fn generate_token(&self, user: &User) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: user.id.clone(),
            role: user.role_name.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let validation = Validation::default();

        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| ApiError::unauthenticated(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// =============================================================================
// Extractors
// =============================================================================

/// An authenticated, active user.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

/// An authenticated user holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Principal);

/// A principal when a bearer token is present. A present but invalid token
/// is still rejected.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<Principal>);

async fn principal_from_token(state: &AppState, token: &str) -> Result<Principal, ApiError> {
    let claims = state.jwt.validate_token(token)?;

    let user = match state.db.users().get(&claims.sub).await {
        Ok(user) => user,
        Err(DbError::NotFound { .. }) => {
            return Err(ApiError::unauthenticated("User no longer exists"))
        }
        Err(e) => return Err(e.into()),
    };
    if user.status != UserStatus::Active {
        return Err(ApiError::unauthenticated("User is not active"));
    }

    Span::current().record("user_id", user.id.as_str());
    debug!(user_id = %user.id, role = %user.role_name, "Authenticated request");
    Ok(Principal::from(&user))
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, ApiError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let header = header
        .to_str()
        .map_err(|_| ApiError::unauthenticated("Invalid authorization header"))?;
    extract_bearer_token(header)
        .map(Some)
        .ok_or_else(|| ApiError::unauthenticated("Expected a bearer token"))
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?
            .ok_or_else(|| ApiError::unauthenticated("Authentication required"))?;
        Ok(AuthUser(principal_from_token(state, token).await?))
    }
}

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(principal) = AuthUser::from_request_parts(parts, state).await?;
        if !principal.is_admin() {
            return Err(ApiError::forbidden("Admin role required"));
        }
        Ok(AdminUser(principal))
    }
}

impl FromRequestParts<Arc<AppState>> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => Ok(MaybeAuthUser(Some(principal_from_token(state, token).await?))),
            None => Ok(MaybeAuthUser(None)),
        }
    }
}
