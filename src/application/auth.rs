//! Auth service: signup, login, and bearer-token verification.
//!
//! Tokens are HS256 JWTs carrying the user id and email, expiring 24
//! hours after issuance. Verification is stateless apart from resolving
//! the embedded user id against the store.
//!
//! There is no auth middleware; `authorize` is an explicit request guard
//! called at the top of each protected handler, returning the full user
//! record on success.

use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::domain::password::{hash_password, verify_password};
use crate::domain::{LoginRequest, SignupRequest, User};
use crate::ports::Store;
use crate::ApiError;

const TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// Why a request failed authentication. All variants map to 401; they are
/// distinguished for diagnostic clarity only.
#[derive(Debug, thiserror::Error)]
pub enum AuthFailure {
    #[error("Token is missing")]
    MissingHeader,

    #[error("Invalid token format")]
    BadHeaderFormat,

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token")]
    Malformed,

    #[error("User not found")]
    UnknownUser,

    #[error("Invalid email or password")]
    BadCredentials,
}

/// JWT claims: user id (hex), email, issue and expiry instants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Token issuance, credential checks, and the bearer request guard.
pub struct AuthService<S> {
    store: Arc<S>,
    secret: String,
}

impl<S: Store> AuthService<S> {
    pub fn new(store: Arc<S>, secret: String) -> Self {
        Self { store, secret }
    }

    /// Create a user and issue their first token.
    ///
    /// # Errors
    /// `Conflict` if the email is already registered.
    pub async fn signup(&self, request: SignupRequest) -> Result<(String, User), ApiError> {
        if self
            .store
            .find_user_by_email(&request.email)
            .await?
            .is_some()
        {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }

        let hash = hash_password(&request.password)
            .map_err(|e| ApiError::Dependency(e.to_string()))?;
        let user = User::new(request.email, hash, request.name);
        self.store.create_user(&user).await?;

        tracing::info!("New user registered: {}", user.email);
        let token = self.issue(user.id, &user.email)?;
        Ok((token, user))
    }

    /// Verify credentials and issue a token.
    ///
    /// Unknown email and wrong password are indistinguishable to the
    /// caller. The stored hash never leaves this function.
    ///
    /// # Errors
    /// `Auth(BadCredentials)` on any credential mismatch.
    pub async fn login(&self, request: LoginRequest) -> Result<(String, User), ApiError> {
        let user = self
            .store
            .find_user_by_email(&request.email)
            .await?
            .ok_or(AuthFailure::BadCredentials)?;

        if !verify_password(&request.password, &user.password) {
            return Err(AuthFailure::BadCredentials.into());
        }

        tracing::info!("User authenticated: {}", user.email);
        let token = self.issue(user.id, &user.email)?;
        Ok((token, user))
    }

    /// Issue a signed token for `user_id`, expiring in 24 hours.
    ///
    /// # Errors
    /// `Dependency` if signing fails.
    pub fn issue(&self, user_id: ObjectId, email: &str) -> Result<String, ApiError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_hex(),
            email: email.to_string(),
            iat: now,
            exp: now + TOKEN_TTL_SECS,
        };
        self.encode_claims(&claims)
    }

    /// Explicit request guard: resolve the bearer token in `headers` to a
    /// stored user.
    ///
    /// # Errors
    /// `Auth` for a missing, misformatted, expired, or invalid token, or
    /// when the embedded user id matches no stored record.
    pub async fn authorize(&self, headers: &HeaderMap) -> Result<User, ApiError> {
        let raw = headers
            .get(AUTHORIZATION)
            .ok_or(AuthFailure::MissingHeader)?
            .to_str()
            .map_err(|_| AuthFailure::BadHeaderFormat)?;
        let token = raw
            .strip_prefix("Bearer ")
            .ok_or(AuthFailure::BadHeaderFormat)?;

        let claims = self.decode_claims(token)?;
        let user_id = ObjectId::parse_str(&claims.sub).map_err(|_| AuthFailure::Malformed)?;

        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthFailure::UnknownUser)?;

        tracing::debug!("Authorized request for {}", user.email);
        Ok(user)
    }

    fn encode_claims(&self, claims: &Claims) -> Result<String, ApiError> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::Dependency(format!("Token signing failed: {e}")))
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, AuthFailure> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthFailure::Expired,
            _ => AuthFailure::Malformed,
        })
    }
}
