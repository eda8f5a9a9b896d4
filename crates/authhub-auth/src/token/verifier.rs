//! JWT token validation and blacklist checking.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use thiserror::Error;

use authhub_core::config::auth::AuthConfig;
use authhub_core::error::AppError;
use authhub_entity::token::BlacklistStore;

use super::claims::{Claims, TokenType};

/// Why a presented token was rejected.
///
/// Callers that surface rejections to clients must collapse every variant
/// except `Store` into one generic message; the distinction exists for
/// logging and tests, not for responses.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token's expiry has passed.
    #[error("token has expired")]
    Expired,
    /// The token failed to parse or its signature did not verify.
    #[error("token signature is invalid")]
    BadSignature,
    /// The token is of a different type than required.
    #[error("unexpected token type")]
    WrongType,
    /// The token's jti has been blacklisted.
    #[error("token has been revoked")]
    Revoked,
    /// The blacklist store failed; a server fault, not a client one.
    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Store(e) => e,
            _ => AppError::authentication("Invalid token"),
        }
    }
}

/// Validates JWT tokens and checks blacklist status.
#[derive(Clone)]
pub struct TokenVerifier {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
    /// Blacklist consulted for refresh tokens.
    blacklist: Arc<dyn BlacklistStore>,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("validation", &self.validation)
            .finish()
    }
}

impl TokenVerifier {
    /// Creates a new verifier from auth configuration.
    pub fn new(config: &AuthConfig, blacklist: Arc<dyn BlacklistStore>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked manually after the type check, so the failure
        // order is signature, type, expiry, blacklist.
        validation.validate_exp = false;

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            blacklist,
        }
    }

    /// Decodes and validates a token, requiring the expected type.
    ///
    /// Checks, short-circuiting on the first failure:
    /// 1. Signature validity
    /// 2. Token type matches `expected`
    /// 3. Expiration
    /// 4. For refresh tokens, jti not in the blacklist
    pub async fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let claims = self.decode_token(token)?;

        if claims.token_type != expected {
            return Err(TokenError::WrongType);
        }

        if claims.is_expired() {
            return Err(TokenError::Expired);
        }

        if claims.token_type == TokenType::Refresh {
            let jti = claims.jti.ok_or(TokenError::BadSignature)?;
            if self.blacklist.is_revoked(jti).await? {
                return Err(TokenError::Revoked);
            }
        }

        Ok(claims)
    }

    /// Validates a refresh token for revocation, skipping the blacklist
    /// check.
    ///
    /// Logout uses this so revoking an already-revoked token stays a
    /// no-op success, while a forged or expired token still cannot
    /// blacklist arbitrary jtis.
    pub fn verify_for_revocation(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.decode_token(token)?;

        if claims.token_type != TokenType::Refresh {
            return Err(TokenError::WrongType);
        }

        if claims.is_expired() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    /// Internal decode without type or expiry checking.
    fn decode_token(&self, token: &str) -> Result<Claims, TokenError> {
        // Every parse failure folds into BadSignature: nothing in an
        // unverified token is trustworthy enough to report on.
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| TokenError::BadSignature)
    }
}
