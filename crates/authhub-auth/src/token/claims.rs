//! JWT claims structure used in access and refresh tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims payload embedded in every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject — the user ID.
    pub sub: i64,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// Token type: "access" or "refresh".
    pub token_type: TokenType,
    /// Unique token id, present on refresh tokens only. Used as the
    /// blacklist key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<Uuid>,
}

/// Distinguishes access tokens from refresh tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived access token for API requests.
    Access,
    /// Long-lived refresh token for obtaining new access tokens.
    Refresh,
}

impl Claims {
    /// Returns the user ID from the subject claim.
    pub fn user_id(&self) -> i64 {
        self.sub
    }

    /// Returns the expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }

    /// Checks whether this token has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_claims_omit_jti() {
        let claims = Claims {
            sub: 42,
            iat: 1_700_000_000,
            exp: 1_700_000_900,
            token_type: TokenType::Access,
            jti: None,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("jti").is_none());
        assert_eq!(json["token_type"], "access");
    }

    #[test]
    fn test_refresh_claims_carry_jti() {
        let jti = Uuid::new_v4();
        let claims = Claims {
            sub: 42,
            iat: 1_700_000_000,
            exp: 1_700_604_800,
            token_type: TokenType::Refresh,
            jti: Some(jti),
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["jti"], jti.to_string());
        assert_eq!(json["token_type"], "refresh");
    }
}
