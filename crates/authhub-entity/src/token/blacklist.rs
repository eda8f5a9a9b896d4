//! Persistence contract for revoked refresh tokens.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use authhub_core::result::AppResult;

/// Storage of revoked refresh-token ids.
///
/// Once a jti is revoked it must never pass verification again, even
/// before its natural expiry. Revoking an already-revoked jti is a no-op
/// success.
#[async_trait]
pub trait BlacklistStore: Send + Sync {
    /// Records a jti as revoked, remembering the token's natural expiry.
    async fn revoke(&self, jti: Uuid, expires_at: DateTime<Utc>) -> AppResult<()>;

    /// Checks whether a jti has been revoked.
    async fn is_revoked(&self, jti: Uuid) -> AppResult<bool>;

    /// Removes entries whose tokens have passed their natural expiry.
    ///
    /// Purging is a retention optimization, not a correctness requirement:
    /// an expired token fails verification regardless of blacklist state.
    /// Returns the number of entries removed.
    async fn purge_expired(&self) -> AppResult<u64>;
}
