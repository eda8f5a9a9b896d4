//! In-memory blacklist using a Tokio mutex for single-node deployments.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use authhub_core::result::AppResult;
use authhub_entity::token::BlacklistStore;

/// In-memory blacklist of revoked refresh-token ids.
///
/// Suitable for single-node deployments only; multi-node setups use the
/// database-backed repository.
#[derive(Debug, Clone)]
pub struct MemoryBlacklist {
    /// Revoked jtis mapped to their token's natural expiry.
    entries: Arc<Mutex<HashMap<Uuid, DateTime<Utc>>>>,
}

impl MemoryBlacklist {
    /// Creates a new empty in-memory blacklist.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for MemoryBlacklist {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlacklistStore for MemoryBlacklist {
    async fn revoke(&self, jti: Uuid, expires_at: DateTime<Utc>) -> AppResult<()> {
        let mut entries = self.entries.lock().await;
        // Idempotent: re-revoking keeps the original entry.
        entries.entry(jti).or_insert(expires_at);
        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> AppResult<bool> {
        let entries = self.entries.lock().await;
        Ok(entries.contains_key(&jti))
    }

    async fn purge_expired(&self) -> AppResult<u64> {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        let purged = (before - entries.len()) as u64;

        if purged > 0 {
            info!(purged, "Purged expired blacklist entries");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_revoke_and_check() {
        let blacklist = MemoryBlacklist::new();
        let jti = Uuid::new_v4();

        assert!(!blacklist.is_revoked(jti).await.unwrap());
        blacklist
            .revoke(jti, Utc::now() + chrono::Duration::days(7))
            .await
            .unwrap();
        assert!(blacklist.is_revoked(jti).await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let blacklist = MemoryBlacklist::new();
        let jti = Uuid::new_v4();
        let expiry = Utc::now() + chrono::Duration::days(7);

        blacklist.revoke(jti, expiry).await.unwrap();
        blacklist.revoke(jti, expiry).await.unwrap();
        assert!(blacklist.is_revoked(jti).await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_removes_only_expired() {
        let blacklist = MemoryBlacklist::new();
        let stale = Uuid::new_v4();
        let live = Uuid::new_v4();

        blacklist
            .revoke(stale, Utc::now() - chrono::Duration::hours(1))
            .await
            .unwrap();
        blacklist
            .revoke(live, Utc::now() + chrono::Duration::hours(1))
            .await
            .unwrap();

        let purged = blacklist.purge_expired().await.unwrap();
        assert_eq!(purged, 1);
        assert!(!blacklist.is_revoked(stale).await.unwrap());
        assert!(blacklist.is_revoked(live).await.unwrap());
    }
}
