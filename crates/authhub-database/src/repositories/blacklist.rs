//! Refresh-token blacklist repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use authhub_core::error::{AppError, ErrorKind};
use authhub_core::result::AppResult;
use authhub_entity::token::BlacklistStore;

/// Postgres-backed blacklist of revoked refresh-token ids.
#[derive(Debug, Clone)]
pub struct BlacklistRepository {
    pool: PgPool,
}

impl BlacklistRepository {
    /// Create a new blacklist repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlacklistStore for BlacklistRepository {
    /// Record a jti as revoked. Re-revoking is a no-op success.
    async fn revoke(&self, jti: Uuid, expires_at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO token_blacklist (jti, expires_at, revoked_at) \
             VALUES ($1, $2, NOW()) \
             ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to revoke token", e))?;
        Ok(())
    }

    /// Check whether a jti has been revoked.
    async fn is_revoked(&self, jti: Uuid) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM token_blacklist WHERE jti = $1)",
        )
        .bind(jti)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to check blacklist", e))
    }

    /// Delete entries whose tokens have passed their natural expiry.
    async fn purge_expired(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM token_blacklist WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to purge blacklist", e)
            })?;

        let purged = result.rows_affected();
        if purged > 0 {
            info!(purged, "Purged expired blacklist entries");
        }
        Ok(purged)
    }
}
