//! Persistence contract for user credentials.

use async_trait::async_trait;

use authhub_core::result::AppResult;

use super::model::{NewUser, User, UserUpdate};

/// Storage of user identity and hashed credentials.
///
/// All mutations are durable before the call returns. `create` must be
/// atomic under the email uniqueness constraint: of two concurrent
/// registrations for the same normalized email, exactly one succeeds and
/// the other fails with a conflict on the `email` field.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Persists a new user. Fails with a conflict error when the normalized
    /// email is already taken.
    async fn create(&self, user: NewUser) -> AppResult<User>;

    /// Looks up a user by email, case-insensitively.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Looks up a user by primary key.
    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>>;

    /// Applies a partial update; absent fields are preserved.
    async fn update(&self, id: i64, update: &UserUpdate) -> AppResult<User>;
}
