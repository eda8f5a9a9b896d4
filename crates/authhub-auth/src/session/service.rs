//! Session lifecycle service — register, login, refresh, verify, logout,
//! and profile flows.

use std::sync::Arc;

use tracing::{info, warn};
use validator::ValidateEmail;

use authhub_core::error::{AppError, FieldErrors};
use authhub_core::result::AppResult;
use authhub_entity::token::BlacklistStore;
use authhub_entity::user::{CredentialStore, NewUser, UserUpdate, UserView};

use crate::password::{PasswordHasher, PasswordValidator};
use crate::token::issuer::{AccessToken, TokenIssuer, TokenPair};
use crate::token::verifier::TokenVerifier;
use crate::token::{Claims, TokenType};

/// Input for the registration flow.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RegisterRequest {
    /// Email address.
    pub email: String,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Plaintext password.
    pub password: String,
    /// Password confirmation; must match `password`.
    pub confirm_password: String,
}

/// Partial field set for a profile update.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ProfileUpdate {
    /// New email address.
    pub email: Option<String>,
    /// New first name.
    pub first_name: Option<String>,
    /// New last name.
    pub last_name: Option<String>,
    /// New plaintext password; re-validated and re-hashed.
    pub password: Option<String>,
}

/// Result of a successful registration or login.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LoginResult {
    /// Generated token pair.
    pub tokens: TokenPair,
    /// The authenticated user's public projection.
    pub user: UserView,
}

/// Orchestrates the authentication and session lifecycle.
///
/// Stateless between calls except through the credential and blacklist
/// stores; token work is pure computation over configuration.
#[derive(Clone)]
pub struct SessionService {
    /// User identity and hashed credentials.
    credentials: Arc<dyn CredentialStore>,
    /// Revoked refresh-token ids.
    blacklist: Arc<dyn BlacklistStore>,
    /// Password hasher.
    hasher: Arc<PasswordHasher>,
    /// Password policy.
    password_validator: PasswordValidator,
    /// Token issuer.
    issuer: Arc<TokenIssuer>,
    /// Token verifier; shares the blacklist store.
    verifier: Arc<TokenVerifier>,
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService").finish()
    }
}

/// The one message every credential failure collapses to, so responses
/// cannot be used to enumerate accounts.
const INVALID_CREDENTIALS: &str = "No active account found with the given credentials";

impl SessionService {
    /// Creates a new session service with all required dependencies.
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        blacklist: Arc<dyn BlacklistStore>,
        hasher: Arc<PasswordHasher>,
        password_validator: PasswordValidator,
        issuer: Arc<TokenIssuer>,
        verifier: Arc<TokenVerifier>,
    ) -> Self {
        Self {
            credentials,
            blacklist,
            hasher,
            password_validator,
            issuer,
            verifier,
        }
    }

    /// Registers a new user and logs them in.
    ///
    /// Field-level validation failures are collected into one error; no
    /// user record is created unless every check passes. A duplicate email
    /// surfaces as the store's conflict on the `email` field.
    pub async fn register(&self, request: RegisterRequest) -> AppResult<LoginResult> {
        let email = request.email.trim().to_lowercase();
        let first_name = request.first_name.trim().to_string();
        let last_name = request.last_name.trim().to_string();

        let mut errors = FieldErrors::new();

        if !email.validate_email() {
            push_error(&mut errors, "email", "Enter a valid email address");
        }
        if first_name.is_empty() {
            push_error(&mut errors, "first_name", "This field may not be blank");
        }
        if last_name.is_empty() {
            push_error(&mut errors, "last_name", "This field may not be blank");
        }
        if let Err(e) = self.password_validator.validate(&request.password) {
            push_error(&mut errors, "password", &e.message);
        }
        if request.password != request.confirm_password {
            push_error(&mut errors, "confirm_password", "Password fields didn't match");
        }

        if !errors.is_empty() {
            return Err(AppError::validation_fields(errors));
        }

        let password_hash = self.hasher.hash_password(&request.password)?;

        let user = self
            .credentials
            .create(NewUser {
                email,
                first_name,
                last_name,
                password_hash,
            })
            .await?;

        info!(user_id = user.id, "User registered");

        let tokens = self.issuer.issue_pair(user.id)?;
        Ok(LoginResult {
            tokens,
            user: user.view(),
        })
    }

    /// Authenticates a user and issues a token pair.
    ///
    /// Unknown email, wrong password, and deactivated account all return
    /// the identical error.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<LoginResult> {
        let user = self.credentials.find_by_email(email.trim()).await?;

        let Some(user) = user else {
            warn!("Login failed: unknown email");
            return Err(AppError::authentication(INVALID_CREDENTIALS));
        };

        if !user.is_active {
            warn!(user_id = user.id, "Login failed: account inactive");
            return Err(AppError::authentication(INVALID_CREDENTIALS));
        }

        if !self.hasher.verify_password(password, &user.password_hash) {
            warn!(user_id = user.id, "Login failed: password mismatch");
            return Err(AppError::authentication(INVALID_CREDENTIALS));
        }

        let tokens = self.issuer.issue_pair(user.id)?;
        info!(user_id = user.id, "Login successful");

        Ok(LoginResult {
            tokens,
            user: user.view(),
        })
    }

    /// Exchanges a valid refresh token for a new access token.
    ///
    /// The presented refresh token is not rotated; it stays valid until
    /// its own expiry or an explicit logout.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AccessToken> {
        let claims = self.verifier.verify(refresh_token, TokenType::Refresh).await?;

        let access = self.issuer.issue_access(claims.sub)?;
        info!(user_id = claims.sub, "Access token refreshed");
        Ok(access)
    }

    /// Introspects an access token. No side effects.
    pub async fn verify(&self, access_token: &str) -> AppResult<Claims> {
        Ok(self.verifier.verify(access_token, TokenType::Access).await?)
    }

    /// Revokes a refresh token.
    ///
    /// The token's signature, type, and expiry must check out before its
    /// jti is blacklisted, so nobody can revoke jtis they never held.
    /// Revoking an already-revoked token succeeds. Blacklist storage
    /// faults keep their database kind rather than masquerading as an
    /// invalid-token response.
    pub async fn logout(&self, refresh_token: &str) -> AppResult<()> {
        let claims = self.verifier.verify_for_revocation(refresh_token)?;
        let jti = claims
            .jti
            .ok_or_else(|| AppError::authentication("Invalid token"))?;

        self.blacklist.revoke(jti, claims.expires_at()).await?;
        info!(user_id = claims.sub, "Refresh token revoked");
        Ok(())
    }

    /// Returns the public projection of a user's profile.
    ///
    /// Access-token authentication happens in the HTTP collaborator
    /// before this is called.
    pub async fn profile(&self, user_id: i64) -> AppResult<UserView> {
        let user = self
            .credentials
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))?;

        Ok(user.view())
    }

    /// Applies a partial profile update.
    ///
    /// A supplied password is re-validated and re-hashed; a supplied email
    /// is re-validated and normalized. Absent fields are untouched.
    pub async fn update_profile(&self, user_id: i64, update: ProfileUpdate) -> AppResult<UserView> {
        let email = update.email.map(|e| e.trim().to_lowercase());

        let mut errors = FieldErrors::new();
        if let Some(email) = &email {
            if !email.validate_email() {
                push_error(&mut errors, "email", "Enter a valid email address");
            }
        }
        if let Some(password) = &update.password {
            if let Err(e) = self.password_validator.validate(password) {
                push_error(&mut errors, "password", &e.message);
            }
        }
        if !errors.is_empty() {
            return Err(AppError::validation_fields(errors));
        }

        let password_hash = match &update.password {
            Some(password) => Some(self.hasher.hash_password(password)?),
            None => None,
        };

        let user = self
            .credentials
            .update(
                user_id,
                &UserUpdate {
                    email,
                    first_name: update.first_name,
                    last_name: update.last_name,
                    password_hash,
                },
            )
            .await?;

        info!(user_id = user.id, "Profile updated");
        Ok(user.view())
    }
}

fn push_error(errors: &mut FieldErrors, field: &str, message: &str) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::Mutex;

    use authhub_core::config::auth::AuthConfig;
    use authhub_core::error::ErrorKind;
    use authhub_entity::user::User;

    use crate::blacklist::MemoryBlacklist;
    use crate::token::TokenError;

    /// In-memory credential store honoring the uniqueness contract.
    struct MemoryCredentials {
        inner: Mutex<(i64, HashMap<i64, User>)>,
    }

    impl MemoryCredentials {
        fn new() -> Self {
            Self {
                inner: Mutex::new((0, HashMap::new())),
            }
        }

        async fn count(&self) -> usize {
            self.inner.lock().await.1.len()
        }
    }

    #[async_trait]
    impl CredentialStore for MemoryCredentials {
        async fn create(&self, user: NewUser) -> AppResult<User> {
            let mut inner = self.inner.lock().await;
            let email = user.email.to_lowercase();

            if inner.1.values().any(|u| u.email == email) {
                return Err(AppError::conflict_field(
                    "email",
                    "A user with this email already exists",
                ));
            }

            inner.0 += 1;
            let id = inner.0;
            let now = Utc::now();
            let user = User {
                id,
                email,
                first_name: user.first_name,
                last_name: user.last_name,
                password_hash: user.password_hash,
                is_staff: false,
                is_active: true,
                created_at: now,
                updated_at: now,
            };
            inner.1.insert(id, user.clone());
            Ok(user)
        }

        async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
            let inner = self.inner.lock().await;
            let email = email.to_lowercase();
            Ok(inner.1.values().find(|u| u.email == email).cloned())
        }

        async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
            let inner = self.inner.lock().await;
            Ok(inner.1.get(&id).cloned())
        }

        async fn update(&self, id: i64, update: &UserUpdate) -> AppResult<User> {
            let mut inner = self.inner.lock().await;

            if let Some(email) = &update.email {
                let email = email.to_lowercase();
                if inner.1.values().any(|u| u.email == email && u.id != id) {
                    return Err(AppError::conflict_field(
                        "email",
                        "A user with this email already exists",
                    ));
                }
            }

            let user = inner
                .1
                .get_mut(&id)
                .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;

            if let Some(email) = &update.email {
                user.email = email.to_lowercase();
            }
            if let Some(first_name) = &update.first_name {
                user.first_name = first_name.clone();
            }
            if let Some(last_name) = &update.last_name {
                user.last_name = last_name.clone();
            }
            if let Some(password_hash) = &update.password_hash {
                user.password_hash = password_hash.clone();
            }
            user.updated_at = Utc::now();
            Ok(user.clone())
        }
    }

    struct Harness {
        service: SessionService,
        credentials: Arc<MemoryCredentials>,
        verifier: Arc<TokenVerifier>,
    }

    fn make_harness() -> Harness {
        let config = AuthConfig {
            jwt_secret: "test_secret".to_string(),
            ..AuthConfig::default()
        };

        let credentials = Arc::new(MemoryCredentials::new());
        let blacklist = Arc::new(MemoryBlacklist::new());
        let issuer = Arc::new(TokenIssuer::new(&config));
        let verifier = Arc::new(TokenVerifier::new(&config, blacklist.clone()));

        let service = SessionService::new(
            credentials.clone(),
            blacklist,
            Arc::new(PasswordHasher::new()),
            PasswordValidator::new(&config),
            issuer,
            verifier.clone(),
        );

        Harness {
            service,
            credentials,
            verifier,
        }
    }

    fn register_request() -> RegisterRequest {
        RegisterRequest {
            email: "john.doe@example.com".to_string(),
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            password: "hunter2hunter2".to_string(),
            confirm_password: "hunter2hunter2".to_string(),
        }
    }

    /// Walks a JSON tree asserting no key mentions a password.
    fn assert_no_password_keys(value: &serde_json::Value) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, inner) in map {
                    assert!(
                        !key.contains("password"),
                        "password field leaked in output: {key}"
                    );
                    assert_no_password_keys(inner);
                }
            }
            serde_json::Value::Array(items) => {
                for inner in items {
                    assert_no_password_keys(inner);
                }
            }
            _ => {}
        }
    }

    #[tokio::test]
    async fn test_register_returns_tokens_without_password() {
        let h = make_harness();
        let result = h.service.register(register_request()).await.unwrap();

        assert_eq!(result.user.email, "john.doe@example.com");
        assert!(!result.user.is_staff);
        assert_no_password_keys(&serde_json::to_value(&result).unwrap());
    }

    #[tokio::test]
    async fn test_register_password_mismatch_creates_nothing() {
        let h = make_harness();
        let request = RegisterRequest {
            confirm_password: "something else entirely".to_string(),
            ..register_request()
        };

        let err = h.service.register(request).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.field_messages("confirm_password").is_some());
        assert_eq!(h.credentials.count().await, 0);
    }

    #[tokio::test]
    async fn test_register_short_password_rejected() {
        let h = make_harness();
        let request = RegisterRequest {
            password: "short".to_string(),
            confirm_password: "short".to_string(),
            ..register_request()
        };

        let err = h.service.register(request).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.field_messages("password").is_some());
        assert_eq!(h.credentials.count().await, 0);
    }

    #[tokio::test]
    async fn test_register_bad_email_rejected() {
        let h = make_harness();
        let request = RegisterRequest {
            email: "not-an-email".to_string(),
            ..register_request()
        };

        let err = h.service.register(request).await.unwrap_err();
        assert!(err.field_messages("email").is_some());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_case_insensitive() {
        let h = make_harness();
        h.service.register(register_request()).await.unwrap();

        let request = RegisterRequest {
            email: "John.Doe@EXAMPLE.com".to_string(),
            ..register_request()
        };
        let err = h.service.register(request).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::Conflict);
        assert!(err.field_messages("email").is_some());
        assert_eq!(h.credentials.count().await, 1);
    }

    #[tokio::test]
    async fn test_login_issues_verifiable_pair() {
        let h = make_harness();
        h.service.register(register_request()).await.unwrap();

        let result = h
            .service
            .login("john.doe@example.com", "hunter2hunter2")
            .await
            .unwrap();

        let access = h.service.verify(&result.tokens.access_token).await.unwrap();
        assert_eq!(access.sub, result.user.id);

        h.verifier
            .verify(&result.tokens.refresh_token, TokenType::Refresh)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let h = make_harness();
        h.service.register(register_request()).await.unwrap();

        let wrong_password = h
            .service
            .login("john.doe@example.com", "not the password")
            .await
            .unwrap_err();
        let unknown_email = h
            .service
            .login("ghost@example.com", "not the password")
            .await
            .unwrap_err();

        assert_eq!(wrong_password.kind, unknown_email.kind);
        assert_eq!(wrong_password.message, unknown_email.message);
        assert!(wrong_password.fields.is_none());
    }

    #[tokio::test]
    async fn test_inactive_account_login_matches_other_failures() {
        let h = make_harness();
        let result = h.service.register(register_request()).await.unwrap();

        {
            let mut inner = h.credentials.inner.lock().await;
            inner.1.get_mut(&result.user.id).unwrap().is_active = false;
        }

        // Correct password, deactivated account.
        let inactive = h
            .service
            .login("john.doe@example.com", "hunter2hunter2")
            .await
            .unwrap_err();
        let unknown = h
            .service
            .login("ghost@example.com", "hunter2hunter2")
            .await
            .unwrap_err();

        assert_eq!(inactive.kind, ErrorKind::Authentication);
        assert_eq!(inactive.kind, unknown.kind);
        assert_eq!(inactive.message, unknown.message);
        assert!(inactive.fields.is_none());
    }

    #[tokio::test]
    async fn test_refresh_yields_fresh_access_token() {
        let h = make_harness();
        let result = h.service.register(register_request()).await.unwrap();

        let access = h
            .service
            .refresh(&result.tokens.refresh_token)
            .await
            .unwrap();

        let claims = h.service.verify(&access.token).await.unwrap();
        assert_eq!(claims.sub, result.user.id);
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let h = make_harness();
        let result = h.service.register(register_request()).await.unwrap();

        let err = h
            .service
            .refresh(&result.tokens.access_token)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert_eq!(err.message, "Invalid token");
    }

    #[tokio::test]
    async fn test_logout_revokes_refresh_token() {
        let h = make_harness();
        let result = h.service.register(register_request()).await.unwrap();

        h.service.logout(&result.tokens.refresh_token).await.unwrap();

        // The token's expiry has not elapsed, yet refresh now fails.
        let err = h
            .service
            .refresh(&result.tokens.refresh_token)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);

        let token_err = h
            .verifier
            .verify(&result.tokens.refresh_token, TokenType::Refresh)
            .await
            .unwrap_err();
        assert!(matches!(token_err, TokenError::Revoked));
    }

    #[tokio::test]
    async fn test_double_logout_succeeds() {
        let h = make_harness();
        let result = h.service.register(register_request()).await.unwrap();

        h.service.logout(&result.tokens.refresh_token).await.unwrap();
        h.service.logout(&result.tokens.refresh_token).await.unwrap();
    }

    #[tokio::test]
    async fn test_logout_rejects_garbage() {
        let h = make_harness();
        let err = h.service.logout("definitely.not.a-jwt").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert_eq!(err.message, "Invalid token");
    }

    #[tokio::test]
    async fn test_password_change_switches_login() {
        let h = make_harness();
        let result = h.service.register(register_request()).await.unwrap();

        h.service
            .update_profile(
                result.user.id,
                ProfileUpdate {
                    password: Some("completely-new-pass".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap();

        let old = h
            .service
            .login("john.doe@example.com", "hunter2hunter2")
            .await;
        assert!(old.is_err());

        h.service
            .login("john.doe@example.com", "completely-new-pass")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_profile_roundtrip() {
        let h = make_harness();
        let result = h.service.register(register_request()).await.unwrap();

        let view = h.service.profile(result.user.id).await.unwrap();
        assert_eq!(view, result.user);

        let updated = h
            .service
            .update_profile(
                result.user.id,
                ProfileUpdate {
                    first_name: Some("Jane".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.first_name, "Jane");
        assert_eq!(updated.last_name, "Doe");
    }

    #[tokio::test]
    async fn test_update_profile_rejects_short_password() {
        let h = make_harness();
        let result = h.service.register(register_request()).await.unwrap();

        let err = h
            .service
            .update_profile(
                result.user.id,
                ProfileUpdate {
                    password: Some("tiny".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        // Old password still works.
        h.service
            .login("john.doe@example.com", "hunter2hunter2")
            .await
            .unwrap();
    }
}
