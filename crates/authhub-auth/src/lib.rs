//! # authhub-auth
//!
//! The authentication core of AuthHub: credential hashing, JWT token
//! issuance and verification, refresh-token blacklisting, and the session
//! lifecycle orchestrator.
//!
//! ## Modules
//!
//! - `password` — Argon2id password hashing and policy enforcement
//! - `token` — JWT claim types, token issuer, and token verifier
//! - `blacklist` — in-memory blacklist store for single-node deployments
//! - `session` — the session service (register, login, refresh, verify,
//!   logout, profile)

pub mod blacklist;
pub mod password;
pub mod session;
pub mod token;

pub use blacklist::MemoryBlacklist;
pub use password::{PasswordHasher, PasswordValidator};
pub use session::{LoginResult, ProfileUpdate, RegisterRequest, SessionService};
pub use token::{Claims, TokenError, TokenIssuer, TokenType, TokenVerifier};
