//! # authhub-entity
//!
//! Domain entity models for AuthHub, plus the persistence contracts
//! ([`CredentialStore`](user::CredentialStore) and
//! [`BlacklistStore`](token::BlacklistStore)) that the auth crate consumes
//! and the database crate implements.

pub mod token;
pub mod user;

pub use token::BlacklistStore;
pub use user::{CredentialStore, NewUser, User, UserUpdate, UserView};
