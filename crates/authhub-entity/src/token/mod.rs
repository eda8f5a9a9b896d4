//! Token revocation contracts.

pub mod blacklist;

pub use blacklist::BlacklistStore;
