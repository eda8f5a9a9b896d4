//! Repository implementations of the AuthHub persistence contracts.

pub mod blacklist;
pub mod user;
