//! Session lifecycle orchestration.

pub mod service;

pub use service::{LoginResult, ProfileUpdate, RegisterRequest, SessionService};
