//! User domain entities.

pub mod model;
pub mod store;

pub use model::{NewUser, User, UserUpdate, UserView};
pub use store::CredentialStore;
