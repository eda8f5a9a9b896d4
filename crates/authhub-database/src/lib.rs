//! # authhub-database
//!
//! PostgreSQL connection management, embedded migrations, and repository
//! implementations of the AuthHub persistence contracts.

pub mod connection;
pub mod repositories;

pub use connection::DatabasePool;
pub use repositories::blacklist::BlacklistRepository;
pub use repositories::user::UserRepository;
