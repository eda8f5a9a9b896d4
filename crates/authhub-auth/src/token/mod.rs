//! JWT token creation and validation.

pub mod claims;
pub mod issuer;
pub mod verifier;

pub use claims::{Claims, TokenType};
pub use issuer::{AccessToken, TokenIssuer, TokenPair};
pub use verifier::{TokenError, TokenVerifier};
