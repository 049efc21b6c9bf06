//! Credential primitives for the identity service.
//!
//! - Password hashing (Argon2id, PHC strings)
//! - Signed, short-lived access tokens (HS256 JWT)
//! - An `Authenticator` tying both together with a fixed access-token lifetime
//!
//! Opaque refresh/verification/reset tokens are not handled here: they are plain
//! random lookup keys owned by the service's stores.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("correct horse").unwrap();
//! assert!(hasher.verify("correct horse", &hash).unwrap());
//! assert!(!hasher.verify("battery staple", &hash).unwrap());
//! ```
//!
//! ## Access Tokens
//! ```
//! use auth::{AccessClaims, Authenticator};
//! use chrono::Duration;
//!
//! let authenticator =
//!     Authenticator::new(b"secret_key_at_least_32_bytes_long!", Duration::minutes(15)).unwrap();
//!
//! let issued = authenticator
//!     .issue_access_token("8c7e2a0e-0d4b-4a47-9f0e-3f1a3e0f5b11", "alice@example.com")
//!     .unwrap();
//!
//! let claims: AccessClaims = authenticator.validate_access_token(&issued.token).unwrap();
//! assert_eq!(claims.email, "alice@example.com");
//! ```

pub mod authenticator;
pub mod jwt;
pub mod password;

pub use authenticator::AccessToken;
pub use authenticator::Authenticator;
pub use jwt::AccessClaims;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use password::PasswordError;
pub use password::PasswordHasher;
