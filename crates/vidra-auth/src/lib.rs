//! # vidra-auth
//!
//! Credential primitives for the member service and the edges that
//! verify its tokens: password strength validation, bcrypt hashing on
//! the blocking pool, and HS256 JWT mint/verify.
//!
//! A verified token asserts identity only. Session liveness is always
//! decided by the session cache (see `vidra-session`); the token's
//! `exp` claim is advisory.

pub mod error;
pub mod jwt;
pub mod password;

pub use error::{AuthError, AuthResult};
pub use jwt::{mint_token, verify_token, TokenClaims};
pub use password::{hash_password, validate_password_strength, verify_password};
