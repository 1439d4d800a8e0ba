//! # auth-adapters
//!
//! Credential adapters: Argon2 password hashing (always compiled) and
//! HS256 bearer tokens behind the `auth-jwt` feature.

pub mod password;
#[cfg(feature = "auth-jwt")]
pub mod jwt;

pub use password::Argon2Hasher;
#[cfg(feature = "auth-jwt")]
pub use jwt::JwtAuthority;
