//! Credential verification
//!
//! [`AuthService`] looks a username up in a credential store and checks the
//! submitted password with a pluggable [`PasswordHasher`].

pub mod handlers;
mod hasher;
mod service;

pub use hasher::{
    constant_time_eq, hasher_from_config, Argon2Hasher, HashedPassword, PasswordHasher,
    Sha256Hasher,
};
pub use service::{AuthResult, AuthService};
