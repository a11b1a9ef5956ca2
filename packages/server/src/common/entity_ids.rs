//! Typed ID definitions for domain entities.

pub use super::id::{Id, V4, V7};

/// Marker type for user identities.
pub struct User;

/// Marker type for issued tokens (`jti` claim).
pub struct Token;

pub type UserId = Id<User>;
pub type TokenId = Id<Token, V4>;
