//! Auth domain - phone sign-in and token credentials
//!
//! Responsibilities:
//! - Signing key loading (Ed25519, fatal on bad material)
//! - Sign-in orchestration: verification gateway → signed token
//! - Token verification with the algorithm pinned to EdDSA

pub mod authority;
pub mod errors;
pub mod jwt;
pub mod keys;

pub use authority::{CredentialAuthority, TokenParser};
pub use errors::CredentialError;
pub use jwt::{Claims, TokenSigner};
pub use keys::{encode_signing_key, KeyError, SigningKeys};
