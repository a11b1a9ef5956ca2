// Phone Sign-In Authorization Service - API Core
//
// Issues and validates session tokens for users who prove control of a phone
// number through an out-of-band verification code.
//
// Domains live under domains/*, infrastructure seams under kernel/.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
