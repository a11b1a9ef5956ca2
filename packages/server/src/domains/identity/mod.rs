//! Identity domain - durable phone → user id mapping
//!
//! Responsibilities:
//! - Identity records keyed uniquely by normalized phone
//! - Upsert-on-conflict persistence
//! - Bounded, immediate retry of backend failures

pub mod errors;
pub mod models;
pub mod store;

pub use errors::StoreError;
pub use models::Identity;
pub use store::{IdentityStore, GLOBAL_REQUEST_RETRIES};
