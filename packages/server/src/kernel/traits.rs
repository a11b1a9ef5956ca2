// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Sign-in orchestration and retry policy live in the domains and use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseVerificationGateway)

use async_trait::async_trait;

use crate::common::PhoneNumber;
use crate::domains::identity::{Identity, StoreError};

// =============================================================================
// Verification Gateway Trait (Infrastructure - out-of-band phone ownership)
// =============================================================================

/// Outcome classes a verification provider can report.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The provider rejected the code for this phone.
    #[error("err user failed to authenticate")]
    Unauthenticated,

    /// The provider refused the phone number itself.
    #[error("err invalid phone number")]
    InvalidPhone,

    #[error("verification provider error: {0}")]
    Provider(#[from] anyhow::Error),
}

#[async_trait]
pub trait BaseVerificationGateway: Send + Sync {
    /// Trigger an out-of-band challenge (SMS code, flash call, ...) to the phone.
    async fn verify(&self, phone: &PhoneNumber) -> Result<(), GatewayError>;

    /// Confirm the challenge with the code the user received.
    async fn authenticate(&self, phone: &PhoneNumber, code: &str) -> Result<(), GatewayError>;
}

// =============================================================================
// Identity Backend Trait (Infrastructure - single-attempt persistence)
// =============================================================================

/// One round trip to the identity datastore. Retry policy is applied on top
/// by `IdentityStore`.
#[async_trait]
pub trait BaseIdentityBackend: Send + Sync {
    /// `Ok(None)` when no row matches the phone.
    async fn find_by_phone(&self, phone: &PhoneNumber) -> Result<Option<Identity>, StoreError>;

    /// Insert or, on phone conflict, refresh `updated_at`. Returns rows affected.
    async fn upsert(&self, identity: &Identity) -> Result<u64, StoreError>;

    /// Cheap connectivity probe for health checks.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
