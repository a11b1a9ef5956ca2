use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use super::{Identity, StoreError};
use crate::common::PhoneNumber;
use crate::kernel::BaseIdentityBackend;

/// Attempts per store operation (first try included). Retries are immediate.
pub const GLOBAL_REQUEST_RETRIES: usize = 3;

/// Identity store with bounded retry over a single-attempt backend.
///
/// There is no transaction spanning lookup, sign-in and upsert: two
/// concurrent sign-ins for one phone both upsert and the later write wins.
/// Consistency on `phone` rests on the backend's atomic upsert.
///
/// Cancellation is cooperative: dropping the returned future (client gone,
/// request deadline hit) stops the retry loop before the next attempt.
#[derive(Clone)]
pub struct IdentityStore {
    backend: Arc<dyn BaseIdentityBackend>,
}

impl IdentityStore {
    pub fn new(backend: Arc<dyn BaseIdentityBackend>) -> Self {
        Self { backend }
    }

    /// Look up the identity for a phone.
    ///
    /// `StoreError::NotFound` is returned without retrying when no row
    /// matches. Backend errors are retried; the last one is returned.
    pub async fn get_user(&self, phone: &PhoneNumber) -> Result<Identity, StoreError> {
        with_retries("get_user", move || self.backend.find_by_phone(phone))
            .await?
            .ok_or(StoreError::NotFound)
    }

    /// Insert the identity or refresh `updated_at` of the row holding its phone.
    ///
    /// Zero rows affected counts as a failed attempt.
    pub async fn upsert_user(&self, identity: &Identity) -> Result<(), StoreError> {
        with_retries("upsert_user", move || async move {
            match self.backend.upsert(identity).await? {
                0 => Err(StoreError::NotUpserted),
                _ => Ok(()),
            }
        })
        .await
        .map_err(|e| StoreError::UpsertFailed(Box::new(e)))
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        self.backend.ping().await
    }
}

async fn with_retries<T, F, Fut>(
    operation: &'static str,
    mut attempt_fn: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 1;
    loop {
        match attempt_fn().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation, attempt, "persistence operation recovered");
                }
                return Ok(value);
            }
            Err(e) => {
                warn!(operation, attempt, error = %e, "persistence error");
                if attempt >= GLOBAL_REQUEST_RETRIES {
                    return Err(e);
                }
                attempt += 1;
            }
        }
    }
}
