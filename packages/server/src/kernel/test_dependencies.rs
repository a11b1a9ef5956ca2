// Test doubles for the kernel traits
//
// Used by unit tests and the router-level integration tests in tests/.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use ed25519_dalek::SigningKey;

use super::traits::{BaseIdentityBackend, BaseVerificationGateway, GatewayError};
use crate::common::PhoneNumber;
use crate::domains::auth::{CredentialAuthority, SigningKeys, TokenSigner};
use crate::domains::identity::{Identity, StoreError};

pub const TEST_ISSUER: &str = "test_issuer";

/// Deterministic key pair; different seeds give unrelated key pairs.
pub fn test_signing_key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

pub fn test_authority(
    gateway: Arc<dyn BaseVerificationGateway>,
    seed: u8,
) -> CredentialAuthority {
    let keys = SigningKeys::from_signing_key(&test_signing_key(seed))
        .expect("test key should load");
    let signer = TokenSigner::new(keys, TEST_ISSUER.to_string(), chrono::Duration::hours(24));
    CredentialAuthority::new(gateway, signer)
}

// =============================================================================
// Stub Verification Gateway
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum GatewayBehavior {
    Accept,
    Reject,
    InvalidPhone,
    Fail,
}

/// Gateway with a fixed outcome that records every call.
pub struct StubGateway {
    behavior: GatewayBehavior,
    verify_calls: Mutex<Vec<String>>,
    authenticate_calls: Mutex<Vec<(String, String)>>,
}

impl StubGateway {
    fn with_behavior(behavior: GatewayBehavior) -> Self {
        Self {
            behavior,
            verify_calls: Mutex::new(Vec::new()),
            authenticate_calls: Mutex::new(Vec::new()),
        }
    }

    /// Accepts every phone and every code.
    pub fn accepting() -> Self {
        Self::with_behavior(GatewayBehavior::Accept)
    }

    /// Starts challenges but rejects every code.
    pub fn rejecting() -> Self {
        Self::with_behavior(GatewayBehavior::Reject)
    }

    pub fn invalid_phone() -> Self {
        Self::with_behavior(GatewayBehavior::InvalidPhone)
    }

    /// Every call fails with a provider error.
    pub fn failing() -> Self {
        Self::with_behavior(GatewayBehavior::Fail)
    }

    pub fn verify_calls(&self) -> Vec<String> {
        self.verify_calls.lock().unwrap().clone()
    }

    pub fn authenticate_calls(&self) -> Vec<(String, String)> {
        self.authenticate_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseVerificationGateway for StubGateway {
    async fn verify(&self, phone: &PhoneNumber) -> Result<(), GatewayError> {
        self.verify_calls.lock().unwrap().push(phone.to_string());
        match self.behavior {
            GatewayBehavior::Accept | GatewayBehavior::Reject => Ok(()),
            GatewayBehavior::InvalidPhone => Err(GatewayError::InvalidPhone),
            GatewayBehavior::Fail => Err(GatewayError::Provider(anyhow!("provider unreachable"))),
        }
    }

    async fn authenticate(&self, phone: &PhoneNumber, code: &str) -> Result<(), GatewayError> {
        self.authenticate_calls
            .lock()
            .unwrap()
            .push((phone.to_string(), code.to_string()));
        match self.behavior {
            GatewayBehavior::Accept => Ok(()),
            GatewayBehavior::Reject => Err(GatewayError::Unauthenticated),
            GatewayBehavior::InvalidPhone => Err(GatewayError::InvalidPhone),
            GatewayBehavior::Fail => Err(GatewayError::Provider(anyhow!("provider unreachable"))),
        }
    }
}

// =============================================================================
// In-memory Identity Backend
// =============================================================================

/// Identity backend over a map keyed by phone, with the same conflict
/// semantics as the Postgres upsert.
#[derive(Default)]
pub struct MemoryIdentityBackend {
    rows: Mutex<HashMap<PhoneNumber, Identity>>,
    upserts: AtomicUsize,
}

impl MemoryIdentityBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(self, identity: Identity) -> Self {
        self.rows
            .lock()
            .unwrap()
            .insert(identity.phone.clone(), identity);
        self
    }

    pub fn get(&self, phone: &PhoneNumber) -> Option<Identity> {
        self.rows.lock().unwrap().get(phone).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful upsert calls.
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BaseIdentityBackend for MemoryIdentityBackend {
    async fn find_by_phone(&self, phone: &PhoneNumber) -> Result<Option<Identity>, StoreError> {
        Ok(self.get(phone))
    }

    async fn upsert(&self, identity: &Identity) -> Result<u64, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        rows.entry(identity.phone.clone())
            .and_modify(|existing| existing.updated_at = Utc::now())
            .or_insert_with(|| identity.clone());
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(1)
    }
}

// =============================================================================
// Flaky Identity Backend
// =============================================================================

/// Backend that fails a configured number of attempts per operation before
/// delegating to an in-memory backend.
pub struct FlakyIdentityBackend {
    inner: MemoryIdentityBackend,
    find_failures_left: AtomicUsize,
    upsert_failures_left: AtomicUsize,
    find_calls: AtomicUsize,
    upsert_calls: AtomicUsize,
    zero_rows: bool,
    ping_fails: bool,
    delay: Option<Duration>,
}

impl FlakyIdentityBackend {
    /// Fail the first `failures` attempts of each operation.
    pub fn failing(failures: usize) -> Self {
        Self {
            inner: MemoryIdentityBackend::new(),
            find_failures_left: AtomicUsize::new(failures),
            upsert_failures_left: AtomicUsize::new(failures),
            find_calls: AtomicUsize::new(0),
            upsert_calls: AtomicUsize::new(0),
            zero_rows: false,
            ping_fails: false,
            delay: None,
        }
    }

    pub fn always_failing() -> Self {
        Self::failing(usize::MAX)
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.inner = self.inner.with_identity(identity);
        self
    }

    /// Upserts "succeed" with zero rows affected.
    pub fn with_zero_rows(mut self) -> Self {
        self.zero_rows = true;
        self
    }

    /// Health probes fail with a detailed connection error.
    pub fn with_failing_ping(mut self) -> Self {
        self.ping_fails = true;
        self
    }

    /// Sleep before every attempt.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn stored(&self) -> Vec<Identity> {
        self.inner.rows.lock().unwrap().values().cloned().collect()
    }

    async fn attempt(&self, failures_left: &AtomicUsize) -> Result<(), StoreError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let should_fail = failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                (left > 0).then(|| left - 1)
            })
            .is_ok();
        if should_fail {
            Err(StoreError::Unavailable("connection reset".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BaseIdentityBackend for FlakyIdentityBackend {
    async fn find_by_phone(&self, phone: &PhoneNumber) -> Result<Option<Identity>, StoreError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.attempt(&self.find_failures_left).await?;
        self.inner.find_by_phone(phone).await
    }

    async fn upsert(&self, identity: &Identity) -> Result<u64, StoreError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.attempt(&self.upsert_failures_left).await?;
        if self.zero_rows {
            return Ok(0);
        }
        self.inner.upsert(identity).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.ping_fails {
            return Err(StoreError::Unavailable(
                "connection refused (10.0.0.5:5432, user=auth)".to_string(),
            ));
        }
        Ok(())
    }
}
