//! Shared test doubles and fixtures. Compiled for tests only.

use crate::account::AccountRouter;
use crate::backend::{AccountStorage, Backend, BackendProvider};
use crate::error::WardenError;
use crate::gate::AuthorizationGate;
use crate::identity::Identity;
use crate::registry::{MemoryRegistry, RegistrySync};
use crate::signature::SignedAuth;
use crate::vault::{Outbound, Vault};
use ed25519_dalek::{Signer, SigningKey};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub fn id(s: &str) -> Identity {
    Identity::new(s)
}

/// Route crate logs to the test harness, filtered by `RUST_LOG`.
/// Idempotent; every fixture calls it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn signed_auth(key: &SigningKey, digest: &[u8; 32]) -> SignedAuth {
    SignedAuth {
        public_key: key.verifying_key().to_bytes().to_vec(),
        signature: key.sign(digest).to_bytes().to_vec(),
    }
}

#[derive(Debug, Clone)]
pub struct OutboundCall {
    pub destination: Identity,
    pub payload: Vec<u8>,
    pub value: u64,
}

/// Recording double for the vault's outbound seam. Failure can be injected
/// for a single call or until cleared.
#[derive(Default)]
pub struct RecordingOutbound {
    calls: Mutex<Vec<OutboundCall>>,
    fail_once: AtomicBool,
    fail_all: AtomicBool,
}

impl RecordingOutbound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<OutboundCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn fail_next(&self) {
        self.fail_once.store(true, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_all.store(failing, Ordering::SeqCst);
    }
}

impl Outbound for RecordingOutbound {
    fn call(
        &self,
        destination: &Identity,
        payload: &[u8],
        value: u64,
    ) -> Result<Vec<u8>, WardenError> {
        if self.fail_once.swap(false, Ordering::SeqCst) || self.fail_all.load(Ordering::SeqCst) {
            return Err(WardenError::ForwardFailed(
                destination.clone(),
                "injected failure".into(),
            ));
        }
        self.calls.lock().unwrap().push(OutboundCall {
            destination: destination.clone(),
            payload: payload.to_vec(),
            value,
        });
        Ok(b"ok".to_vec())
    }
}

/// Backend double that counts runs and echoes the payload through the
/// account's storage.
pub struct StubBackend {
    id: Identity,
}

impl StubBackend {
    pub fn arc(name: &str) -> Arc<dyn Backend> {
        Arc::new(StubBackend {
            id: Identity::new(name),
        })
    }

    /// Number of delegated runs recorded in `storage`, across backends.
    pub fn runs(storage: &AccountStorage) -> u64 {
        storage
            .get("runs")
            .and_then(|v| v.as_slice().try_into().ok())
            .map(u64::from_le_bytes)
            .unwrap_or(0)
    }
}

impl Backend for StubBackend {
    fn id(&self) -> Identity {
        self.id.clone()
    }

    fn run(
        &self,
        _account: &Identity,
        _caller: &Identity,
        storage: &mut AccountStorage,
        payload: &[u8],
    ) -> Result<Vec<u8>, WardenError> {
        let runs = Self::runs(storage) + 1;
        storage.insert("runs".into(), runs.to_le_bytes().to_vec());
        storage.insert("last_payload".into(), payload.to_vec());
        storage.insert("last_backend".into(), self.id.as_str().as_bytes().to_vec());
        Ok(payload.to_vec())
    }
}

/// Gate that admits a fixed set of identities for every action.
pub struct StaticGate {
    allowed: HashSet<Identity>,
}

impl StaticGate {
    pub fn allowing(identities: impl IntoIterator<Item = Identity>) -> Self {
        StaticGate {
            allowed: identities.into_iter().collect(),
        }
    }
}

impl AuthorizationGate for StaticGate {
    fn can_call(&self, caller: &Identity, _context: &Identity, _action: &str) -> bool {
        self.allowed.contains(caller)
    }
}

/// A ready-to-use account wired to recording doubles.
///
/// Identities: account `account-1`, owner `alice`, issuer `issuer`, recovery
/// contract `recovery`, provider `provider` (admin `root`), backend
/// `backend-v1`, vault `vault-1`.
pub struct Fixture {
    pub router: AccountRouter,
    pub outbound: Arc<RecordingOutbound>,
    pub provider: Arc<BackendProvider>,
    pub registry: Arc<MemoryRegistry>,
}

/// Initialized account without protection, oracle `oracle`.
pub fn fixture() -> Fixture {
    fixture_with_oracle(id("oracle"), false, true)
}

/// Fixture with a chosen oracle. `init` false leaves the account
/// uninitialized so tests can drive `init` themselves.
pub fn fixture_with_oracle(oracle: Identity, use_2fa: bool, init: bool) -> Fixture {
    init_tracing();
    let outbound = Arc::new(RecordingOutbound::new());
    let registry = Arc::new(MemoryRegistry::new());
    let gate = Arc::new(StaticGate::allowing([id("root")]));
    let provider = Arc::new(
        BackendProvider::new(id("provider"), gate, StubBackend::arc("backend-v1")).unwrap(),
    );
    provider
        .set_registry(&id("root"), Some(registry.clone()))
        .unwrap();
    registry.add_record(&id("alice"), &id("account-1")).unwrap();

    let vault = Arc::new(Vault::new(id("vault-1"), id("account-1"), outbound.clone()).unwrap());
    let mut router = AccountRouter::new(
        id("account-1"),
        id("issuer"),
        id("alice"),
        id("recovery"),
        provider.clone(),
        vault,
    )
    .unwrap();
    if init {
        router.init(&id("issuer"), &oracle, use_2fa).unwrap();
    }

    Fixture {
        router,
        outbound,
        provider,
        registry,
    }
}
