//! Shared logic modules and the indirection record resolving the current
//! one. Many accounts execute the same backend deployment, each against its
//! own private storage.

use crate::error::{ResultCode, WardenError};
use crate::gate::{self, AuthorizationGate};
use crate::identity::Identity;
use crate::registry::RegistrySync;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

/// Account-local execution context handed to a backend: shared logic,
/// isolated state.
pub type AccountStorage = HashMap<String, Vec<u8>>;

pub trait Backend: Send + Sync {
    /// Stable identity of this backend deployment; bump detection compares it.
    fn id(&self) -> Identity;

    /// Execute a delegated call against one account's storage.
    fn run(
        &self,
        account: &Identity,
        caller: &Identity,
        storage: &mut AccountStorage,
        payload: &[u8],
    ) -> Result<Vec<u8>, WardenError>;
}

struct ProviderState {
    backend: Arc<dyn Backend>,
    registry: Option<Arc<dyn RegistrySync>>,
}

/// Indirection record: which backend is current, which registry to notify.
/// Mutations pass the authorization gate; reads are open.
pub struct BackendProvider {
    address: Identity,
    gate: Arc<dyn AuthorizationGate>,
    state: RwLock<ProviderState>,
}

impl BackendProvider {
    pub fn new(
        address: Identity,
        gate: Arc<dyn AuthorizationGate>,
        backend: Arc<dyn Backend>,
    ) -> Result<Self, WardenError> {
        if address.is_null() {
            return Err(WardenError::NullIdentity("provider address"));
        }
        Ok(BackendProvider {
            address,
            gate,
            state: RwLock::new(ProviderState {
                backend,
                registry: None,
            }),
        })
    }

    pub fn address(&self) -> &Identity {
        &self.address
    }

    pub fn backend(&self) -> Arc<dyn Backend> {
        self.read().backend.clone()
    }

    /// None disables registry sync, it is not an error.
    pub fn registry(&self) -> Option<Arc<dyn RegistrySync>> {
        self.read().registry.clone()
    }

    pub fn set_backend(
        &self,
        caller: &Identity,
        backend: Arc<dyn Backend>,
    ) -> Result<ResultCode, WardenError> {
        if backend.id().is_null() {
            return Err(WardenError::NullIdentity("backend"));
        }
        if !self.gate.can_call(caller, &self.address, gate::SET_BACKEND) {
            return Ok(ResultCode::Unauthorized);
        }
        let mut state = self.write();
        info!(provider = %self.address, backend = %backend.id(), "backend updated");
        state.backend = backend;
        Ok(ResultCode::Ok)
    }

    pub fn set_registry(
        &self,
        caller: &Identity,
        registry: Option<Arc<dyn RegistrySync>>,
    ) -> Result<ResultCode, WardenError> {
        if !self.gate.can_call(caller, &self.address, gate::SET_REGISTRY) {
            return Ok(ResultCode::Unauthorized);
        }
        self.write().registry = registry;
        Ok(ResultCode::Ok)
    }

    fn read(&self) -> RwLockReadGuard<'_, ProviderState> {
        self.state.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ProviderState> {
        self.state.write().unwrap_or_else(|p| p.into_inner())
    }
}
