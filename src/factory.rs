//! Entry point for provisioning accounts: derives fresh addresses, binds a
//! vault to each router, initializes and indexes the pair. The factory is
//! the issuer of every account it creates.

use crate::account::AccountRouter;
use crate::backend::BackendProvider;
use crate::error::{ResultCode, WardenError};
use crate::events::Event;
use crate::gate::{self, AuthorizationGate};
use crate::identity::Identity;
use crate::registry::RegistrySync;
use crate::vault::{Outbound, Vault};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

/// Deploy-time defaults for a factory, typically loaded from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactoryConfig {
    pub address: Identity,
    pub oracle_address: Identity,
    pub recovery_address: Identity,
}

struct FactoryState {
    oracle_address: Identity,
    recovery_address: Identity,
    provider: Arc<BackendProvider>,
    created: u64,
}

pub struct AccountFactory {
    address: Identity,
    gate: Arc<dyn AuthorizationGate>,
    outbound: Arc<dyn Outbound>,
    state: RwLock<FactoryState>,
    events: Mutex<Vec<Event>>,
}

impl AccountFactory {
    pub fn new(
        address: Identity,
        gate: Arc<dyn AuthorizationGate>,
        oracle_address: Identity,
        recovery_address: Identity,
        provider: Arc<BackendProvider>,
        outbound: Arc<dyn Outbound>,
    ) -> Result<Self, WardenError> {
        if address.is_null() {
            return Err(WardenError::NullIdentity("factory address"));
        }
        if oracle_address.is_null() {
            return Err(WardenError::NullIdentity("oracle address"));
        }
        if recovery_address.is_null() {
            return Err(WardenError::NullIdentity("recovery address"));
        }
        Ok(AccountFactory {
            address,
            gate,
            outbound,
            state: RwLock::new(FactoryState {
                oracle_address,
                recovery_address,
                provider,
                created: 0,
            }),
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn from_config(
        config: FactoryConfig,
        gate: Arc<dyn AuthorizationGate>,
        provider: Arc<BackendProvider>,
        outbound: Arc<dyn Outbound>,
    ) -> Result<Self, WardenError> {
        AccountFactory::new(
            config.address,
            gate,
            config.oracle_address,
            config.recovery_address,
            provider,
            outbound,
        )
    }

    pub fn address(&self) -> &Identity {
        &self.address
    }

    pub fn oracle_address(&self) -> Identity {
        self.read().oracle_address.clone()
    }

    pub fn recovery_address(&self) -> Identity {
        self.read().recovery_address.clone()
    }

    pub fn provider(&self) -> Arc<BackendProvider> {
        self.read().provider.clone()
    }

    pub fn created(&self) -> u64 {
        self.read().created
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Provision a router/vault pair for `owner`, initialized against the
    /// factory's current oracle and recovery defaults.
    pub fn create_account(
        &self,
        caller: &Identity,
        owner: &Identity,
        use_2fa: bool,
    ) -> Result<AccountRouter, WardenError> {
        if owner.is_null() {
            return Err(WardenError::NullIdentity("owner"));
        }
        if !self
            .gate
            .can_call(caller, &self.address, gate::CREATE_ACCOUNT)
        {
            return Err(WardenError::GateDenied {
                caller: caller.clone(),
                action: gate::CREATE_ACCOUNT.into(),
            });
        }

        let (oracle, recovery, provider, nonce) = {
            let mut state = self.write();
            state.created += 1;
            (
                state.oracle_address.clone(),
                state.recovery_address.clone(),
                state.provider.clone(),
                state.created,
            )
        };
        let account_address = self.derive("account", owner, nonce);
        let vault_address = self.derive("vault", owner, nonce);

        let vault = Arc::new(Vault::new(
            vault_address.clone(),
            account_address.clone(),
            self.outbound.clone(),
        )?);
        let mut router = AccountRouter::new(
            account_address.clone(),
            self.address.clone(),
            owner.clone(),
            recovery.clone(),
            provider.clone(),
            vault,
        )?;
        router.init(&self.address, &oracle, use_2fa)?;

        if let Some(registry) = provider.registry() {
            if let Err(e) = registry.add_record(owner, &account_address) {
                warn!(account = %account_address, error = %e, "registry sync failed, ignored");
            }
        }
        self.emit(Event::AccountCreated {
            account: account_address.clone(),
            vault: vault_address,
            owner: owner.clone(),
            recovery,
        });
        info!(account = %account_address, %owner, use_2fa, "account created");
        Ok(router)
    }

    pub fn set_oracle_address(
        &self,
        caller: &Identity,
        oracle: Identity,
    ) -> Result<ResultCode, WardenError> {
        if oracle.is_null() {
            return Err(WardenError::NullIdentity("oracle address"));
        }
        if !self
            .gate
            .can_call(caller, &self.address, gate::SET_ORACLE_ADDRESS)
        {
            return Ok(ResultCode::Unauthorized);
        }
        self.write().oracle_address = oracle;
        Ok(ResultCode::Ok)
    }

    pub fn set_recovery_address(
        &self,
        caller: &Identity,
        recovery: Identity,
    ) -> Result<ResultCode, WardenError> {
        if recovery.is_null() {
            return Err(WardenError::NullIdentity("recovery address"));
        }
        if !self
            .gate
            .can_call(caller, &self.address, gate::SET_RECOVERY_ADDRESS)
        {
            return Ok(ResultCode::Unauthorized);
        }
        self.write().recovery_address = recovery;
        Ok(ResultCode::Ok)
    }

    /// Swap the provider handed to accounts created from now on. Existing
    /// accounts keep theirs until `update_provider_for_account`.
    pub fn set_provider(
        &self,
        caller: &Identity,
        provider: Arc<BackendProvider>,
    ) -> Result<ResultCode, WardenError> {
        if !self.gate.can_call(caller, &self.address, gate::SET_PROVIDER) {
            return Ok(ResultCode::Unauthorized);
        }
        self.write().provider = provider;
        Ok(ResultCode::Ok)
    }

    /// Migrate one existing account to the factory's current provider. The
    /// factory is the account's issuer, so the router accepts the update.
    pub fn update_provider_for_account(
        &self,
        caller: &Identity,
        account: &mut AccountRouter,
    ) -> Result<ResultCode, WardenError> {
        if !self
            .gate
            .can_call(caller, &self.address, gate::UPDATE_PROVIDER_FOR_ACCOUNT)
        {
            return Ok(ResultCode::Unauthorized);
        }
        let provider = self.provider();
        account.update_backend_provider(&self.address, provider)
    }

    fn derive(&self, tag: &str, owner: &Identity, nonce: u64) -> Identity {
        let mut hasher = Sha256::new();
        hasher.update(self.address.as_str().as_bytes());
        hasher.update(tag.as_bytes());
        hasher.update(owner.as_str().as_bytes());
        hasher.update(nonce.to_be_bytes());
        Identity::new(hex::encode(hasher.finalize()))
    }

    fn emit(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(event);
    }

    fn read(&self) -> RwLockReadGuard<'_, FactoryState> {
        self.state.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, FactoryState> {
        self.state.write().unwrap_or_else(|p| p.into_inner())
    }
}
