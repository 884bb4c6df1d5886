//! Best-effort external index of owner → accounts. Routers call it after
//! ownership changes and swallow every error; the index may lag, the
//! account never blocks on it.

use crate::error::WardenError;
use crate::identity::Identity;
use std::collections::HashMap;
use std::sync::RwLock;

pub trait RegistrySync: Send + Sync {
    fn add_record(&self, owner: &Identity, account: &Identity) -> Result<(), WardenError>;
    fn remove_record(&self, owner: &Identity, account: &Identity) -> Result<(), WardenError>;
    fn change_record(
        &self,
        account: &Identity,
        old_owner: &Identity,
        new_owner: &Identity,
    ) -> Result<(), WardenError>;
    /// Accounts currently indexed under `owner`.
    fn accounts_of(&self, owner: &Identity) -> Vec<Identity>;
}

/// In-memory registry, the reference implementation.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    records: RwLock<HashMap<Identity, Vec<Identity>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Identity, Vec<Identity>>> {
        self.records.write().unwrap_or_else(|p| p.into_inner())
    }
}

impl RegistrySync for MemoryRegistry {
    fn add_record(&self, owner: &Identity, account: &Identity) -> Result<(), WardenError> {
        if owner.is_null() || account.is_null() {
            return Err(WardenError::RegistryFailure("null record".into()));
        }
        let mut records = self.lock();
        let accounts = records.entry(owner.clone()).or_default();
        if !accounts.contains(account) {
            accounts.push(account.clone());
        }
        Ok(())
    }

    fn remove_record(&self, owner: &Identity, account: &Identity) -> Result<(), WardenError> {
        let mut records = self.lock();
        if let Some(accounts) = records.get_mut(owner) {
            accounts.retain(|a| a != account);
        }
        Ok(())
    }

    fn change_record(
        &self,
        account: &Identity,
        old_owner: &Identity,
        new_owner: &Identity,
    ) -> Result<(), WardenError> {
        self.remove_record(old_owner, account)?;
        self.add_record(new_owner, account)
    }

    fn accounts_of(&self, owner: &Identity) -> Vec<Identity> {
        self.records
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(owner)
            .cloned()
            .unwrap_or_default()
    }
}
