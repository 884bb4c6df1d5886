//! Capability check consumed by the factory and the backend provider.
//! The actual role/policy evaluator lives outside this crate; per-account
//! owner/oracle checks never consult it.

use crate::identity::Identity;

/// Action identifiers passed to the gate.
pub const CREATE_ACCOUNT: &str = "create_account";
pub const SET_ORACLE_ADDRESS: &str = "set_oracle_address";
pub const SET_RECOVERY_ADDRESS: &str = "set_recovery_address";
pub const SET_PROVIDER: &str = "set_provider";
pub const UPDATE_PROVIDER_FOR_ACCOUNT: &str = "update_provider_for_account";
pub const SET_BACKEND: &str = "set_backend";
pub const SET_REGISTRY: &str = "set_registry";

pub trait AuthorizationGate: Send + Sync {
    /// May `caller` perform `action` against `context`?
    fn can_call(&self, caller: &Identity, context: &Identity, action: &str) -> bool;
}

/// Gate that admits everyone. Useful for deployments that delegate policy
/// elsewhere, and for tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl AuthorizationGate for AllowAll {
    fn can_call(&self, _caller: &Identity, _context: &Identity, _action: &str) -> bool {
        true
    }
}
