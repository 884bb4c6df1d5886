//! Self-directed payloads of pending transactions. A protected mutation or
//! forward is encoded as an `Action` on submission and replayed against the
//! account when the confirmation threshold is met.

use crate::identity::Identity;
use crate::vault::Vault;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum Action {
    SetOracle(Identity),
    /// Null opts out of recovery.
    SetRecoveryContract(Identity),
    SetVault(Arc<Vault>),
    SetProtection(bool),
    Forward {
        destination: Identity,
        payload: Vec<u8>,
        value: u64,
        require_success: bool,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::SetOracle(_) => "SetOracle",
            Action::SetRecoveryContract(_) => "SetRecoveryContract",
            Action::SetVault(_) => "SetVault",
            Action::SetProtection(_) => "SetProtection",
            Action::Forward { .. } => "Forward",
        }
    }
}
