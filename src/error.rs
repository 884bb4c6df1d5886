use crate::identity::Identity;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WardenError {
    #[error("Null identity where {0} is required")]
    NullIdentity(&'static str),
    #[error("Account already initialized")]
    AlreadyInitialized,
    #[error("Account not initialized")]
    NotInitialized,
    #[error("Unknown transaction id {0}")]
    UnknownTransaction(u64),
    #[error("Transaction {0} already executed")]
    AlreadyExecuted(u64),
    #[error("Vault {vault} is bound to {bound}, rejected caller {caller}")]
    UnboundVaultCaller {
        vault: Identity,
        bound: Identity,
        caller: Identity,
    },
    #[error("Vault {vault} is bound to {bound}, cannot attach to router {router}")]
    VaultBindingMismatch {
        vault: Identity,
        bound: Identity,
        router: Identity,
    },
    #[error("Malformed signature material: {0}")]
    MalformedSignature(String),
    #[error("Forward to {0} failed: {1}")]
    ForwardFailed(Identity, String),
    #[error("Backend failure: {0}")]
    BackendFailure(String),
    #[error("Registry failure: {0}")]
    RegistryFailure(String),
    #[error("Authorization gate denied '{action}' for {caller}")]
    GateDenied { caller: Identity, action: String },
}

/// Outcome of a valid mutating call. Hard failures abort as `WardenError`;
/// these codes cover calls that complete without aborting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultCode {
    /// Applied immediately.
    Ok,
    /// Caller lacks the required identity; state untouched.
    Unauthorized,
    /// Valid request deferred into the multisig ledger.
    MultisigAdded,
}
