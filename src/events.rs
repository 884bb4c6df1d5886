//! Observable events. Each emitter records its own log; tests and callers
//! inspect it instead of a global event bus.

use crate::identity::Identity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    AccountCreated {
        account: Identity,
        vault: Identity,
        owner: Identity,
        recovery: Identity,
    },
    OwnershipTransferred {
        account: Identity,
        old_owner: Identity,
        new_owner: Identity,
    },
    OwnershipChangeProposed {
        account: Identity,
        proposed: Identity,
    },
    OwnershipClaimed {
        account: Identity,
        new_owner: Identity,
    },
    BackendTransitioned {
        account: Identity,
        old_backend: Identity,
        new_backend: Identity,
    },
    ProtectionChanged {
        account: Identity,
        initiator: Identity,
        enabled: bool,
    },
    TransactionSubmitted {
        account: Identity,
        id: u64,
    },
    TransactionConfirmed {
        account: Identity,
        id: u64,
        sender: Identity,
    },
    TransactionExecuted {
        account: Identity,
        id: u64,
    },
    Forwarded {
        account: Identity,
        destination: Identity,
        value: u64,
        payload: Vec<u8>,
    },
}

impl Event {
    /// Short name, used to filter a recorded log.
    pub fn name(&self) -> &'static str {
        match self {
            Event::AccountCreated { .. } => "AccountCreated",
            Event::OwnershipTransferred { .. } => "OwnershipTransferred",
            Event::OwnershipChangeProposed { .. } => "OwnershipChangeProposed",
            Event::OwnershipClaimed { .. } => "OwnershipClaimed",
            Event::BackendTransitioned { .. } => "BackendTransitioned",
            Event::ProtectionChanged { .. } => "ProtectionChanged",
            Event::TransactionSubmitted { .. } => "TransactionSubmitted",
            Event::TransactionConfirmed { .. } => "TransactionConfirmed",
            Event::TransactionExecuted { .. } => "TransactionExecuted",
            Event::Forwarded { .. } => "Forwarded",
        }
    }
}

/// Filter a recorded log by event name.
pub fn named<'a>(log: &'a [Event], name: &str) -> Vec<&'a Event> {
    log.iter().filter(|e| e.name() == name).collect()
}
