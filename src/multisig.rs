//! 2-of-2 confirmation bookkeeping, embedded per account. The ledger only
//! keeps the books; the router owns the policy around them.

use crate::account::Action;
use crate::error::WardenError;
use crate::identity::Identity;
use std::collections::{BTreeMap, BTreeSet};

/// A protected action waiting for dual confirmation. Never deleted; once
/// executed it stays in the ledger as a tombstone.
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    pub id: u64,
    pub submitter: Identity,
    pub action: Action,
    pub confirmations: BTreeSet<Identity>,
    pub executed: bool,
}

#[derive(Debug, Default)]
pub struct MultisigLedger {
    transactions: BTreeMap<u64, PendingTransaction>,
    next_id: u64,
}

impl MultisigLedger {
    pub fn new() -> Self {
        MultisigLedger {
            transactions: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Queue an action. Ids are monotonically increasing and never reused.
    pub fn submit(&mut self, submitter: Identity, action: Action) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.transactions.insert(
            id,
            PendingTransaction {
                id,
                submitter,
                action,
                confirmations: BTreeSet::new(),
                executed: false,
            },
        );
        id
    }

    pub fn get(&self, id: u64) -> Option<&PendingTransaction> {
        self.transactions.get(&id)
    }

    /// Record a confirmation. Returns false when `sender` had already
    /// confirmed. Unknown and executed ids are hard errors.
    pub fn record_confirmation(&mut self, id: u64, sender: &Identity) -> Result<bool, WardenError> {
        let tx = self
            .transactions
            .get_mut(&id)
            .ok_or(WardenError::UnknownTransaction(id))?;
        if tx.executed {
            return Err(WardenError::AlreadyExecuted(id));
        }
        Ok(tx.confirmations.insert(sender.clone()))
    }

    /// Threshold is evaluated against the LIVE owner and oracle, not a
    /// snapshot. A confirmation recorded by a since-rotated oracle stops
    /// counting the moment the rotation lands.
    pub fn threshold_met(&self, id: u64, owner: &Identity, oracle: &Identity) -> bool {
        self.transactions
            .get(&id)
            .map(|tx| tx.confirmations.contains(owner) && tx.confirmations.contains(oracle))
            .unwrap_or(false)
    }

    pub fn mark_executed(&mut self, id: u64) {
        if let Some(tx) = self.transactions.get_mut(&id) {
            tx.executed = true;
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
