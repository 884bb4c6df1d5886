//! The account's entry point. Composes ownership checks, the protection
//! flag, the multisig ledger, backend delegation and vault forwarding.

use crate::account::Action;
use crate::backend::{AccountStorage, Backend, BackendProvider};
use crate::error::{ResultCode, WardenError};
use crate::events::Event;
use crate::identity::Identity;
use crate::multisig::{MultisigLedger, PendingTransaction};
use crate::registry::RegistrySync;
use crate::signature::{self, SignedAuth};
use crate::vault::Vault;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct AccountRouter {
    address: Identity,
    issuer: Identity,
    owner: Identity,
    oracle: Identity,
    recovery_contract: Identity,
    use_2fa: bool,
    initialized: bool,
    vault: Arc<Vault>,
    provider: Arc<BackendProvider>,
    /// Last backend identity observed by this account, for one-shot
    /// transition notices.
    backend_marker: Identity,
    ledger: MultisigLedger,
    pending_owner: Option<Identity>,
    storage: AccountStorage,
    events: Vec<Event>,
}

impl AccountRouter {
    /// Factory bootstrap. Fails hard if any reference is null; `init` must
    /// still run (issuer-only) before the account is fully operational.
    pub fn new(
        address: Identity,
        issuer: Identity,
        owner: Identity,
        recovery_contract: Identity,
        provider: Arc<BackendProvider>,
        vault: Arc<Vault>,
    ) -> Result<Self, WardenError> {
        if address.is_null() {
            return Err(WardenError::NullIdentity("account address"));
        }
        if issuer.is_null() {
            return Err(WardenError::NullIdentity("issuer"));
        }
        if owner.is_null() {
            return Err(WardenError::NullIdentity("owner"));
        }
        if recovery_contract.is_null() {
            return Err(WardenError::NullIdentity("recovery contract"));
        }
        let backend_marker = provider.backend().id();
        Ok(AccountRouter {
            address,
            issuer,
            owner,
            oracle: Identity::null(),
            recovery_contract,
            use_2fa: false,
            initialized: false,
            vault,
            provider,
            backend_marker,
            ledger: MultisigLedger::new(),
            pending_owner: None,
            storage: AccountStorage::new(),
            events: Vec::new(),
        })
    }

    /// One-shot initialization by the issuer.
    pub fn init(
        &mut self,
        caller: &Identity,
        oracle: &Identity,
        use_2fa: bool,
    ) -> Result<ResultCode, WardenError> {
        if self.initialized {
            return Err(WardenError::AlreadyInitialized);
        }
        if oracle.is_null() {
            return Err(WardenError::NullIdentity("oracle"));
        }
        if *caller != self.issuer {
            return Ok(ResultCode::Unauthorized);
        }
        self.oracle = oracle.clone();
        self.use_2fa = use_2fa;
        self.initialized = true;
        info!(account = %self.address, oracle = %self.oracle, use_2fa, "account initialized");
        Ok(ResultCode::Ok)
    }

    // --- getters ---

    pub fn address(&self) -> &Identity {
        &self.address
    }

    pub fn issuer(&self) -> &Identity {
        &self.issuer
    }

    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    pub fn oracle(&self) -> &Identity {
        &self.oracle
    }

    pub fn recovery_contract(&self) -> &Identity {
        &self.recovery_contract
    }

    pub fn use_2fa(&self) -> bool {
        self.use_2fa
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn vault(&self) -> Arc<Vault> {
        self.vault.clone()
    }

    pub fn provider(&self) -> Arc<BackendProvider> {
        self.provider.clone()
    }

    /// Is `identity` one of the two live confirmation-eligible signers?
    pub fn is_signer(&self, identity: &Identity) -> bool {
        *identity == self.owner || (!self.oracle.is_null() && *identity == self.oracle)
    }

    pub fn pending_transaction(&self, id: u64) -> Option<&PendingTransaction> {
        self.ledger.get(id)
    }

    pub fn storage(&self) -> &AccountStorage {
        &self.storage
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    // --- guarded mutations ---

    pub fn set_oracle(
        &mut self,
        caller: &Identity,
        new_oracle: Identity,
    ) -> Result<ResultCode, WardenError> {
        self.note_backend_transition();
        if new_oracle.is_null() {
            return Err(WardenError::NullIdentity("oracle"));
        }
        self.guarded(caller, Action::SetOracle(new_oracle))
    }

    /// Unlike the other guarded mutations the argument may be null: that
    /// opts the account out of recovery.
    pub fn set_recovery_contract(
        &mut self,
        caller: &Identity,
        new_recovery: Identity,
    ) -> Result<ResultCode, WardenError> {
        self.note_backend_transition();
        self.guarded(caller, Action::SetRecoveryContract(new_recovery))
    }

    pub fn set_vault(
        &mut self,
        caller: &Identity,
        new_vault: Arc<Vault>,
    ) -> Result<ResultCode, WardenError> {
        self.note_backend_transition();
        if *new_vault.bound_router() != self.address {
            return Err(WardenError::VaultBindingMismatch {
                vault: new_vault.address().clone(),
                bound: new_vault.bound_router().clone(),
                router: self.address.clone(),
            });
        }
        self.guarded(caller, Action::SetVault(new_vault))
    }

    pub fn set_2fa(&mut self, caller: &Identity, enable: bool) -> Result<ResultCode, WardenError> {
        self.note_backend_transition();
        if enable && self.oracle.is_null() {
            // Protection without an oracle can never be confirmed out of.
            return Err(WardenError::NotInitialized);
        }
        if self.use_2fa == enable {
            // Nothing to change, nothing to defer.
            if *caller != self.owner {
                return Ok(ResultCode::Unauthorized);
            }
            return Ok(ResultCode::Ok);
        }
        self.guarded(caller, Action::SetProtection(enable))
    }

    // --- forwards ---

    pub fn forward(
        &mut self,
        caller: &Identity,
        destination: Identity,
        payload: Vec<u8>,
        value: u64,
        require_success: bool,
    ) -> Result<ResultCode, WardenError> {
        self.note_backend_transition();
        if destination.is_null() {
            return Err(WardenError::NullIdentity("destination"));
        }
        self.guarded(
            caller,
            Action::Forward {
                destination,
                payload,
                value,
                require_success,
            },
        )
    }

    /// Forward past the multisig path on the strength of a single oracle
    /// signature over `(pass, caller, destination, payload, value)`.
    ///
    /// Verification failure is a SILENT no-op by design: the call returns
    /// without error and the vault is never invoked, so callers can retry
    /// with a corrected signature. Only structurally malformed signature
    /// material aborts hard.
    ///
    /// The `pass` token is caller-supplied and not tracked per account; the
    /// engine makes no replay-uniqueness promise for it.
    pub fn forward_with_signed_auth(
        &mut self,
        caller: &Identity,
        destination: Identity,
        payload: Vec<u8>,
        value: u64,
        require_success: bool,
        pass: &[u8],
        auth: &SignedAuth,
    ) -> Result<(), WardenError> {
        self.note_backend_transition();
        if destination.is_null() {
            return Err(WardenError::NullIdentity("destination"));
        }
        if !self.use_2fa {
            // Unprotected accounts do not consult the signature at all.
            if *caller != self.owner {
                return Ok(());
            }
            return self.do_forward(destination, payload, value, require_success);
        }

        let digest = signature::message_digest(pass, caller, &destination, &payload, value);
        match signature::recover(&digest, auth)? {
            Some(signer) if signer == self.oracle => {
                self.do_forward(destination, payload, value, require_success)
            }
            _ => {
                debug!(account = %self.address, %caller, "signed forward rejected, no-op");
                Ok(())
            }
        }
    }

    // --- multisig confirmation ---

    pub fn confirm_transaction(
        &mut self,
        caller: &Identity,
        id: u64,
    ) -> Result<ResultCode, WardenError> {
        self.note_backend_transition();
        let already_confirmed = {
            let tx = self
                .ledger
                .get(id)
                .ok_or(WardenError::UnknownTransaction(id))?;
            if tx.executed {
                return Err(WardenError::AlreadyExecuted(id));
            }
            tx.confirmations.contains(caller)
        };
        // Confirmations are judged against the live owner/oracle pair, not
        // the pair in effect at submission time.
        if !self.is_signer(caller) {
            return Ok(ResultCode::Unauthorized);
        }
        if !already_confirmed {
            self.ledger.record_confirmation(id, caller)?;
            self.emit(Event::TransactionConfirmed {
                account: self.address.clone(),
                id,
                sender: caller.clone(),
            });
        } else if !self.ledger.threshold_met(id, &self.owner, &self.oracle) {
            // Duplicate confirmation with nothing left to execute.
            return Ok(ResultCode::Unauthorized);
        }

        if self.ledger.threshold_met(id, &self.owner, &self.oracle) {
            let (submitter, action) = match self.ledger.get(id) {
                Some(tx) => (tx.submitter.clone(), tx.action.clone()),
                None => return Err(WardenError::UnknownTransaction(id)),
            };
            // A require_success abort leaves the confirmations in place and
            // the transaction unexecuted; a retried confirm lands here again.
            self.apply(submitter, action)?;
            self.ledger.mark_executed(id);
            self.emit(Event::TransactionExecuted {
                account: self.address.clone(),
                id,
            });
            info!(account = %self.address, id, "pending transaction executed");
        }
        Ok(ResultCode::Ok)
    }

    // --- ownership ---

    /// Single-step handoff. Never multisig-gated: ownership is the root of
    /// the protection mechanism and cannot depend on it.
    pub fn transfer_ownership(
        &mut self,
        caller: &Identity,
        new_owner: Identity,
    ) -> Result<ResultCode, WardenError> {
        self.note_backend_transition();
        if new_owner.is_null() {
            return Err(WardenError::NullIdentity("new owner"));
        }
        if *caller != self.owner {
            return Ok(ResultCode::Unauthorized);
        }
        let old_owner = self.assign_owner(new_owner.clone());
        self.emit(Event::OwnershipTransferred {
            account: self.address.clone(),
            old_owner,
            new_owner,
        });
        Ok(ResultCode::Ok)
    }

    /// First phase of the two-phase handoff. A later proposal overwrites an
    /// unclaimed one.
    pub fn change_contract_ownership(
        &mut self,
        caller: &Identity,
        new_owner: Identity,
    ) -> Result<ResultCode, WardenError> {
        self.note_backend_transition();
        if new_owner.is_null() {
            return Err(WardenError::NullIdentity("proposed owner"));
        }
        if *caller != self.owner {
            return Ok(ResultCode::Unauthorized);
        }
        self.pending_owner = Some(new_owner.clone());
        self.emit(Event::OwnershipChangeProposed {
            account: self.address.clone(),
            proposed: new_owner,
        });
        Ok(ResultCode::Ok)
    }

    /// Second phase: only the proposed owner may claim.
    pub fn claim_contract_ownership(
        &mut self,
        caller: &Identity,
    ) -> Result<ResultCode, WardenError> {
        self.note_backend_transition();
        if self.pending_owner.as_ref() != Some(caller) {
            return Ok(ResultCode::Unauthorized);
        }
        self.pending_owner = None;
        self.assign_owner(caller.clone());
        self.emit(Event::OwnershipClaimed {
            account: self.address.clone(),
            new_owner: caller.clone(),
        });
        Ok(ResultCode::Ok)
    }

    /// Out-of-band recovery. Recovery-contract-only, never multisig-gated:
    /// it must work when protection is on and both parties are unavailable.
    pub fn recover_user(
        &mut self,
        caller: &Identity,
        new_owner: Identity,
    ) -> Result<ResultCode, WardenError> {
        self.note_backend_transition();
        if new_owner.is_null() {
            return Err(WardenError::NullIdentity("new owner"));
        }
        if self.recovery_contract.is_null() || *caller != self.recovery_contract {
            return Ok(ResultCode::Unauthorized);
        }
        let old_owner = self.assign_owner(new_owner.clone());
        self.emit(Event::OwnershipTransferred {
            account: self.address.clone(),
            old_owner,
            new_owner: new_owner.clone(),
        });
        info!(account = %self.address, %new_owner, "ownership recovered");
        Ok(ResultCode::Ok)
    }

    // --- backend indirection ---

    /// Re-point the provider reference. Issuer-only.
    pub fn update_backend_provider(
        &mut self,
        caller: &Identity,
        provider: Arc<BackendProvider>,
    ) -> Result<ResultCode, WardenError> {
        self.note_backend_transition();
        if *caller != self.issuer {
            return Ok(ResultCode::Unauthorized);
        }
        self.provider = provider;
        // The next inbound call notices the backend change, if any.
        Ok(ResultCode::Ok)
    }

    /// Route an unrecognized call into the current backend, with this
    /// account's own storage as execution context.
    pub fn delegate(
        &mut self,
        caller: &Identity,
        payload: &[u8],
    ) -> Result<Vec<u8>, WardenError> {
        self.note_backend_transition();
        let backend = self.provider.backend();
        backend.run(&self.address, caller, &mut self.storage, payload)
    }

    // --- internals ---

    /// The guarded-mutation rule: owner-only; immediate when unprotected,
    /// deferred into the ledger when protected.
    fn guarded(&mut self, caller: &Identity, action: Action) -> Result<ResultCode, WardenError> {
        if *caller != self.owner {
            return Ok(ResultCode::Unauthorized);
        }
        if !self.use_2fa {
            self.apply(caller.clone(), action)?;
            return Ok(ResultCode::Ok);
        }
        let id = self.ledger.submit(caller.clone(), action);
        self.emit(Event::TransactionSubmitted {
            account: self.address.clone(),
            id,
        });
        self.ledger.record_confirmation(id, caller)?;
        self.emit(Event::TransactionConfirmed {
            account: self.address.clone(),
            id,
            sender: caller.clone(),
        });
        debug!(account = %self.address, id, "mutation deferred to multisig");
        Ok(ResultCode::MultisigAdded)
    }

    /// Apply an action against self (configuration) or via the vault
    /// (forwards). Runs immediately for unprotected accounts, or inside the
    /// confirming call once the threshold is met.
    fn apply(&mut self, initiator: Identity, action: Action) -> Result<(), WardenError> {
        match action {
            Action::SetOracle(oracle) => {
                info!(account = %self.address, %oracle, "oracle updated");
                self.oracle = oracle;
            }
            Action::SetRecoveryContract(recovery) => {
                self.recovery_contract = recovery;
            }
            Action::SetVault(vault) => {
                info!(account = %self.address, vault = %vault.address(), "vault rebound");
                self.vault = vault;
            }
            Action::SetProtection(enabled) => {
                if self.use_2fa != enabled {
                    self.use_2fa = enabled;
                    self.emit(Event::ProtectionChanged {
                        account: self.address.clone(),
                        initiator,
                        enabled,
                    });
                    info!(account = %self.address, enabled, "protection flag changed");
                }
            }
            Action::Forward {
                destination,
                payload,
                value,
                require_success,
            } => {
                self.do_forward(destination, payload, value, require_success)?;
            }
        }
        Ok(())
    }

    fn do_forward(
        &mut self,
        destination: Identity,
        payload: Vec<u8>,
        value: u64,
        require_success: bool,
    ) -> Result<(), WardenError> {
        match self
            .vault
            .forward(&self.address, &destination, &payload, value)
        {
            Ok(_) => {
                self.emit(Event::Forwarded {
                    account: self.address.clone(),
                    destination,
                    value,
                    payload,
                });
                Ok(())
            }
            Err(e) if require_success => Err(e),
            Err(e) => {
                warn!(account = %self.address, %destination, error = %e, "forward failed, tolerated");
                Ok(())
            }
        }
    }

    /// Swap the owner and push the change to the registry, best-effort.
    /// Returns the previous owner.
    fn assign_owner(&mut self, new_owner: Identity) -> Identity {
        let old_owner = std::mem::replace(&mut self.owner, new_owner);
        if let Some(registry) = self.provider.registry() {
            if let Err(e) = registry.change_record(&self.address, &old_owner, &self.owner) {
                warn!(account = %self.address, error = %e, "registry sync failed, ignored");
            }
        }
        old_owner
    }

    /// One notice per backend transition, on the first call that observes it.
    fn note_backend_transition(&mut self) {
        let current = self.provider.backend().id();
        if current != self.backend_marker {
            let old_backend = std::mem::replace(&mut self.backend_marker, current.clone());
            info!(account = %self.address, %old_backend, new_backend = %current, "backend transitioned");
            self.emit(Event::BackendTransitioned {
                account: self.address.clone(),
                old_backend,
                new_backend: current,
            });
        }
    }

    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }
}
