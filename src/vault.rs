//! Minimal execution sandbox. A vault holds the outbound-call capability
//! for exactly one account router; everyone else is turned away.

use crate::error::WardenError;
use crate::identity::Identity;
use std::fmt;
use std::sync::Arc;

/// Seam to the outside world. Implementations perform the actual call to a
/// destination; tests substitute a recording double.
pub trait Outbound: Send + Sync {
    fn call(
        &self,
        destination: &Identity,
        payload: &[u8],
        value: u64,
    ) -> Result<Vec<u8>, WardenError>;
}

pub struct Vault {
    address: Identity,
    bound_router: Identity,
    outbound: Arc<dyn Outbound>,
}

impl Vault {
    pub fn new(
        address: Identity,
        bound_router: Identity,
        outbound: Arc<dyn Outbound>,
    ) -> Result<Self, WardenError> {
        if address.is_null() {
            return Err(WardenError::NullIdentity("vault address"));
        }
        if bound_router.is_null() {
            return Err(WardenError::NullIdentity("bound router"));
        }
        Ok(Vault {
            address,
            bound_router,
            outbound,
        })
    }

    pub fn address(&self) -> &Identity {
        &self.address
    }

    pub fn bound_router(&self) -> &Identity {
        &self.bound_router
    }

    /// Perform an outbound call on behalf of the bound router. Any other
    /// caller is a hard abort, no call leaves the vault.
    pub fn forward(
        &self,
        caller: &Identity,
        destination: &Identity,
        payload: &[u8],
        value: u64,
    ) -> Result<Vec<u8>, WardenError> {
        if *caller != self.bound_router {
            return Err(WardenError::UnboundVaultCaller {
                vault: self.address.clone(),
                bound: self.bound_router.clone(),
                caller: caller.clone(),
            });
        }
        self.outbound.call(destination, payload, value)
    }
}

impl fmt::Debug for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault")
            .field("address", &self.address)
            .field("bound_router", &self.bound_router)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{id, RecordingOutbound};

    #[test]
    fn test_rejects_null_references() {
        let outbound = Arc::new(RecordingOutbound::new());
        assert!(Vault::new(Identity::null(), id("router"), outbound.clone()).is_err());
        assert!(Vault::new(id("vault"), Identity::null(), outbound).is_err());
    }

    #[test]
    fn test_forward_from_bound_router() {
        let outbound = Arc::new(RecordingOutbound::new());
        let vault = Vault::new(id("vault"), id("router"), outbound.clone()).unwrap();

        vault
            .forward(&id("router"), &id("target"), b"payload", 7)
            .unwrap();

        let calls = outbound.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].destination, id("target"));
        assert_eq!(calls[0].payload, b"payload");
        assert_eq!(calls[0].value, 7);
    }

    #[test]
    fn test_forward_from_stranger_is_hard_abort() {
        let outbound = Arc::new(RecordingOutbound::new());
        let vault = Vault::new(id("vault"), id("router"), outbound.clone()).unwrap();

        let err = vault
            .forward(&id("mallory"), &id("target"), b"payload", 0)
            .unwrap_err();
        assert!(matches!(err, WardenError::UnboundVaultCaller { .. }));
        assert_eq!(outbound.count(), 0);
    }

    #[test]
    fn test_downstream_failure_propagates() {
        let outbound = Arc::new(RecordingOutbound::new());
        outbound.fail_next();
        let vault = Vault::new(id("vault"), id("router"), outbound.clone()).unwrap();

        assert!(vault
            .forward(&id("router"), &id("target"), b"payload", 0)
            .is_err());
    }
}
