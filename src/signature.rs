//! Off-chain authorization: message digests and signer recovery.
//!
//! The oracle signs `sha256(pass ‖ sender ‖ destination ‖ payload ‖ value)`
//! out of band; the router recomputes the digest with the actual caller as
//! sender, so a signature produced for anyone else simply fails to verify.

use crate::error::WardenError;
use crate::identity::Identity;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

/// Signature material handed in by the caller alongside a signed forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedAuth {
    /// Claimed signer public key, 32 bytes.
    pub public_key: Vec<u8>,
    /// ed25519 signature over the message digest, 64 bytes.
    pub signature: Vec<u8>,
}

/// Digest binding a single-use token, the intended sender and the full
/// forward request.
pub fn message_digest(
    pass: &[u8],
    sender: &Identity,
    destination: &Identity,
    payload: &[u8],
    value: u64,
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(pass);
    hasher.update(sender.as_str().as_bytes());
    hasher.update(destination.as_str().as_bytes());
    hasher.update(payload);
    hasher.update(value.to_be_bytes());
    hasher.finalize().into()
}

/// Recover the signer identity of `digest`.
///
/// Structurally broken material (wrong lengths, undecodable key) is a hard
/// error. A well-formed signature that does not verify recovers nobody:
/// `Ok(None)`, the caller decides what that means.
pub fn recover(digest: &[u8; 32], auth: &SignedAuth) -> Result<Option<Identity>, WardenError> {
    let key_bytes: [u8; 32] = auth
        .public_key
        .as_slice()
        .try_into()
        .map_err(|_| WardenError::MalformedSignature("public key must be 32 bytes".into()))?;
    let key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| WardenError::MalformedSignature(format!("invalid public key: {e}")))?;
    let signature = Signature::from_slice(&auth.signature)
        .map_err(|e| WardenError::MalformedSignature(format!("invalid signature: {e}")))?;

    match key.verify(digest, &signature) {
        Ok(()) => Ok(Some(Identity::from_verifying_key(&key))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;

    fn signed(key: &SigningKey, digest: &[u8; 32]) -> SignedAuth {
        SignedAuth {
            public_key: key.verifying_key().to_bytes().to_vec(),
            signature: key.sign(digest).to_bytes().to_vec(),
        }
    }

    #[test]
    fn test_recover_valid_signature() {
        let key = SigningKey::generate(&mut OsRng);
        let digest = message_digest(
            b"pass",
            &Identity::new("alice"),
            &Identity::new("target"),
            b"payload",
            42,
        );

        let recovered = recover(&digest, &signed(&key, &digest)).unwrap();
        assert_eq!(
            recovered,
            Some(Identity::from_verifying_key(&key.verifying_key()))
        );
    }

    #[test]
    fn test_recover_rejects_tampered_digest() {
        let key = SigningKey::generate(&mut OsRng);
        let digest = message_digest(
            b"pass",
            &Identity::new("alice"),
            &Identity::new("target"),
            b"payload",
            42,
        );
        let other = message_digest(
            b"pass",
            &Identity::new("mallory"),
            &Identity::new("target"),
            b"payload",
            42,
        );

        // Signed for alice, verified against mallory's digest.
        assert_eq!(recover(&other, &signed(&key, &digest)).unwrap(), None);
    }

    #[test]
    fn test_recover_malformed_material_is_hard_error() {
        let digest = [0u8; 32];
        let broken = SignedAuth {
            public_key: vec![1, 2, 3],
            signature: vec![0; 64],
        };
        assert!(matches!(
            recover(&digest, &broken),
            Err(WardenError::MalformedSignature(_))
        ));

        let key = SigningKey::generate(&mut OsRng);
        let short_sig = SignedAuth {
            public_key: key.verifying_key().to_bytes().to_vec(),
            signature: vec![0; 10],
        };
        assert!(matches!(
            recover(&digest, &short_sig),
            Err(WardenError::MalformedSignature(_))
        ));
    }

    #[test]
    fn test_digest_binds_every_field() {
        let base = message_digest(b"p", &Identity::new("s"), &Identity::new("d"), b"x", 1);
        assert_ne!(
            base,
            message_digest(b"q", &Identity::new("s"), &Identity::new("d"), b"x", 1)
        );
        assert_ne!(
            base,
            message_digest(b"p", &Identity::new("s2"), &Identity::new("d"), b"x", 1)
        );
        assert_ne!(
            base,
            message_digest(b"p", &Identity::new("s"), &Identity::new("d2"), b"x", 1)
        );
        assert_ne!(
            base,
            message_digest(b"p", &Identity::new("s"), &Identity::new("d"), b"y", 1)
        );
        assert_ne!(
            base,
            message_digest(b"p", &Identity::new("s"), &Identity::new("d"), b"x", 2)
        );
    }
}
