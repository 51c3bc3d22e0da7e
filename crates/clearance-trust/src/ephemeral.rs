//! Single-use ephemeral keypairs.
//!
//! An [`EphemeralKeyPair`] decrypts exactly one response. The `destroyed`
//! flag is claimed with a compare-and-swap before any cryptographic work, so
//! of two racing decryptions one wins and the other fails with
//! [`ReplayOrReuseError::KeyDestroyed`]. The private bytes are zeroed
//! whether the decryption succeeds or not.

use parking_lot::Mutex;
use rand::RngCore;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use x25519_dalek::StaticSecret;
use zeroize::{Zeroize, Zeroizing};

use clearance_core::{EphemeralId, X25519PublicKey};

use crate::codec::{BoxNonce, MessageCodec};
use crate::error::{EphemeralError, ReplayOrReuseError};

/// A single-use X25519 keypair.
///
/// Never persisted and never cloned.
pub struct EphemeralKeyPair {
    id: EphemeralId,
    public: X25519PublicKey,
    secret: Mutex<Zeroizing<[u8; 32]>>,
    destroyed: AtomicBool,
}

impl EphemeralKeyPair {
    /// Generate a fresh keypair.
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; 32]);
        rand::thread_rng().fill_bytes(bytes.as_mut());
        let public = X25519PublicKey::from(x25519_dalek::PublicKey::from(&StaticSecret::from(
            *bytes,
        )));
        Self {
            id: EphemeralId::derive(&public),
            public,
            secret: Mutex::new(bytes),
            destroyed: AtomicBool::new(false),
        }
    }

    /// Identifier derived from the public key.
    pub fn id(&self) -> EphemeralId {
        self.id
    }

    /// The public half, sent to the authority.
    pub fn public_key(&self) -> X25519PublicKey {
        self.public
    }

    /// Whether the private half has been used or discarded.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Whether every private byte is zero.
    pub fn secret_is_zeroed(&self) -> bool {
        self.secret.lock().iter().all(|b| *b == 0)
    }

    /// Decrypt the one response this key exists for, then destroy the key.
    ///
    /// The key is zeroed before this returns, on success and on failure.
    pub fn decrypt_and_destroy(
        &self,
        sender: &X25519PublicKey,
        nonce: &BoxNonce,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, EphemeralError> {
        self.claim()?;

        let mut secret = self.secret.lock();
        let result = MessageCodec::open(&StaticSecret::from(**secret), sender, nonce, ciphertext);
        secret.zeroize();
        drop(secret);

        match &result {
            Ok(_) => tracing::debug!(ephemeral_id = %self.id, "ephemeral key used and destroyed"),
            Err(e) => {
                tracing::warn!(ephemeral_id = %self.id, error = %e, "ephemeral decryption failed")
            }
        }
        Ok(result?)
    }

    /// Destroy without decrypting, e.g. for an abandoned attempt.
    pub fn destroy(&self) -> Result<(), ReplayOrReuseError> {
        self.claim()?;
        self.secret.lock().zeroize();
        Ok(())
    }

    fn claim(&self) -> Result<(), ReplayOrReuseError> {
        self.destroyed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| ReplayOrReuseError::KeyDestroyed(self.id))
    }
}

impl fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("id", &self.id)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CryptoError;
    use rand::rngs::OsRng;
    use std::sync::Arc;

    fn respond(to: &EphemeralKeyPair, plaintext: &[u8]) -> (X25519PublicKey, BoxNonce, Vec<u8>) {
        let server = StaticSecret::random_from_rng(OsRng);
        let server_pub = X25519PublicKey::from(x25519_dalek::PublicKey::from(&server));
        let nonce = BoxNonce::generate();
        let ct = MessageCodec::seal(&server, &to.public_key(), &nonce, plaintext).unwrap();
        (server_pub, nonce, ct)
    }

    #[test]
    fn test_forward_secrecy_after_decrypt() {
        let key = EphemeralKeyPair::generate();
        assert!(!key.secret_is_zeroed());
        let (server_pub, nonce, ct) = respond(&key, b"classified");

        let pt = key.decrypt_and_destroy(&server_pub, &nonce, &ct).unwrap();
        assert_eq!(pt, b"classified");
        assert!(key.is_destroyed());
        assert!(key.secret_is_zeroed());

        assert_eq!(
            key.decrypt_and_destroy(&server_pub, &nonce, &ct),
            Err(EphemeralError::Reuse(ReplayOrReuseError::KeyDestroyed(key.id())))
        );
    }

    #[test]
    fn test_failed_decrypt_still_destroys() {
        let key = EphemeralKeyPair::generate();
        let (server_pub, nonce, mut ct) = respond(&key, b"classified");
        ct[3] ^= 0x80;

        assert_eq!(
            key.decrypt_and_destroy(&server_pub, &nonce, &ct),
            Err(EphemeralError::Crypto(CryptoError::Decryption))
        );
        assert!(key.is_destroyed());
        assert!(key.secret_is_zeroed());
    }

    #[test]
    fn test_id_derived_from_public_key() {
        let key = EphemeralKeyPair::generate();
        assert_eq!(key.id(), EphemeralId::derive(&key.public_key()));
        assert_ne!(key.id(), EphemeralKeyPair::generate().id());
    }

    #[test]
    fn test_explicit_destroy() {
        let key = EphemeralKeyPair::generate();
        key.destroy().unwrap();
        assert!(key.secret_is_zeroed());
        assert!(key.destroy().is_err());
    }

    #[test]
    fn test_racing_decryptions_one_wins() {
        let key = Arc::new(EphemeralKeyPair::generate());
        let (server_pub, nonce, ct) = respond(&key, b"only once");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let key = key.clone();
                let ct = ct.clone();
                std::thread::spawn(move || key.decrypt_and_destroy(&server_pub, &nonce, &ct))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter(|r| r.is_err())
            .all(|r| matches!(r, Err(EphemeralError::Reuse(ReplayOrReuseError::KeyDestroyed(_))))));
    }
}
