//! Long-term dual-key identity.
//!
//! A single 32-byte seed yields both keys:
//! - an Ed25519 signing key (the seed is the Ed25519 secret key), and
//! - an X25519 encryption key obtained by moving the signing key onto
//!   Curve25519. The secret scalar is the first half of SHA-512(seed), the
//!   public key is the Montgomery form of the Ed25519 public key.
//!
//! The same seed always yields the same keys and fingerprints.

use ed25519_dalek::{Signer, SigningKey};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use x25519_dalek::StaticSecret;
use zeroize::Zeroizing;

use crate::crypto::{Ed25519PublicKey, Ed25519Signature, Fingerprint, X25519PublicKey};

/// Which half of a dual-key identity a fingerprint refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPurpose {
    Signing,
    Encryption,
}

/// Signing and encryption keys derived from one seed.
pub struct DualKeyIdentity {
    seed: Zeroizing<[u8; 32]>,
    signing_key: SigningKey,
    encryption_secret: StaticSecret,
    encryption_public: X25519PublicKey,
}

impl DualKeyIdentity {
    /// Derive both keys from a 32-byte seed.
    pub fn generate(seed: [u8; 32]) -> Self {
        let seed = Zeroizing::new(seed);
        let signing_key = SigningKey::from_bytes(&seed);
        let encryption_secret = StaticSecret::from(signing_key.to_scalar_bytes());
        let encryption_public =
            X25519PublicKey::from_bytes(signing_key.verifying_key().to_montgomery().to_bytes());
        Self {
            seed,
            signing_key,
            encryption_secret,
            encryption_public,
        }
    }

    /// Generate an identity from a fresh random seed.
    pub fn random() -> Self {
        let mut seed = Zeroizing::new([0u8; 32]);
        rand::thread_rng().fill_bytes(seed.as_mut());
        Self::generate(*seed)
    }

    /// The seed, for private persistence only.
    pub fn seed(&self) -> Zeroizing<[u8; 32]> {
        self.seed.clone()
    }

    /// Sign a message with the long-term signing key.
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(message).to_bytes())
    }

    /// Ed25519 public key.
    pub fn signing_public(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// X25519 public key.
    pub fn encryption_public(&self) -> X25519PublicKey {
        self.encryption_public
    }

    /// X25519 secret for key agreement.
    pub fn encryption_secret(&self) -> &StaticSecret {
        &self.encryption_secret
    }

    /// Fingerprint of the key serving `purpose`.
    pub fn fingerprint(&self, purpose: KeyPurpose) -> Fingerprint {
        match purpose {
            KeyPurpose::Signing => self.signing_public().fingerprint(),
            KeyPurpose::Encryption => self.encryption_public.fingerprint(),
        }
    }

    /// Public material only.
    pub fn export_public(&self) -> PublicIdentity {
        PublicIdentity {
            signing_public_key: self.signing_public(),
            signing_fingerprint: self.fingerprint(KeyPurpose::Signing),
            encryption_public_key: self.encryption_public,
            encryption_fingerprint: self.fingerprint(KeyPurpose::Encryption),
        }
    }
}

impl Clone for DualKeyIdentity {
    fn clone(&self) -> Self {
        Self::generate(*self.seed)
    }
}

impl fmt::Debug for DualKeyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DualKeyIdentity({:?})", self.signing_public())
    }
}

/// The exportable half of a [`DualKeyIdentity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIdentity {
    pub signing_public_key: Ed25519PublicKey,
    pub signing_fingerprint: Fingerprint,
    pub encryption_public_key: X25519PublicKey,
    pub encryption_fingerprint: Fingerprint,
}
