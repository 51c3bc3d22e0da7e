//! Sealed message envelope.
//!
//! A [`SealedMessage`] carries the sender's X25519 public key, the nonce and
//! the ciphertext, so the recipient needs nothing but its own secret.
//! Anonymous envelopes use a fresh sender key that is dropped right after
//! sealing.

use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use x25519_dalek::StaticSecret;

use clearance_core::X25519PublicKey;

use crate::codec::{BoxNonce, MessageCodec};
use crate::error::CryptoError;

/// Envelope format version.
pub const SEALED_MESSAGE_VERSION: u8 = 1;

/// An encrypted message with everything needed to open it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedMessage {
    pub version: u8,
    pub sender: X25519PublicKey,
    pub nonce: BoxNonce,
    pub ciphertext: Vec<u8>,
}

impl SealedMessage {
    /// Seal from a known sender key.
    pub fn seal_from(
        sender_secret: &StaticSecret,
        recipient: &X25519PublicKey,
        plaintext: &[u8],
    ) -> Result<Self, CryptoError> {
        let nonce = BoxNonce::generate();
        let ciphertext = MessageCodec::seal(sender_secret, recipient, &nonce, plaintext)?;
        Ok(Self {
            version: SEALED_MESSAGE_VERSION,
            sender: X25519PublicKey::from(x25519_dalek::PublicKey::from(sender_secret)),
            nonce,
            ciphertext,
        })
    }

    /// Seal with a throwaway sender key.
    pub fn seal_anonymous(recipient: &X25519PublicKey, plaintext: &[u8]) -> Result<Self, CryptoError> {
        let sender_secret = StaticSecret::random_from_rng(OsRng);
        Self::seal_from(&sender_secret, recipient, plaintext)
    }

    /// Open with the recipient's secret.
    pub fn open(&self, recipient_secret: &StaticSecret) -> Result<Vec<u8>, CryptoError> {
        if self.version != SEALED_MESSAGE_VERSION {
            return Err(CryptoError::Malformed(format!(
                "unsupported envelope version {}",
                self.version
            )));
        }
        MessageCodec::open(recipient_secret, &self.sender, &self.nonce, &self.ciphertext)
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| CryptoError::Malformed(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        ciborium::from_reader(bytes).map_err(|e| CryptoError::Malformed(e.to_string()))
    }
}
