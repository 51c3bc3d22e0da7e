//! Authenticated public-key encryption.
//!
//! X25519 key agreement, a BLAKE3-derived symmetric key bound to both
//! public keys, and XChaCha20-Poly1305 with a 24-byte random nonce.
//! Used for access responses, the sealed cache and wallet messaging.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::StaticSecret;
use zeroize::Zeroizing;

use clearance_core::X25519PublicKey;

use crate::error::CryptoError;

/// Nonce length in bytes.
pub const NONCE_LEN: usize = 24;

/// Key-derivation context for box keys.
const BOX_KEY_CONTEXT: &str = "clearance-box-v1 xchacha20poly1305 key";

/// A 192-bit XChaCha20-Poly1305 nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxNonce(pub [u8; NONCE_LEN]);

impl BoxNonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; NONCE_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; NONCE_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::Malformed(format!("nonce must be {NONCE_LEN} bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }
}

/// Box encryption between two X25519 keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageCodec;

impl MessageCodec {
    /// Encrypt from `sender_secret` to `recipient`.
    pub fn seal(
        sender_secret: &StaticSecret,
        recipient: &X25519PublicKey,
        nonce: &BoxNonce,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let sender_public = X25519PublicKey::from(x25519_dalek::PublicKey::from(sender_secret));
        let cipher = Self::cipher(sender_secret, recipient, &sender_public, recipient)?;
        cipher
            .encrypt(XNonce::from_slice(&nonce.0), plaintext)
            .map_err(|e| CryptoError::Encryption(e.to_string()))
    }

    /// Decrypt a box sent by `sender` to the holder of `recipient_secret`.
    pub fn open(
        recipient_secret: &StaticSecret,
        sender: &X25519PublicKey,
        nonce: &BoxNonce,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let recipient_public =
            X25519PublicKey::from(x25519_dalek::PublicKey::from(recipient_secret));
        let cipher = Self::cipher(recipient_secret, sender, sender, &recipient_public)?;
        cipher
            .decrypt(XNonce::from_slice(&nonce.0), ciphertext)
            .map_err(|_| CryptoError::Decryption)
    }

    fn cipher(
        own_secret: &StaticSecret,
        peer: &X25519PublicKey,
        sender: &X25519PublicKey,
        recipient: &X25519PublicKey,
    ) -> Result<XChaCha20Poly1305, CryptoError> {
        let shared = own_secret.diffie_hellman(&peer.to_dalek());
        if !shared.was_contributory() {
            return Err(CryptoError::InvalidKey("low-order public key".into()));
        }

        let mut hasher = blake3::Hasher::new_derive_key(BOX_KEY_CONTEXT);
        hasher.update(shared.as_bytes());
        hasher.update(sender.as_bytes());
        hasher.update(recipient.as_bytes());
        let key = Zeroizing::new(*hasher.finalize().as_bytes());

        XChaCha20Poly1305::new_from_slice(key.as_ref())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::OsRng;

    fn keypair() -> (StaticSecret, X25519PublicKey) {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = X25519PublicKey::from(x25519_dalek::PublicKey::from(&secret));
        (secret, public)
    }

    #[test]
    fn test_seal_open() {
        let (alice, alice_pub) = keypair();
        let (bob, bob_pub) = keypair();
        let nonce = BoxNonce::generate();

        let ct = MessageCodec::seal(&alice, &bob_pub, &nonce, b"hello bob").unwrap();
        assert_eq!(ct.len(), b"hello bob".len() + 16);
        let pt = MessageCodec::open(&bob, &alice_pub, &nonce, &ct).unwrap();
        assert_eq!(pt, b"hello bob");
    }

    #[test]
    fn test_wrong_recipient_fails() {
        let (alice, alice_pub) = keypair();
        let (_bob, bob_pub) = keypair();
        let (eve, _) = keypair();
        let nonce = BoxNonce::generate();

        let ct = MessageCodec::seal(&alice, &bob_pub, &nonce, b"secret").unwrap();
        assert_eq!(
            MessageCodec::open(&eve, &alice_pub, &nonce, &ct),
            Err(CryptoError::Decryption)
        );
    }

    #[test]
    fn test_tampering_detected() {
        let (alice, alice_pub) = keypair();
        let (bob, bob_pub) = keypair();
        let nonce = BoxNonce::generate();

        let mut ct = MessageCodec::seal(&alice, &bob_pub, &nonce, b"secret").unwrap();
        ct[0] ^= 1;
        assert!(MessageCodec::open(&bob, &alice_pub, &nonce, &ct).is_err());

        let ct = MessageCodec::seal(&alice, &bob_pub, &nonce, b"secret").unwrap();
        let other_nonce = BoxNonce::generate();
        assert!(MessageCodec::open(&bob, &alice_pub, &other_nonce, &ct).is_err());
    }

    #[test]
    fn test_low_order_point_rejected() {
        let (alice, _) = keypair();
        let zero = X25519PublicKey::from_bytes([0u8; 32]);
        assert!(matches!(
            MessageCodec::seal(&alice, &zero, &BoxNonce::generate(), b"x"),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_plaintext_lengths() {
        let (alice, alice_pub) = keypair();
        let (bob, bob_pub) = keypair();
        for len in [0usize, 1, 10_001] {
            let plaintext = vec![0x5a; len];
            let nonce = BoxNonce::generate();
            let ct = MessageCodec::seal(&alice, &bob_pub, &nonce, &plaintext).unwrap();
            let pt = MessageCodec::open(&bob, &alice_pub, &nonce, &ct).unwrap();
            assert_eq!(pt, plaintext);
        }
    }

    proptest! {
        #[test]
        fn prop_seal_open(plaintext in prop::collection::vec(any::<u8>(), 0..2048)) {
            let (alice, alice_pub) = keypair();
            let (bob, bob_pub) = keypair();
            let nonce = BoxNonce::generate();
            let ct = MessageCodec::seal(&alice, &bob_pub, &nonce, &plaintext).unwrap();
            prop_assert_eq!(MessageCodec::open(&bob, &alice_pub, &nonce, &ct).unwrap(), plaintext);
        }
    }
}
