//! Golden test vectors for deterministic identity derivation.
//!
//! A seed is an Ed25519 secret key, so the signing half of every vector is
//! pinned by RFC 8032 section 7.1. The encryption half and both
//! fingerprints are checked for consistency with the signing key.

use clearance_core::{DualKeyIdentity, Fingerprint, KeyPurpose, X25519PublicKey};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Seed (hex).
    pub seed: &'static str,
    /// Expected Ed25519 public key (hex).
    pub expected_signing_public: &'static str,
    /// Expected signature over the empty message (hex), where pinned.
    pub expected_empty_signature: Option<&'static str>,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "RFC 8032 test 1",
            seed: "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60",
            expected_signing_public:
                "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a",
            expected_empty_signature: Some(
                "e5564300c360ac729086e2cc806e828a84877f1eb8e5d974d873e065224901555fb8821590a33bacc61e39701cf9b46bd25bf5f0595bbe24655141438e7a100b",
            ),
        },
        GoldenVector {
            name: "RFC 8032 test 2",
            seed: "4ccd089b28ff96da9db6c346ec114e0f5b8a319f35aba624da8cf6ed4fb8a6fb",
            expected_signing_public:
                "3d4017c3e843895a92b70aa74d1b7ebc9c982ccf2ec4968cc0cd55f12af4660c",
            expected_empty_signature: None,
        },
        GoldenVector {
            name: "RFC 8032 test 3",
            seed: "c5aa8df43f9f837bedb7442f31dcb7b166d38535076f094b85ce3a2e0b4458f7",
            expected_signing_public:
                "fc51cd8e6218a1a38da47ed00230f0580816ed13ba3303ac5deb911548908025",
            expected_empty_signature: None,
        },
    ]
}

/// Derive the identity for a vector.
pub fn identity_from_vector(vector: &GoldenVector) -> DualKeyIdentity {
    let mut seed = [0u8; 32];
    hex::decode_to_slice(vector.seed, &mut seed).expect("vector seed is 32 hex bytes");
    DualKeyIdentity::generate(seed)
}

/// The X25519 key an Ed25519 public key converts to.
pub fn montgomery_of(signing_public: &[u8; 32]) -> X25519PublicKey {
    let key = ed25519_dalek::VerifyingKey::from_bytes(signing_public)
        .expect("vector key is a valid point");
    X25519PublicKey::from_bytes(key.to_montgomery().to_bytes())
}

/// Check every vector, reporting `(name, matches, detail)`.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let identity = identity_from_vector(v);
            let signing = identity.signing_public();
            let mut mismatches = Vec::new();

            if signing.to_hex() != v.expected_signing_public {
                mismatches.push(format!("signing key {}", signing.to_hex()));
            }
            if let Some(expected) = v.expected_empty_signature {
                let actual = hex::encode(identity.sign(b"").0);
                if actual != expected {
                    mismatches.push(format!("signature {actual}"));
                }
            }
            if identity.encryption_public() != montgomery_of(&signing.0) {
                mismatches.push("encryption key is not the Montgomery form".to_string());
            }
            if identity.fingerprint(KeyPurpose::Signing) != Fingerprint::of(&signing.0) {
                mismatches.push("signing fingerprint".to_string());
            }

            (v.name.to_string(), mismatches.is_empty(), mismatches.join("; "))
        })
        .collect()
}
