//! Clearance credentials.
//!
//! Credentials arrive as JSON. Key fingerprints come in two historical
//! shapes, a single `publicKeyFingerprint` or a
//! `signingKeyFingerprint`/`encryptionKeyFingerprint` pair. They are decoded
//! once, here, into [`CredentialKeys`]; nothing downstream looks at the raw
//! field names.

use serde::{Deserialize, Serialize};

use clearance_core::{
    CanonicalMap, ClassificationLevel, Did, DualKeyIdentity, Ed25519PublicKey, Ed25519Signature,
    Fingerprint, KeyPurpose, Organization, PublicIdentity,
};

use crate::error::TrustError;

/// Schema identifier of clearance credentials.
pub const CLEARANCE_CREDENTIAL_SCHEMA: &str = "clearance-credential/v1";

/// Key fingerprints declared by a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKeys {
    /// One fingerprint, of the holder's signing key.
    LegacySingleKey { fingerprint: Fingerprint },
    /// Separate signing and encryption fingerprints.
    DualKey {
        signing: Fingerprint,
        encryption: Fingerprint,
    },
}

impl CredentialKeys {
    /// Dual-key fingerprints of a public identity.
    pub fn for_identity(identity: &PublicIdentity) -> Self {
        Self::DualKey {
            signing: identity.signing_fingerprint,
            encryption: identity.encryption_fingerprint,
        }
    }

    /// Fingerprint declared for `purpose`, if this shape declares one.
    pub fn declared(&self, purpose: KeyPurpose) -> Option<Fingerprint> {
        match (self, purpose) {
            (Self::LegacySingleKey { fingerprint }, KeyPurpose::Signing) => Some(*fingerprint),
            (Self::LegacySingleKey { .. }, KeyPurpose::Encryption) => None,
            (Self::DualKey { signing, .. }, KeyPurpose::Signing) => Some(*signing),
            (Self::DualKey { encryption, .. }, KeyPurpose::Encryption) => Some(*encryption),
        }
    }
}

/// A clearance credential issued by a trust authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CredentialDocument", into = "CredentialDocument")]
pub struct ClearanceCredential {
    pub schema: String,
    pub issuer: Did,
    pub holder: Did,
    pub clearance_level: Option<ClassificationLevel>,
    pub organization: Option<Organization>,
    pub keys: CredentialKeys,
    pub issued_at: i64,
    pub expires_at: Option<i64>,
    pub proof: Option<Ed25519Signature>,
}

impl ClearanceCredential {
    /// Build an unsigned credential with the current schema.
    pub fn new(
        issuer: Did,
        holder: Did,
        clearance_level: ClassificationLevel,
        organization: Organization,
        keys: CredentialKeys,
        issued_at: i64,
        expires_at: Option<i64>,
    ) -> Self {
        Self {
            schema: CLEARANCE_CREDENTIAL_SCHEMA.to_string(),
            issuer,
            holder,
            clearance_level: Some(clearance_level),
            organization: Some(organization),
            keys,
            issued_at,
            expires_at,
            proof: None,
        }
    }

    /// Sign the credential body with the issuer's key.
    pub fn sign(mut self, issuer_key: &DualKeyIdentity) -> Self {
        self.proof = Some(issuer_key.sign(&self.signing_bytes()));
        self
    }

    /// Verify the issuer proof against a pinned issuer key.
    pub fn verify_proof(&self, issuer_key: &Ed25519PublicKey) -> Result<(), TrustError> {
        let proof = self
            .proof
            .as_ref()
            .ok_or_else(|| TrustError::InvalidProof("credential carries no proof".into()))?;
        issuer_key
            .verify(&self.signing_bytes(), proof)
            .map_err(|e| TrustError::InvalidProof(e.to_string()))
    }

    /// Canonical CBOR of everything but the proof.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let (legacy, signing, encryption) = match &self.keys {
            CredentialKeys::LegacySingleKey { fingerprint } => (Some(*fingerprint), None, None),
            CredentialKeys::DualKey {
                signing,
                encryption,
            } => (None, Some(*signing), Some(*encryption)),
        };

        CanonicalMap::new()
            .text(0, &self.schema)
            .text(1, self.issuer.as_str())
            .text(2, self.holder.as_str())
            .opt_int(3, self.clearance_level.map(|l| i64::from(l.ordinal())))
            .opt_text(4, self.organization.as_ref().map(Organization::as_str))
            .opt_bytes(5, legacy.as_ref().map(|f| f.as_bytes().as_slice()))
            .opt_bytes(6, signing.as_ref().map(|f| f.as_bytes().as_slice()))
            .opt_bytes(7, encryption.as_ref().map(|f| f.as_bytes().as_slice()))
            .int(8, self.issued_at)
            .opt_int(9, self.expires_at)
            .finish()
    }

    /// Decode from JSON.
    pub fn from_json(json: &str) -> Result<Self, TrustError> {
        serde_json::from_str(json).map_err(|e| TrustError::Malformed(e.to_string()))
    }

    /// Encode to JSON.
    pub fn to_json(&self) -> Result<String, TrustError> {
        serde_json::to_string(self).map_err(|e| TrustError::Malformed(e.to_string()))
    }
}

/// JSON shape of a credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialDocument {
    schema: String,
    issuer: Did,
    holder: Did,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    clearance_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    organization: Option<Organization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    public_key_fingerprint: Option<Fingerprint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signing_key_fingerprint: Option<Fingerprint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encryption_key_fingerprint: Option<Fingerprint>,
    issued_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    proof: Option<String>,
}

impl TryFrom<CredentialDocument> for ClearanceCredential {
    type Error = TrustError;

    fn try_from(doc: CredentialDocument) -> Result<Self, Self::Error> {
        let keys = match (
            doc.public_key_fingerprint,
            doc.signing_key_fingerprint,
            doc.encryption_key_fingerprint,
        ) {
            (_, Some(signing), Some(encryption)) => CredentialKeys::DualKey {
                signing,
                encryption,
            },
            (Some(fingerprint), None, None) => CredentialKeys::LegacySingleKey { fingerprint },
            (None, None, None) => return Err(TrustError::MissingClaim("publicKeyFingerprint")),
            _ => {
                return Err(TrustError::Malformed(
                    "dual-key credential must declare both fingerprints".into(),
                ))
            }
        };

        let clearance_level = doc
            .clearance_level
            .map(ClassificationLevel::from_ordinal)
            .transpose()
            .map_err(|e| TrustError::Malformed(e.to_string()))?;

        let proof = doc
            .proof
            .map(|hex_sig| {
                let bytes = hex::decode(&hex_sig).map_err(|e| TrustError::Malformed(e.to_string()))?;
                Ed25519Signature::from_slice(&bytes).map_err(|e| TrustError::Malformed(e.to_string()))
            })
            .transpose()?;

        Ok(Self {
            schema: doc.schema,
            issuer: doc.issuer,
            holder: doc.holder,
            clearance_level,
            organization: doc.organization,
            keys,
            issued_at: doc.issued_at,
            expires_at: doc.expires_at,
            proof,
        })
    }
}

impl From<ClearanceCredential> for CredentialDocument {
    fn from(c: ClearanceCredential) -> Self {
        let (public_key_fingerprint, signing_key_fingerprint, encryption_key_fingerprint) =
            match c.keys {
                CredentialKeys::LegacySingleKey { fingerprint } => (Some(fingerprint), None, None),
                CredentialKeys::DualKey {
                    signing,
                    encryption,
                } => (None, Some(signing), Some(encryption)),
            };
        Self {
            schema: c.schema,
            issuer: c.issuer,
            holder: c.holder,
            clearance_level: c.clearance_level.map(ClassificationLevel::ordinal),
            organization: c.organization,
            public_key_fingerprint,
            signing_key_fingerprint,
            encryption_key_fingerprint,
            issued_at: c.issued_at,
            expires_at: c.expires_at,
            proof: c.proof.map(|s| s.to_hex()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn did(s: &str) -> Did {
        Did::parse(s).unwrap()
    }

    fn issued() -> (DualKeyIdentity, ClearanceCredential) {
        let authority = DualKeyIdentity::random();
        let holder = DualKeyIdentity::random();
        let credential = ClearanceCredential::new(
            did("did:web:authority"),
            did("did:key:holder"),
            ClassificationLevel::Secret,
            Organization::from("OrgA"),
            CredentialKeys::for_identity(&holder.export_public()),
            1_700_000_000_000,
            Some(1_800_000_000_000),
        )
        .sign(&authority);
        (authority, credential)
    }

    #[test]
    fn test_issue_and_verify_proof() {
        let (authority, credential) = issued();
        credential.verify_proof(&authority.signing_public()).unwrap();

        let mut tampered = credential.clone();
        tampered.clearance_level = Some(ClassificationLevel::TopSecret);
        assert!(tampered.verify_proof(&authority.signing_public()).is_err());

        let stranger = DualKeyIdentity::random();
        assert!(credential.verify_proof(&stranger.signing_public()).is_err());
    }

    #[test]
    fn test_json_roundtrip_keeps_proof() {
        let (authority, credential) = issued();
        let json = credential.to_json().unwrap();
        assert!(json.contains("signingKeyFingerprint"));
        let decoded = ClearanceCredential::from_json(&json).unwrap();
        assert_eq!(decoded, credential);
        decoded.verify_proof(&authority.signing_public()).unwrap();
    }

    #[test]
    fn test_legacy_shape_decoded_once() {
        let fp = Fingerprint::of(b"legacy key");
        let json = format!(
            r#"{{"schema":"{CLEARANCE_CREDENTIAL_SCHEMA}","issuer":"did:web:a","holder":"did:key:h",
                "clearanceLevel":2,"organization":"OrgA","publicKeyFingerprint":"{fp}","issuedAt":1}}"#
        );
        let credential = ClearanceCredential::from_json(&json).unwrap();
        assert_eq!(credential.keys, CredentialKeys::LegacySingleKey { fingerprint: fp });
        assert_eq!(credential.keys.declared(KeyPurpose::Signing), Some(fp));
        assert_eq!(credential.keys.declared(KeyPurpose::Encryption), None);
    }

    #[test]
    fn test_half_dual_key_rejected() {
        let fp = Fingerprint::of(b"k");
        let json = format!(
            r#"{{"schema":"s","issuer":"did:web:a","holder":"did:key:h",
                "signingKeyFingerprint":"{fp}","issuedAt":1}}"#
        );
        assert!(matches!(
            ClearanceCredential::from_json(&json),
            Err(TrustError::Malformed(_))
        ));

        let json = r#"{"schema":"s","issuer":"did:web:a","holder":"did:key:h","issuedAt":1}"#;
        assert!(ClearanceCredential::from_json(json).is_err());
    }

    #[test]
    fn test_missing_level_is_allowed_at_decode() {
        let fp = Fingerprint::of(b"k");
        let json = format!(
            r#"{{"schema":"s","issuer":"did:web:a","holder":"did:key:h",
                "publicKeyFingerprint":"{fp}","issuedAt":1}}"#
        );
        let credential = ClearanceCredential::from_json(&json).unwrap();
        assert_eq!(credential.clearance_level, None);
    }
}
