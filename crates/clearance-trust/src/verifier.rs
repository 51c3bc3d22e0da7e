//! Credential trust and key binding.
//!
//! Trust: schema, issuer, clearance claim, expiry and (when an issuer key is
//! pinned) the issuer proof. Binding: every fingerprint the credential
//! declares must equal the fingerprint of the local key with that purpose.

use serde::{Deserialize, Serialize};

use clearance_core::{
    ClassificationLevel, Did, DualKeyIdentity, Ed25519PublicKey, Fingerprint, KeyPurpose,
    Organization, PublicIdentity, Requester,
};

use crate::credential::{ClearanceCredential, CredentialKeys, CLEARANCE_CREDENTIAL_SCHEMA};
use crate::error::{BindingError, TrustError};

/// The pinned trust authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustAnchor {
    /// Issuer DID every credential must carry.
    pub issuer: Did,
    /// Expected credential schema.
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Issuer signing key. When set, credential proofs are verified.
    #[serde(default)]
    pub issuer_key: Option<Ed25519PublicKey>,
}

fn default_schema() -> String {
    CLEARANCE_CREDENTIAL_SCHEMA.to_string()
}

impl TrustAnchor {
    /// Anchor on an issuer DID with the default schema.
    pub fn new(issuer: Did) -> Self {
        Self {
            issuer,
            schema: default_schema(),
            issuer_key: None,
        }
    }

    /// Also verify issuer proofs with this key.
    pub fn with_issuer_key(mut self, key: Ed25519PublicKey) -> Self {
        self.issuer_key = Some(key);
        self
    }
}

/// Claims of a credential that passed the trust checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedClearance {
    pub holder: Did,
    pub level: ClassificationLevel,
    pub organization: Organization,
    pub keys: CredentialKeys,
}

impl VerifiedClearance {
    /// The policy subject this clearance describes.
    pub fn requester(&self) -> Requester {
        Requester {
            clearance: Some(self.level),
            organization: self.organization.clone(),
        }
    }
}

/// Validates credentials against a [`TrustAnchor`].
#[derive(Debug, Clone)]
pub struct TrustVerifier {
    anchor: TrustAnchor,
}

impl TrustVerifier {
    pub fn new(anchor: TrustAnchor) -> Self {
        Self { anchor }
    }

    pub fn anchor(&self) -> &TrustAnchor {
        &self.anchor
    }

    /// Issuer and schema trust at time `now` (ms).
    pub fn verify_trust(
        &self,
        credential: &ClearanceCredential,
        now: i64,
    ) -> Result<VerifiedClearance, TrustError> {
        let result = self.check_trust(credential, now);
        if let Err(e) = &result {
            tracing::warn!(holder = %credential.holder, error = %e, "credential rejected");
        }
        result
    }

    fn check_trust(
        &self,
        credential: &ClearanceCredential,
        now: i64,
    ) -> Result<VerifiedClearance, TrustError> {
        if credential.schema != self.anchor.schema {
            return Err(TrustError::SchemaMismatch {
                expected: self.anchor.schema.clone(),
                actual: credential.schema.clone(),
            });
        }
        if credential.issuer != self.anchor.issuer {
            return Err(TrustError::UntrustedIssuer {
                expected: self.anchor.issuer.clone(),
                actual: credential.issuer.clone(),
            });
        }
        let level = credential
            .clearance_level
            .ok_or(TrustError::MissingClaim("clearanceLevel"))?;
        let organization = credential
            .organization
            .clone()
            .ok_or(TrustError::MissingClaim("organization"))?;
        if let Some(expires_at) = credential.expires_at {
            if now >= expires_at {
                return Err(TrustError::Expired { expires_at, now });
            }
        }
        if let Some(key) = &self.anchor.issuer_key {
            credential.verify_proof(key)?;
        }

        Ok(VerifiedClearance {
            holder: credential.holder.clone(),
            level,
            organization,
            keys: credential.keys,
        })
    }

    /// Bind the credential to a local identity.
    ///
    /// `identity` is the only local key material consulted. Callers pass
    /// the identity of the active session, so keys persisted in a store
    /// are bound only once they are loaded into a session.
    pub fn verify_binding(
        &self,
        credential: &ClearanceCredential,
        identity: &DualKeyIdentity,
    ) -> Result<(), BindingError> {
        self.verify_binding_public(credential, &identity.export_public())
    }

    /// Bind the credential to public key material.
    ///
    /// A legacy credential only names the signing key. The encryption key
    /// comes from the same seed and is accepted once the signing key binds.
    pub fn verify_binding_public(
        &self,
        credential: &ClearanceCredential,
        identity: &PublicIdentity,
    ) -> Result<(), BindingError> {
        let checks: [(KeyPurpose, Option<Fingerprint>); 2] = match credential.keys {
            CredentialKeys::LegacySingleKey { fingerprint } => [
                (KeyPurpose::Signing, Some(fingerprint)),
                (KeyPurpose::Encryption, None),
            ],
            CredentialKeys::DualKey {
                signing,
                encryption,
            } => [
                (KeyPurpose::Signing, Some(signing)),
                (KeyPurpose::Encryption, Some(encryption)),
            ],
        };

        for (purpose, declared) in checks {
            let Some(declared) = declared else { continue };
            let local = match purpose {
                KeyPurpose::Signing => identity.signing_fingerprint,
                KeyPurpose::Encryption => identity.encryption_fingerprint,
            };
            if declared != local {
                tracing::warn!(holder = %credential.holder, ?purpose, "key binding rejected");
                return Err(BindingError::FingerprintMismatch {
                    purpose,
                    declared,
                    local,
                });
            }
        }
        Ok(())
    }
}
