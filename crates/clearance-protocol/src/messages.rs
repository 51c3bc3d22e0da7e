//! Access protocol wire messages.
//!
//! Messages travel as JSON with camelCase keys. Binary fields are
//! base64url without padding.

use serde::{Deserialize, Serialize};

use clearance_core::{
    CanonicalMap, ClassificationLevel, CoreError, Did, DocumentId, Ed25519Signature, EphemeralId,
    X25519PublicKey,
};
use clearance_store::MaxViews;
use clearance_trust::{BoxNonce, NONCE_LEN};

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Length of the request nonce.
pub const REQUEST_NONCE_LEN: usize = 16;

/// Message size limits.
pub mod limits {
    /// Max length of a document identifier.
    pub const MAX_DOCUMENT_ID_LEN: usize = 256;
    /// Max length of a DID.
    pub const MAX_DID_LEN: usize = 512;
    /// Max length of an authority-assigned copy id.
    pub const MAX_COPY_ID_LEN: usize = 128;
    /// Max ciphertext size of a single disclosure.
    pub const MAX_CIPHERTEXT_LEN: usize = 16 * 1024 * 1024;
    /// Poly1305 tag length; no valid ciphertext is shorter.
    pub const MIN_CIPHERTEXT_LEN: usize = 16;
}

/// A signed request for one disclosure of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequest {
    pub document_id: DocumentId,
    #[serde(rename = "requestorDID")]
    pub requestor_did: Did,
    #[serde(rename = "issuerDID")]
    pub issuer_did: Did,
    pub clearance_level: ClassificationLevel,
    /// `did:ephemeral:<hex>` of the single-use key.
    #[serde(rename = "ephemeralDID")]
    pub ephemeral_did: String,
    #[serde(with = "base64url")]
    pub ephemeral_public_key: [u8; 32],
    #[serde(with = "base64url")]
    pub signature: [u8; 64],
    /// Unix ms at signing time.
    pub timestamp: i64,
    #[serde(with = "base64url")]
    pub nonce: [u8; REQUEST_NONCE_LEN],
}

impl AccessRequest {
    /// Canonical bytes covered by the requestor's signature.
    pub fn signing_bytes(
        document_id: &DocumentId,
        ephemeral_did: &str,
        requestor_did: &Did,
        timestamp: i64,
        nonce: &[u8; REQUEST_NONCE_LEN],
    ) -> Vec<u8> {
        CanonicalMap::new()
            .text(0, document_id.as_str())
            .text(1, ephemeral_did)
            .text(2, requestor_did.as_str())
            .int(3, timestamp)
            .bytes(4, nonce)
            .finish()
    }

    /// Signing bytes of this request.
    pub fn payload(&self) -> Vec<u8> {
        Self::signing_bytes(
            &self.document_id,
            &self.ephemeral_did,
            &self.requestor_did,
            self.timestamp,
            &self.nonce,
        )
    }

    pub fn ephemeral_key(&self) -> X25519PublicKey {
        X25519PublicKey::from_bytes(self.ephemeral_public_key)
    }

    pub fn ephemeral_id(&self) -> Result<EphemeralId, CoreError> {
        EphemeralId::from_did(&self.ephemeral_did)
    }

    pub fn signature(&self) -> Ed25519Signature {
        Ed25519Signature::from_bytes(self.signature)
    }

    /// Check size limits and that the ephemeral DID names the attached key.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.document_id.as_str().is_empty()
            || self.document_id.as_str().len() > limits::MAX_DOCUMENT_ID_LEN
        {
            return Err("document id length out of range");
        }
        if self.requestor_did.as_str().len() > limits::MAX_DID_LEN
            || self.issuer_did.as_str().len() > limits::MAX_DID_LEN
        {
            return Err("DID too long");
        }
        let id = self.ephemeral_id().map_err(|_| "malformed ephemeral DID")?;
        if id != EphemeralId::derive(&self.ephemeral_key()) {
            return Err("ephemeral DID does not match ephemeral public key");
        }
        Ok(())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// The authority's answer: the document encrypted to the ephemeral key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessResponse {
    #[serde(with = "base64url")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "base64url")]
    pub nonce: [u8; NONCE_LEN],
    #[serde(with = "base64url")]
    pub server_public_key: [u8; 32],
    pub copy_id: String,
    /// Unix ms after which the cached copy must not be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_views: Option<MaxViews>,
}

impl AccessResponse {
    pub fn box_nonce(&self) -> BoxNonce {
        BoxNonce::from_bytes(self.nonce)
    }

    pub fn server_key(&self) -> X25519PublicKey {
        X25519PublicKey::from_bytes(self.server_public_key)
    }

    /// Check size limits.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.ciphertext.len() < limits::MIN_CIPHERTEXT_LEN {
            return Err("ciphertext shorter than authentication tag");
        }
        if self.ciphertext.len() > limits::MAX_CIPHERTEXT_LEN {
            return Err("ciphertext too large");
        }
        if self.copy_id.is_empty() || self.copy_id.len() > limits::MAX_COPY_ID_LEN {
            return Err("copy id length out of range");
        }
        Ok(())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Why an authority refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionCode {
    /// Malformed or oversized request.
    InvalidRequest,
    /// The requestor is not known to the authority.
    UnknownRequestor,
    /// Signature does not verify against the requestor's key.
    InvalidSignature,
    /// Credential failed issuer, schema, claim or expiry checks.
    UntrustedCredential,
    /// Requestor keys are not bound to the credential.
    KeyBindingFailed,
    /// Request timestamp outside the accepted skew.
    ClockSkew,
    /// Nonce already used.
    ReplayDetected,
    /// Document not registered.
    UnknownDocument,
    /// Classification policy denied access.
    Denied,
    /// Internal error on the authority.
    Internal,
}

impl RejectionCode {
    /// HTTP status an authority answers with.
    pub const fn http_status(self) -> u16 {
        match self {
            Self::InvalidRequest | Self::ClockSkew => 400,
            Self::UnknownRequestor
            | Self::InvalidSignature
            | Self::UntrustedCredential
            | Self::KeyBindingFailed => 401,
            Self::Denied => 403,
            Self::UnknownDocument => 404,
            Self::ReplayDetected => 409,
            Self::Internal => 500,
        }
    }

    /// Best guess from a bare HTTP status, when the body is not a rejection.
    pub const fn from_http_status(status: u16) -> Self {
        match status {
            400 | 413 | 422 => Self::InvalidRequest,
            401 => Self::UntrustedCredential,
            403 => Self::Denied,
            404 => Self::UnknownDocument,
            409 => Self::ReplayDetected,
            _ => Self::Internal,
        }
    }
}

/// Error body returned instead of an [`AccessResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRejection {
    pub code: RejectionCode,
    pub message: String,
}

impl AccessRejection {
    pub fn new(code: RejectionCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Serde adapter for base64url (no padding) binary fields.
mod base64url {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<T: AsRef<[u8]>, S: Serializer>(value: &T, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&URL_SAFE_NO_PAD.encode(value.as_ref()))
    }

    pub fn deserialize<'de, T, D>(d: D) -> Result<T, D::Error>
    where
        T: TryFrom<Vec<u8>>,
        D: Deserializer<'de>,
    {
        let s = String::deserialize(d)?;
        let bytes = URL_SAFE_NO_PAD.decode(s.as_bytes()).map_err(D::Error::custom)?;
        let len = bytes.len();
        T::try_from(bytes).map_err(|_| D::Error::custom(format!("unexpected length {len}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> AccessRequest {
        let public = X25519PublicKey::from_bytes([9; 32]);
        AccessRequest {
            document_id: DocumentId::new("D1"),
            requestor_did: Did::parse("did:key:u1").unwrap(),
            issuer_did: Did::parse("did:web:authority").unwrap(),
            clearance_level: ClassificationLevel::Confidential,
            ephemeral_did: EphemeralId::derive(&public).to_did(),
            ephemeral_public_key: *public.as_bytes(),
            signature: [0xab; 64],
            timestamp: 1_750_000_000_000,
            nonce: [0xfe; REQUEST_NONCE_LEN],
        }
    }

    #[test]
    fn test_request_wire_shape() {
        let json: serde_json::Value = serde_json::from_str(&request().to_json().unwrap()).unwrap();
        let obj = json.as_object().unwrap();
        for key in [
            "documentId",
            "requestorDID",
            "issuerDID",
            "clearanceLevel",
            "ephemeralDID",
            "ephemeralPublicKey",
            "signature",
            "timestamp",
            "nonce",
        ] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert_eq!(obj.len(), 9);
        assert_eq!(json["clearanceLevel"], 2);
        assert_eq!(json["nonce"], "_v7-_v7-_v7-_v7-_v7-_g");
        assert!(!json["signature"].as_str().unwrap().contains('='));
    }

    #[test]
    fn test_request_json_roundtrip() {
        let req = request();
        assert_eq!(AccessRequest::from_json(&req.to_json().unwrap()).unwrap(), req);
    }

    #[test]
    fn test_wrong_length_field_rejected() {
        let mut json: serde_json::Value =
            serde_json::from_str(&request().to_json().unwrap()).unwrap();
        json["ephemeralPublicKey"] = "AAAA".into();
        assert!(serde_json::from_value::<AccessRequest>(json).is_err());
    }

    #[test]
    fn test_request_validation() {
        assert!(request().validate().is_ok());

        let mut req = request();
        req.ephemeral_public_key = [8; 32];
        assert!(req.validate().is_err());

        let mut req = request();
        req.ephemeral_did = "did:key:nope".into();
        assert!(req.validate().is_err());

        let mut req = request();
        req.document_id = DocumentId::new("x".repeat(limits::MAX_DOCUMENT_ID_LEN + 1));
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_signing_bytes_cover_every_field() {
        let base = request();
        let mut other = base.clone();
        other.timestamp += 1;
        assert_ne!(base.payload(), other.payload());

        let mut other = base.clone();
        other.nonce[0] ^= 1;
        assert_ne!(base.payload(), other.payload());

        let mut other = base.clone();
        other.document_id = DocumentId::new("D2");
        assert_ne!(base.payload(), other.payload());

        // Signature and declared level are outside the signed payload.
        let mut other = base.clone();
        other.signature = [0; 64];
        assert_eq!(base.payload(), other.payload());
    }

    #[test]
    fn test_response_shape_and_validation() {
        let resp = AccessResponse {
            ciphertext: vec![1; 32],
            nonce: [2; NONCE_LEN],
            server_public_key: [3; 32],
            copy_id: "copy-1".into(),
            expires_at: None,
            max_views: Some(MaxViews::Unlimited),
        };
        let json: serde_json::Value = serde_json::from_str(&resp.to_json().unwrap()).unwrap();
        assert!(json.get("expiresAt").is_none());
        assert_eq!(json["maxViews"], -1);
        assert_eq!(json["copyId"], "copy-1");
        assert_eq!(AccessResponse::from_json(&resp.to_json().unwrap()).unwrap(), resp);
        assert!(resp.validate().is_ok());

        let mut short = resp.clone();
        short.ciphertext = vec![0; 4];
        assert!(short.validate().is_err());
    }

    #[test]
    fn test_rejection_codes() {
        let rejection = AccessRejection::new(RejectionCode::ReplayDetected, "nonce reused");
        let json = serde_json::to_string(&rejection).unwrap();
        assert!(json.contains("REPLAY_DETECTED"));

        for code in [
            RejectionCode::InvalidRequest,
            RejectionCode::Denied,
            RejectionCode::UnknownDocument,
            RejectionCode::ReplayDetected,
        ] {
            assert_eq!(RejectionCode::from_http_status(code.http_status()), code);
        }
        assert_eq!(RejectionCode::from_http_status(502), RejectionCode::Internal);
    }
}
