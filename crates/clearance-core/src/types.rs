//! Strong type definitions for the Clearance Kernel.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::crypto::X25519PublicKey;
use crate::error::CoreError;

/// A decentralized identifier (`did:<method>:<id>`).
///
/// Resolution is out of scope; the kernel treats the value as opaque once
/// it has the `did:` prefix and a method segment.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    /// Parse a DID string.
    pub fn parse(s: impl Into<String>) -> Result<Self, CoreError> {
        let s = s.into();
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("did"), Some(method), Some(id)) if !method.is_empty() && !id.is_empty() => {
                Ok(Self(s))
            }
            _ => Err(CoreError::InvalidIdentifier(format!("not a DID: {s}"))),
        }
    }

    /// Get the string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The DID method segment (e.g. `key` for `did:key:...`).
    pub fn method(&self) -> &str {
        self.0.split(':').nth(1).unwrap_or_default()
    }
}

impl TryFrom<String> for Did {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.0
    }
}

impl FromStr for Did {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Did({})", self.0)
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a registered document.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Create a document identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An organization named in credentials and releasability lists.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Organization(String);

impl Organization {
    /// The explicit universal-releasability marker.
    pub const ALL: &'static str = "ALL";

    /// Create an organization name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The explicit "releasable to everyone" entry.
    pub fn all() -> Self {
        Self(Self::ALL.to_string())
    }

    /// Whether this is the universal marker.
    pub fn is_all(&self) -> bool {
        self.0 == Self::ALL
    }

    /// Get the string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Organization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Organization({})", self.0)
    }
}

impl fmt::Display for Organization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Organization {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Organization {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The fixed four-level clearance order.
///
/// Higher ordinals strictly dominate lower ones; there are no
/// incomparable levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum ClassificationLevel {
    Unclassified = 1,
    Confidential = 2,
    Secret = 3,
    TopSecret = 4,
}

impl ClassificationLevel {
    /// All levels in ascending order.
    pub const ALL: [ClassificationLevel; 4] = [
        ClassificationLevel::Unclassified,
        ClassificationLevel::Confidential,
        ClassificationLevel::Secret,
        ClassificationLevel::TopSecret,
    ];

    /// Parse from the ordinal (1..=4).
    pub fn from_ordinal(n: u8) -> Result<Self, CoreError> {
        match n {
            1 => Ok(Self::Unclassified),
            2 => Ok(Self::Confidential),
            3 => Ok(Self::Secret),
            4 => Ok(Self::TopSecret),
            other => Err(CoreError::InvalidLevel(other)),
        }
    }

    /// The ordinal value.
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Canonical upper-case name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unclassified => "UNCLASSIFIED",
            Self::Confidential => "CONFIDENTIAL",
            Self::Secret => "SECRET",
            Self::TopSecret => "TOP_SECRET",
        }
    }
}

impl TryFrom<u8> for ClassificationLevel {
    type Error = CoreError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Self::from_ordinal(n)
    }
}

impl From<ClassificationLevel> for u8 {
    fn from(level: ClassificationLevel) -> Self {
        level.ordinal()
    }
}

impl fmt::Display for ClassificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.ordinal())
    }
}

/// A 32-byte identifier of an ephemeral keypair.
///
/// Derived from the keypair's own public key, so it never reveals anything
/// about long-term identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EphemeralId(pub [u8; 32]);

impl EphemeralId {
    /// DID method used for the string form.
    pub const DID_PREFIX: &'static str = "did:ephemeral:";

    /// Derive the identifier from an ephemeral public key.
    pub fn derive(public: &X25519PublicKey) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key("clearance-ephemeral-id-v1");
        hasher.update(public.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The `did:ephemeral:<hex>` form used on the wire and as cache key.
    pub fn to_did(&self) -> String {
        format!("{}{}", Self::DID_PREFIX, self.to_hex())
    }

    /// Parse the `did:ephemeral:<hex>` form.
    pub fn from_did(s: &str) -> Result<Self, CoreError> {
        let hex_part = s
            .strip_prefix(Self::DID_PREFIX)
            .ok_or_else(|| CoreError::InvalidIdentifier(format!("not an ephemeral DID: {s}")))?;
        let bytes = hex::decode(hex_part)
            .map_err(|e| CoreError::InvalidIdentifier(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CoreError::InvalidIdentifier("ephemeral id must be 32 bytes".into()))?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for EphemeralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EphemeralId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for EphemeralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}
