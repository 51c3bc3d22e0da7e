//! # Clearance Kernel Protocol
//!
//! Single-use, forward-secure retrieval of one document from a document
//! authority.
//!
//! ## Overview
//!
//! A client creates an [`AccessAttempt`] with a fresh ephemeral key, signs
//! an [`AccessRequest`] with its long-term key and sends it through an
//! [`Authority`]. The authority re-applies the classification policy and
//! encrypts the document to the ephemeral key. The client decrypts once and
//! the ephemeral key is destroyed.
//!
//! ## Message Flow
//!
//! ```text
//! Wallet                                  Authority
//!   |-- AccessRequest (signed) ------------->|
//!   |                                        | verify signature, credential,
//!   |                                        | skew, nonce, policy
//!   |<------------- AccessResponse ----------|
//!   |   (sealed to the ephemeral key)        |
//!   | decrypt, destroy ephemeral key         |
//! ```
//!
//! A refused request comes back as an [`AccessRejection`] with a
//! [`RejectionCode`].

pub mod authority;
pub mod error;
pub mod messages;
pub mod protocol;
pub mod transport;

pub use authority::{AuthorityConfig, MemoryAuthority};
pub use error::{ProtocolError, Result};
pub use messages::{
    limits, AccessRejection, AccessRequest, AccessResponse, RejectionCode, PROTOCOL_VERSION,
    REQUEST_NONCE_LEN,
};
pub use protocol::{AccessAttempt, AccessConfig, AccessState, Disclosure};
pub use transport::{http::HttpAuthority, Authority};
