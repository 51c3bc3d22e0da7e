//! # Clearance Kernel
//!
//! The unified API for clearance-gated disclosure of classified documents.
//!
//! ## Overview
//!
//! - **Visibility**: a document is visible iff the holder's clearance
//!   dominates its classification and the holder's organization is on its
//!   releasability list
//! - **Binding**: long-term keys are usable only if their fingerprints
//!   match the credential
//! - **Forward secrecy**: each retrieval uses a single-use key that is
//!   destroyed after one decryption
//! - **Eviction**: cached copies expire by time and by view count
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use clearance_kernel::{SessionContext, Wallet, WalletConfig};
//! use clearance_kernel::core::{Did, DocumentId, DualKeyIdentity};
//! use clearance_kernel::protocol::HttpAuthority;
//! use clearance_kernel::store::SqliteStore;
//! use clearance_kernel::trust::{ClearanceCredential, TrustAnchor};
//!
//! async fn example(credential_json: &str) -> clearance_kernel::Result<()> {
//!     let anchor = TrustAnchor::new(Did::parse("did:web:authority")?);
//!     let config = WalletConfig::new(anchor);
//!     let store = Arc::new(SqliteStore::open("wallet.db")?);
//!     let authority = Arc::new(HttpAuthority::new(
//!         "https://authority.example/access",
//!         config.access.request_timeout,
//!     )?);
//!     let wallet = Wallet::new(store, authority, config)?;
//!
//!     let identity = wallet.load_identity("main").await?.unwrap_or_else(DualKeyIdentity::random);
//!     let credential = ClearanceCredential::from_json(credential_json)?;
//!     let session = SessionContext::new(identity, credential);
//!
//!     let disclosure = wallet.request_access(&session, &DocumentId::new("D1")).await?;
//!     println!("{} bytes, copy {}", disclosure.plaintext.len(), disclosure.copy_id);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `clearance_kernel::core` - Identifiers, keys, policy and index
//! - `clearance_kernel::trust` - Credentials, codec and ephemeral keys
//! - `clearance_kernel::store` - Storage abstraction, SQLite and cache
//! - `clearance_kernel::protocol` - Access protocol and authorities

pub mod config;
pub mod error;
pub mod session;
pub mod wallet;

// Re-export component crates
pub use clearance_core as core;
pub use clearance_protocol as protocol;
pub use clearance_store as store;
pub use clearance_trust as trust;

// Re-export main types for convenience
pub use config::WalletConfig;
pub use error::{KernelError, Result};
pub use session::SessionContext;
pub use wallet::{DocumentView, Wallet};

pub use clearance_core::{ClassificationLevel, DocumentId, DocumentRecord, EphemeralId, Requester};
pub use clearance_protocol::Disclosure;
pub use clearance_store::{DocumentSummary, ViewOutcome};
