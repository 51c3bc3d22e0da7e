//! # Clearance Kernel Testkit
//!
//! Testing utilities for the Clearance Kernel.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known seeds with expected keys, for cross-platform verification
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: A ready trust authority with a published document and three holders
//!
//! ## Golden Vectors
//!
//! ```rust
//! use clearance_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, detail) in verify_all_vectors() {
//!     assert!(matches, "{name}: {detail}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use clearance_testkit::generators::{document_record, requester};
//!
//! proptest! {
//!     #[test]
//!     fn visibility_matches_authorize(record in document_record(), who in requester()) {
//!         prop_assert_eq!(record.is_visible_to(&who), record.authorize(&who).is_ok());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use clearance_testkit::fixtures::Scenario;
//!
//! let scenario = Scenario::new();
//! assert_eq!(scenario.u1.name, "U1");
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{d1_record, deterministic_identities, Scenario, TestUser, D1_CONTENT, ISSUER_DID};
pub use vectors::{all_vectors, identity_from_vector, verify_all_vectors, GoldenVector};
