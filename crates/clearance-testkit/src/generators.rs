//! Proptest generators for property-based testing.

use proptest::prelude::*;

use clearance_core::{
    ClassificationLevel, DocumentId, DocumentRecord, DualKeyIdentity, Organization, Requester,
};
use clearance_store::MaxViews;

/// Organizations the generators draw from.
pub const ORGANIZATIONS: [&str; 4] = ["OrgA", "OrgB", "OrgC", "OrgD"];

/// Generate a random identity.
pub fn identity() -> impl Strategy<Value = DualKeyIdentity> {
    any::<[u8; 32]>().prop_map(DualKeyIdentity::generate)
}

/// Generate a 32-byte seed.
pub fn seed() -> impl Strategy<Value = [u8; 32]> {
    any::<[u8; 32]>()
}

/// Generate a ClassificationLevel.
pub fn level() -> impl Strategy<Value = ClassificationLevel> {
    prop::sample::select(ClassificationLevel::ALL.to_vec())
}

/// Generate a named organization (never the universal marker).
pub fn organization() -> impl Strategy<Value = Organization> {
    prop::sample::select(ORGANIZATIONS.to_vec()).prop_map(Organization::from)
}

/// Generate a releasability list, occasionally containing `ALL`.
pub fn releasable_to() -> impl Strategy<Value = Vec<Organization>> {
    prop_oneof![
        4 => prop::collection::vec(organization(), 0..=3),
        1 => Just(vec![Organization::all()]),
    ]
}

/// Generate a requester, sometimes without clearance.
pub fn requester() -> impl Strategy<Value = Requester> {
    (prop::option::weighted(0.9, level()), organization()).prop_map(|(level, org)| match level {
        Some(level) => Requester::new(level, org),
        None => Requester::uncleared(org),
    })
}

/// Generate a document ID.
pub fn document_id() -> impl Strategy<Value = DocumentId> {
    "[A-Z][A-Z0-9-]{0,15}".prop_map(DocumentId::new)
}

/// Generate a tag.
pub fn tag() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}".prop_map(String::from)
}

/// Generate a document record with up to three tags.
pub fn document_record() -> impl Strategy<Value = DocumentRecord> {
    (
        document_id(),
        level(),
        releasable_to(),
        prop::collection::vec(tag(), 0..=3),
    )
        .prop_map(|(id, classification, orgs, tags)| {
            DocumentRecord::new(id, classification, orgs).with_tags(tags)
        })
}

/// Generate a view limit.
pub fn max_views() -> impl Strategy<Value = MaxViews> {
    prop_oneof![Just(MaxViews::Unlimited), (0u32..=16).prop_map(MaxViews::Limited)]
}

/// Generate payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a reasonable timestamp.
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=4_102_444_800_000i64 // 2100-01-01
}

#[cfg(test)]
mod tests {
    use super::*;
    use clearance_core::{IndexConfig, KeyPurpose, PrivacyIndex};

    proptest! {
        #[test]
        fn visibility_is_monotone_in_clearance(
            record in document_record(),
            org in organization(),
            low in level(),
            high in level(),
        ) {
            prop_assume!(low <= high);
            let lower = Requester::new(low, org.clone());
            let higher = Requester::new(high, org);
            if record.is_visible_to(&lower) {
                prop_assert!(record.is_visible_to(&higher));
            }
        }

        #[test]
        fn uncleared_sees_nothing(record in document_record(), org in organization()) {
            prop_assert!(!record.is_visible_to(&Requester::uncleared(org)));
        }

        #[test]
        fn identity_is_deterministic(seed in seed()) {
            let a = DualKeyIdentity::generate(seed);
            let b = DualKeyIdentity::generate(seed);
            prop_assert_eq!(a.signing_public(), b.signing_public());
            prop_assert_eq!(a.encryption_public(), b.encryption_public());
            prop_assert_eq!(
                a.fingerprint(KeyPurpose::Encryption),
                b.fingerprint(KeyPurpose::Encryption)
            );
        }

        #[test]
        fn index_has_no_false_negatives(records in prop::collection::vec(document_record(), 0..32)) {
            let index = PrivacyIndex::new(IndexConfig::default()).unwrap();
            for record in &records {
                index.insert(record.id.as_str());
            }
            for record in &records {
                prop_assert!(index.query(record.id.as_str()));
            }
        }
    }
}
