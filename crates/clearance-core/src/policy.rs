//! Classification policy.
//!
//! A requester may see a document iff both hold:
//! - the requester's clearance dominates the document's classification, and
//! - the requester's organization is in the document's releasable-to set.
//!
//! Releasability is closed-world. An empty set denies everyone; only an
//! explicit `ALL` entry opens a document to every organization.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::AuthorizationError;
use crate::types::{ClassificationLevel, Organization};

/// The subject of a visibility decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    /// Clearance held, `None` if the requester has no clearance credential.
    pub clearance: Option<ClassificationLevel>,
    pub organization: Organization,
}

impl Requester {
    /// A requester holding `clearance` within `organization`.
    pub fn new(clearance: ClassificationLevel, organization: impl Into<Organization>) -> Self {
        Self {
            clearance: Some(clearance),
            organization: organization.into(),
        }
    }

    /// A requester without any clearance.
    pub fn uncleared(organization: impl Into<Organization>) -> Self {
        Self {
            clearance: None,
            organization: organization.into(),
        }
    }

    /// Clearance as an ordinal, 0 when absent.
    pub fn clearance_ordinal(&self) -> u8 {
        self.clearance.map(ClassificationLevel::ordinal).unwrap_or(0)
    }
}

/// Pure clearance and releasability evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassificationPolicy;

impl ClassificationPolicy {
    /// Whether the requester may see a document.
    pub fn is_visible(
        requester: &Requester,
        classification: ClassificationLevel,
        releasable_to: &BTreeSet<Organization>,
    ) -> bool {
        Self::authorize(requester, classification, releasable_to).is_ok()
    }

    /// Like [`is_visible`](Self::is_visible) but reports why access is denied.
    pub fn authorize(
        requester: &Requester,
        classification: ClassificationLevel,
        releasable_to: &BTreeSet<Organization>,
    ) -> Result<(), AuthorizationError> {
        if requester.clearance_ordinal() < classification.ordinal() {
            return Err(AuthorizationError::InsufficientClearance {
                required: classification,
                held: match requester.clearance {
                    Some(level) => level.to_string(),
                    None => "NONE(0)".to_string(),
                },
            });
        }

        if !Self::is_releasable(&requester.organization, releasable_to) {
            return Err(AuthorizationError::NotReleasable {
                organization: requester.organization.clone(),
            });
        }

        Ok(())
    }

    /// Membership test with the explicit universal marker.
    pub fn is_releasable(organization: &Organization, releasable_to: &BTreeSet<Organization>) -> bool {
        releasable_to.contains(organization) || releasable_to.iter().any(Organization::is_all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn orgs(names: &[&str]) -> BTreeSet<Organization> {
        names.iter().map(|n| Organization::from(*n)).collect()
    }

    #[test]
    fn test_reference_scenario() {
        let d1 = ClassificationLevel::Confidential;
        let releasable = orgs(&["OrgA"]);

        let u1 = Requester::new(ClassificationLevel::Confidential, "OrgA");
        let u2 = Requester::new(ClassificationLevel::Secret, "OrgB");
        let u3 = Requester::new(ClassificationLevel::Unclassified, "OrgA");

        assert!(ClassificationPolicy::is_visible(&u1, d1, &releasable));
        assert!(!ClassificationPolicy::is_visible(&u2, d1, &releasable));
        assert!(!ClassificationPolicy::is_visible(&u3, d1, &releasable));

        assert_eq!(
            ClassificationPolicy::authorize(&u2, d1, &releasable),
            Err(AuthorizationError::NotReleasable {
                organization: Organization::from("OrgB")
            })
        );
        assert!(matches!(
            ClassificationPolicy::authorize(&u3, d1, &releasable),
            Err(AuthorizationError::InsufficientClearance { .. })
        ));
    }

    #[test]
    fn test_empty_releasability_denies_everyone() {
        let top = Requester::new(ClassificationLevel::TopSecret, "OrgA");
        assert!(!ClassificationPolicy::is_visible(
            &top,
            ClassificationLevel::Unclassified,
            &BTreeSet::new()
        ));
    }

    #[test]
    fn test_explicit_all_marker() {
        let releasable = orgs(&[Organization::ALL]);
        let anyone = Requester::new(ClassificationLevel::Secret, "Whoever");
        assert!(ClassificationPolicy::is_visible(
            &anyone,
            ClassificationLevel::Secret,
            &releasable
        ));
        assert!(!ClassificationPolicy::is_visible(
            &anyone,
            ClassificationLevel::TopSecret,
            &releasable
        ));
    }

    #[test]
    fn test_missing_clearance_is_zero() {
        let nobody = Requester::uncleared("OrgA");
        assert_eq!(nobody.clearance_ordinal(), 0);
        assert!(!ClassificationPolicy::is_visible(
            &nobody,
            ClassificationLevel::Unclassified,
            &orgs(&["OrgA"])
        ));
    }

    fn level() -> impl Strategy<Value = ClassificationLevel> {
        prop::sample::select(ClassificationLevel::ALL.to_vec())
    }

    fn org() -> impl Strategy<Value = Organization> {
        prop::sample::select(vec!["OrgA", "OrgB", "OrgC", "OrgD"]).prop_map(Organization::from)
    }

    proptest! {
        #[test]
        fn prop_visibility_is_conjunction(
            clearance in prop::option::of(level()),
            organization in org(),
            classification in level(),
            releasable in prop::collection::btree_set(org(), 0..4),
        ) {
            let requester = Requester { clearance, organization: organization.clone() };
            let expected = requester.clearance_ordinal() >= classification.ordinal()
                && releasable.contains(&organization);
            prop_assert_eq!(
                ClassificationPolicy::is_visible(&requester, classification, &releasable),
                expected
            );
        }
    }
}
