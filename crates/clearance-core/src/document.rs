//! Registered documents and discovery.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{AuthorizationError, CoreError};
use crate::index::{IndexConfig, PrivacyIndex};
use crate::policy::{ClassificationPolicy, Requester};
use crate::types::{ClassificationLevel, DocumentId, Organization};

/// An immutable document record.
///
/// Reclassifying a document means registering a new record under a new id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub classification: ClassificationLevel,
    pub releasable_to: BTreeSet<Organization>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl DocumentRecord {
    /// Create a record with no tags.
    pub fn new(
        id: impl Into<DocumentId>,
        classification: ClassificationLevel,
        releasable_to: impl IntoIterator<Item = Organization>,
    ) -> Self {
        Self {
            id: id.into(),
            classification,
            releasable_to: releasable_to.into_iter().collect(),
            tags: BTreeSet::new(),
        }
    }

    /// Add tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Whether `requester` may see this record.
    pub fn is_visible_to(&self, requester: &Requester) -> bool {
        ClassificationPolicy::is_visible(requester, self.classification, &self.releasable_to)
    }

    /// Policy decision with a denial reason.
    pub fn authorize(&self, requester: &Requester) -> Result<(), AuthorizationError> {
        ClassificationPolicy::authorize(requester, self.classification, &self.releasable_to)
    }
}

fn id_key(id: &DocumentId) -> String {
    format!("doc:{id}")
}

fn tag_key(tag: &str) -> String {
    format!("tag:{tag}")
}

/// Registry of document records with a Bloom index over ids and tags.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    index: PrivacyIndex,
    records: RwLock<BTreeMap<DocumentId, DocumentRecord>>,
}

impl DocumentRegistry {
    /// Create an empty registry with the given index sizing.
    pub fn new(config: IndexConfig) -> Result<Self, CoreError> {
        Ok(Self {
            index: PrivacyIndex::new(config)?,
            records: RwLock::new(BTreeMap::new()),
        })
    }

    /// Register a new record. Existing ids are never overwritten.
    pub fn register(&self, record: DocumentRecord) -> Result<(), CoreError> {
        let mut records = self.records.write();
        if records.contains_key(&record.id) {
            return Err(CoreError::DocumentExists(record.id));
        }

        self.index.insert(&id_key(&record.id));
        for tag in &record.tags {
            self.index.insert(&tag_key(tag));
        }
        tracing::debug!(document_id = %record.id, level = %record.classification, "document registered");
        records.insert(record.id.clone(), record);
        Ok(())
    }

    /// Look up a record.
    pub fn get(&self, id: &DocumentId) -> Option<DocumentRecord> {
        self.records.read().get(id).cloned()
    }

    /// Bloom-filter answer for a document id. May be a false positive.
    pub fn might_contain(&self, id: &DocumentId) -> bool {
        self.index.query(&id_key(id))
    }

    /// Bloom-filter answer for a tag. May be a false positive.
    pub fn might_have_tag(&self, tag: &str) -> bool {
        self.index.query(&tag_key(tag))
    }

    /// Whether `requester` may see document `id`. Unknown ids are invisible.
    pub fn check_visibility(&self, requester: &Requester, id: &DocumentId) -> bool {
        self.authorize(requester, id).is_ok()
    }

    /// Index check, then policy check. Returns the record on success.
    pub fn authorize(
        &self,
        requester: &Requester,
        id: &DocumentId,
    ) -> Result<DocumentRecord, AuthorizationError> {
        if !self.might_contain(id) {
            return Err(AuthorizationError::UnknownDocument(id.clone()));
        }
        let record = self
            .get(id)
            .ok_or_else(|| AuthorizationError::UnknownDocument(id.clone()))?;
        record.authorize(requester)?;
        Ok(record)
    }

    /// Records that are both index-positive and visible to `requester`,
    /// optionally restricted to a tag.
    pub fn discover(&self, requester: &Requester, tag: Option<&str>) -> Vec<DocumentRecord> {
        if let Some(tag) = tag {
            if !self.might_have_tag(tag) {
                return Vec::new();
            }
        }

        self.records
            .read()
            .values()
            .filter(|r| tag.map_or(true, |t| r.tags.contains(t)))
            .filter(|r| self.might_contain(&r.id))
            .filter(|r| r.is_visible_to(requester))
            .cloned()
            .collect()
    }

    /// Number of registered records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether no records are registered.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> DocumentRegistry {
        let registry = DocumentRegistry::default();
        registry
            .register(
                DocumentRecord::new(
                    "D1",
                    ClassificationLevel::Confidential,
                    [Organization::from("OrgA")],
                )
                .with_tags(["logistics"]),
            )
            .unwrap();
        registry
            .register(
                DocumentRecord::new("D2", ClassificationLevel::TopSecret, [Organization::all()])
                    .with_tags(["logistics", "signals"]),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = registry();
        let again = DocumentRecord::new("D1", ClassificationLevel::Secret, [Organization::all()]);
        assert!(matches!(
            registry.register(again),
            Err(CoreError::DocumentExists(_))
        ));
        assert_eq!(
            registry.get(&"D1".into()).unwrap().classification,
            ClassificationLevel::Confidential
        );
    }

    #[test]
    fn test_discover_filters_by_policy() {
        let registry = registry();
        let u1 = Requester::new(ClassificationLevel::Confidential, "OrgA");
        let found = registry.discover(&u1, None);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.as_str(), "D1");

        let top = Requester::new(ClassificationLevel::TopSecret, "OrgZ");
        let found = registry.discover(&top, Some("signals"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.as_str(), "D2");

        assert!(registry.discover(&top, Some("unknown-tag")).is_empty());
    }

    #[test]
    fn test_authorize_unknown_document() {
        let registry = registry();
        let u1 = Requester::new(ClassificationLevel::TopSecret, "OrgA");
        assert_eq!(
            registry.authorize(&u1, &"missing".into()),
            Err(AuthorizationError::UnknownDocument("missing".into()))
        );
        assert!(registry.check_visibility(&u1, &"D1".into()));
    }
}
