//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: one trust authority serving
//! document D1 and three holders with different clearances.

use std::sync::Arc;

use clearance_core::{
    now_millis, ClassificationLevel, Did, DocumentRecord, DualKeyIdentity, Organization, Requester,
};
use clearance_protocol::{AuthorityConfig, MemoryAuthority};
use clearance_trust::{ClearanceCredential, CredentialKeys, TrustAnchor};

/// DID of the scenario's trust authority.
pub const ISSUER_DID: &str = "did:web:clearance-authority";

/// Content the authority serves for D1.
pub const D1_CONTENT: &[u8] = b"D1: confidential, releasable to OrgA";

/// A holder: long-term keys plus a credential signed by the scenario issuer.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub name: &'static str,
    pub identity: DualKeyIdentity,
    pub credential: ClearanceCredential,
}

impl TestUser {
    /// The policy subject this user's credential describes.
    pub fn requester(&self) -> Requester {
        Requester::new(
            self.credential
                .clearance_level
                .unwrap_or(ClassificationLevel::Unclassified),
            self.credential
                .organization
                .clone()
                .unwrap_or_else(|| Organization::new("")),
        )
    }
}

/// A trust authority with D1 published and three registered holders.
///
/// - U1: Confidential, OrgA (may read D1)
/// - U2: Secret, OrgB (cleared, but D1 is not releasable to OrgB)
/// - U3: Unclassified, OrgA (right organization, insufficient clearance)
pub struct Scenario {
    pub issuer: DualKeyIdentity,
    pub authority: Arc<MemoryAuthority>,
    pub u1: TestUser,
    pub u2: TestUser,
    pub u3: TestUser,
}

impl Scenario {
    /// Create the scenario with the default authority configuration.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create the scenario, adjusting the authority configuration first.
    pub fn with_config(adjust: impl FnOnce(&mut AuthorityConfig)) -> Self {
        let issuer = DualKeyIdentity::random();
        let mut config = AuthorityConfig::new(issuer_anchor(&issuer));
        adjust(&mut config);

        let authority = Arc::new(MemoryAuthority::new(config));
        authority
            .publish(d1_record(), D1_CONTENT.to_vec())
            .expect("publish D1");

        let u1 = register(&issuer, &authority, "U1", ClassificationLevel::Confidential, "OrgA");
        let u2 = register(&issuer, &authority, "U2", ClassificationLevel::Secret, "OrgB");
        let u3 = register(&issuer, &authority, "U3", ClassificationLevel::Unclassified, "OrgA");
        Self {
            issuer,
            authority,
            u1,
            u2,
            u3,
        }
    }

    /// The anchor a wallet pins to trust this scenario's issuer.
    pub fn trust_anchor(&self) -> TrustAnchor {
        issuer_anchor(&self.issuer)
    }

    /// A new holder, registered with the authority.
    pub fn user(&self, name: &'static str, level: ClassificationLevel, org: &str) -> TestUser {
        register(&self.issuer, &self.authority, name, level, org)
    }

    /// A new holder with a valid credential the authority has never seen.
    pub fn unregistered_user(
        &self,
        name: &'static str,
        level: ClassificationLevel,
        org: &str,
    ) -> TestUser {
        new_user(&self.issuer, name, level, org)
    }

    /// A credential for `identity`, issued a minute ago.
    pub fn credential_for(
        &self,
        identity: &DualKeyIdentity,
        level: ClassificationLevel,
        org: &str,
        expires_at: Option<i64>,
    ) -> ClearanceCredential {
        issue(&self.issuer, identity, level, org, expires_at)
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new()
    }
}

/// The D1 catalog record: Confidential, releasable to OrgA, tagged "briefing".
pub fn d1_record() -> DocumentRecord {
    DocumentRecord::new(
        "D1",
        ClassificationLevel::Confidential,
        [Organization::from("OrgA")],
    )
    .with_tags(["briefing"])
}

/// Identities from seeds `[i, 0, 0, ...]`.
pub fn deterministic_identities(count: usize) -> Vec<DualKeyIdentity> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            DualKeyIdentity::generate(seed)
        })
        .collect()
}

fn issuer_did() -> Did {
    Did::parse(ISSUER_DID).expect("valid issuer DID")
}

fn issuer_anchor(issuer: &DualKeyIdentity) -> TrustAnchor {
    TrustAnchor::new(issuer_did()).with_issuer_key(issuer.signing_public())
}

fn holder_did(identity: &DualKeyIdentity) -> Did {
    Did::parse(format!("did:key:{}", identity.signing_public().to_hex())).expect("valid holder DID")
}

fn issue(
    issuer: &DualKeyIdentity,
    identity: &DualKeyIdentity,
    level: ClassificationLevel,
    org: &str,
    expires_at: Option<i64>,
) -> ClearanceCredential {
    ClearanceCredential::new(
        issuer_did(),
        holder_did(identity),
        level,
        Organization::from(org),
        CredentialKeys::for_identity(&identity.export_public()),
        now_millis() - 60_000,
        expires_at,
    )
    .sign(issuer)
}

fn new_user(
    issuer: &DualKeyIdentity,
    name: &'static str,
    level: ClassificationLevel,
    org: &str,
) -> TestUser {
    let identity = DualKeyIdentity::random();
    let credential = issue(issuer, &identity, level, org, None);
    TestUser {
        name,
        identity,
        credential,
    }
}

fn register(
    issuer: &DualKeyIdentity,
    authority: &MemoryAuthority,
    name: &'static str,
    level: ClassificationLevel,
    org: &str,
) -> TestUser {
    let user = new_user(issuer, name, level, org);
    authority
        .register_holder(user.credential.clone(), user.identity.export_public())
        .expect("register holder");
    user
}

#[cfg(test)]
mod tests {
    use super::*;
    use clearance_core::DocumentId;
    use clearance_trust::TrustVerifier;

    #[test]
    fn test_scenario_users() {
        let scenario = Scenario::new();
        let verifier = TrustVerifier::new(scenario.trust_anchor());

        for user in [&scenario.u1, &scenario.u2, &scenario.u3] {
            let verified = verifier
                .verify_trust(&user.credential, now_millis())
                .unwrap();
            assert_eq!(verified.requester(), user.requester(), "{}", user.name);
            verifier
                .verify_binding(&user.credential, &user.identity)
                .unwrap();
        }
    }

    #[test]
    fn test_scenario_policy() {
        let scenario = Scenario::new();
        let registry = scenario.authority.registry();
        let d1 = DocumentId::new("D1");

        assert!(registry.check_visibility(&scenario.u1.requester(), &d1));
        assert!(!registry.check_visibility(&scenario.u2.requester(), &d1));
        assert!(!registry.check_visibility(&scenario.u3.requester(), &d1));
    }

    #[test]
    fn test_deterministic_identities() {
        let a = deterministic_identities(3);
        let b = deterministic_identities(3);
        assert_eq!(a[1].signing_public(), b[1].signing_public());
        assert_ne!(a[0].signing_public(), a[1].signing_public());
        assert_ne!(a[1].signing_public(), a[2].signing_public());
    }
}
