//! Explicit session context.
//!
//! Operations that sign, decrypt or read cached copies take a
//! [`SessionContext`] argument. The wallet never looks one up from global
//! state.

use std::fmt;

use clearance_core::{Did, DualKeyIdentity};
use clearance_trust::ClearanceCredential;

/// The signed-in holder: long-term keys plus the credential they bind to.
#[derive(Clone)]
pub struct SessionContext {
    identity: DualKeyIdentity,
    credential: ClearanceCredential,
    did: Did,
}

impl SessionContext {
    /// The DID is the credential's holder.
    pub fn new(identity: DualKeyIdentity, credential: ClearanceCredential) -> Self {
        let did = credential.holder.clone();
        Self {
            identity,
            credential,
            did,
        }
    }

    pub fn identity(&self) -> &DualKeyIdentity {
        &self.identity
    }

    pub fn credential(&self) -> &ClearanceCredential {
        &self.credential
    }

    pub fn did(&self) -> &Did {
        &self.did
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("did", &self.did)
            .field("identity", &self.identity)
            .finish()
    }
}
