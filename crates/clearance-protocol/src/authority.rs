//! In-process document authority.
//!
//! [`MemoryAuthority`] is the server side of the access protocol. For each
//! request it checks, in order:
//!
//! 1. request limits and the ephemeral DID/key pairing
//! 2. the requestor's signature against its registered signing key
//! 3. credential trust, and that the request's issuer and level match it
//! 4. key binding between the credential and the registered keys
//! 5. timestamp skew
//! 6. nonce uniqueness within the replay window
//! 7. the classification policy for the document
//!
//! and then encrypts the document to the ephemeral key with a fresh server
//! key.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::StaticSecret;

use clearance_core::{
    AuthorizationError, CoreError, Did, DocumentId, DocumentRecord, DocumentRegistry, IndexConfig,
    PublicIdentity, X25519PublicKey,
};
use clearance_store::MaxViews;
use clearance_trust::{
    BindingError, BoxNonce, ClearanceCredential, MessageCodec, TrustAnchor, TrustVerifier,
};

use crate::error::Result;
use crate::messages::{
    AccessRejection, AccessRequest, AccessResponse, RejectionCode, REQUEST_NONCE_LEN,
};
use crate::transport::Authority;

/// Configuration of a [`MemoryAuthority`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityConfig {
    /// Issuer whose credentials are accepted.
    pub trust_anchor: TrustAnchor,
    /// How long a seen nonce is remembered. Must cover twice the skew.
    #[serde(default = "default_replay_window")]
    pub replay_window: Duration,
    /// Accepted distance between request timestamp and authority clock.
    #[serde(default = "default_clock_skew")]
    pub max_clock_skew: Duration,
    /// Lifetime handed to clients for their cached copy.
    #[serde(default)]
    pub copy_ttl: Option<Duration>,
    /// View limit handed to clients for their cached copy.
    #[serde(default)]
    pub max_views: Option<MaxViews>,
}

fn default_replay_window() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_clock_skew() -> Duration {
    Duration::from_secs(5 * 60)
}

impl AuthorityConfig {
    pub fn new(trust_anchor: TrustAnchor) -> Self {
        Self {
            trust_anchor,
            replay_window: default_replay_window(),
            max_clock_skew: default_clock_skew(),
            copy_ttl: None,
            max_views: None,
        }
    }

    /// The replay window actually enforced, widened to twice the skew.
    ///
    /// A nonce forgotten sooner could be replayed while its timestamp is
    /// still inside the skew tolerance.
    pub fn effective_replay_window(&self) -> Duration {
        self.replay_window.max(self.max_clock_skew.saturating_mul(2))
    }
}

#[derive(Debug, Clone)]
struct Holder {
    credential: ClearanceCredential,
    identity: PublicIdentity,
}

type NonceKey = (Did, [u8; REQUEST_NONCE_LEN]);

/// Reference document authority holding documents in memory.
pub struct MemoryAuthority {
    config: AuthorityConfig,
    verifier: TrustVerifier,
    registry: DocumentRegistry,
    contents: RwLock<HashMap<DocumentId, Vec<u8>>>,
    holders: RwLock<HashMap<Did, Holder>>,
    /// Seen nonces with the timestamp of the request that used them.
    seen: Mutex<HashMap<NonceKey, i64>>,
}

impl MemoryAuthority {
    pub fn new(config: AuthorityConfig) -> Self {
        if config.effective_replay_window() != config.replay_window {
            tracing::warn!(
                configured = ?config.replay_window,
                enforced = ?config.effective_replay_window(),
                "replay window shorter than twice the clock skew, widening"
            );
        }
        Self {
            verifier: TrustVerifier::new(config.trust_anchor.clone()),
            config,
            registry: DocumentRegistry::default(),
            contents: RwLock::new(HashMap::new()),
            holders: RwLock::new(HashMap::new()),
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Authority with a custom index sizing.
    pub fn with_index(config: AuthorityConfig, index: IndexConfig) -> std::result::Result<Self, CoreError> {
        let mut authority = Self::new(config);
        authority.registry = DocumentRegistry::new(index)?;
        Ok(authority)
    }

    pub fn config(&self) -> &AuthorityConfig {
        &self.config
    }

    /// The document registry, for discovery.
    pub fn registry(&self) -> &DocumentRegistry {
        &self.registry
    }

    /// Register a credential holder with its public keys.
    ///
    /// The keys must already bind to the credential.
    pub fn register_holder(
        &self,
        credential: ClearanceCredential,
        identity: PublicIdentity,
    ) -> std::result::Result<(), BindingError> {
        self.verifier.verify_binding_public(&credential, &identity)?;
        tracing::debug!(holder = %credential.holder, "holder registered");
        self.holders
            .write()
            .insert(credential.holder.clone(), Holder { credential, identity });
        Ok(())
    }

    /// Register a document and its content.
    pub fn publish(&self, record: DocumentRecord, content: Vec<u8>) -> std::result::Result<(), CoreError> {
        let id = record.id.clone();
        self.registry.register(record)?;
        self.contents.write().insert(id, content);
        Ok(())
    }

    /// Answer one request at time `now` (ms).
    pub fn handle(
        &self,
        request: &AccessRequest,
        now: i64,
    ) -> std::result::Result<AccessResponse, AccessRejection> {
        let result = self.process(request, now);
        match &result {
            Ok(response) => tracing::info!(
                document_id = %request.document_id,
                requestor = %request.requestor_did,
                copy_id = %response.copy_id,
                "document disclosed"
            ),
            Err(rejection) => tracing::warn!(
                document_id = %request.document_id,
                requestor = %request.requestor_did,
                code = ?rejection.code,
                reason = %rejection.message,
                "access request rejected"
            ),
        }
        result
    }

    fn process(
        &self,
        request: &AccessRequest,
        now: i64,
    ) -> std::result::Result<AccessResponse, AccessRejection> {
        request
            .validate()
            .map_err(|e| AccessRejection::new(RejectionCode::InvalidRequest, e))?;

        let holder = self
            .holders
            .read()
            .get(&request.requestor_did)
            .cloned()
            .ok_or_else(|| {
                AccessRejection::new(
                    RejectionCode::UnknownRequestor,
                    format!("no credential on file for {}", request.requestor_did),
                )
            })?;

        holder
            .identity
            .signing_public_key
            .verify(&request.payload(), &request.signature())
            .map_err(|_| {
                AccessRejection::new(
                    RejectionCode::InvalidSignature,
                    "request signature does not verify",
                )
            })?;

        let verified = self
            .verifier
            .verify_trust(&holder.credential, now)
            .map_err(|e| AccessRejection::new(RejectionCode::UntrustedCredential, e.to_string()))?;
        if request.issuer_did != holder.credential.issuer || request.clearance_level != verified.level
        {
            return Err(AccessRejection::new(
                RejectionCode::UntrustedCredential,
                "request claims do not match the credential on file",
            ));
        }

        self.verifier
            .verify_binding_public(&holder.credential, &holder.identity)
            .map_err(|e| AccessRejection::new(RejectionCode::KeyBindingFailed, e.to_string()))?;

        let skew = u128::from(now.abs_diff(request.timestamp));
        if skew > self.config.max_clock_skew.as_millis() {
            return Err(AccessRejection::new(
                RejectionCode::ClockSkew,
                format!("request timestamp is {skew} ms away from authority time"),
            ));
        }

        self.check_replay(request, now)?;

        let record = self
            .registry
            .authorize(&verified.requester(), &request.document_id)
            .map_err(|e| match e {
                AuthorizationError::UnknownDocument(_) => {
                    AccessRejection::new(RejectionCode::UnknownDocument, e.to_string())
                }
                _ => AccessRejection::new(RejectionCode::Denied, e.to_string()),
            })?;

        let content = self
            .contents
            .read()
            .get(&record.id)
            .cloned()
            .ok_or_else(|| AccessRejection::new(RejectionCode::Internal, "document content missing"))?;

        self.seal_response(request, &content, now)
    }

    /// Record the nonce, rejecting it if already seen.
    ///
    /// Entries older than the replay window are dropped first. A request
    /// that old already fails the skew check.
    fn check_replay(
        &self,
        request: &AccessRequest,
        now: i64,
    ) -> std::result::Result<(), AccessRejection> {
        let window = i64::try_from(self.config.effective_replay_window().as_millis())
            .unwrap_or(i64::MAX);
        let mut seen = self.seen.lock();
        seen.retain(|_, timestamp| now.saturating_sub(*timestamp) <= window);

        let key = (request.requestor_did.clone(), request.nonce);
        if seen.contains_key(&key) {
            return Err(AccessRejection::new(
                RejectionCode::ReplayDetected,
                format!("nonce {} already used", hex::encode(request.nonce)),
            ));
        }
        seen.insert(key, request.timestamp);
        Ok(())
    }

    fn seal_response(
        &self,
        request: &AccessRequest,
        content: &[u8],
        now: i64,
    ) -> std::result::Result<AccessResponse, AccessRejection> {
        let server_secret = StaticSecret::random_from_rng(OsRng);
        let server_public = X25519PublicKey::from(x25519_dalek::PublicKey::from(&server_secret));
        let nonce = BoxNonce::generate();
        let ciphertext =
            MessageCodec::seal(&server_secret, &request.ephemeral_key(), &nonce, content)
                .map_err(|e| AccessRejection::new(RejectionCode::Internal, e.to_string()))?;

        let mut copy_id = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut copy_id);

        Ok(AccessResponse {
            ciphertext,
            nonce: *nonce.as_bytes(),
            server_public_key: *server_public.as_bytes(),
            copy_id: hex::encode(copy_id),
            expires_at: self.config.copy_ttl.map(|ttl| {
                now.saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))
            }),
            max_views: self.config.max_views,
        })
    }
}

#[async_trait]
impl Authority for MemoryAuthority {
    async fn request_access(&self, request: AccessRequest) -> Result<AccessResponse> {
        Ok(self.handle(&request, clearance_core::now_millis())?)
    }
}
