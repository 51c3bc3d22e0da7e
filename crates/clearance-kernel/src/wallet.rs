//! The Wallet: unified API for clearance-gated disclosure.
//!
//! The Wallet ties the local document catalog, the access protocol and the
//! document cache together. Every operation that uses long-term keys takes
//! an explicit [`SessionContext`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use zeroize::Zeroizing;

use clearance_core::{
    now_millis, DocumentId, DocumentRecord, DocumentRegistry, DualKeyIdentity, EphemeralId,
    Requester, X25519PublicKey,
};
use clearance_protocol::{AccessAttempt, Authority, Disclosure};
use clearance_store::{
    CopyContent, DocumentCache, DocumentSummary, ExpiryError, NewCopy, Store, ViewOutcome,
};
use clearance_trust::{SealedMessage, TrustVerifier};

use crate::config::WalletConfig;
use crate::error::{KernelError, Result};
use crate::session::SessionContext;

/// What reading a cached copy produced.
pub enum DocumentView {
    /// The decrypted document.
    Content(Zeroizing<Vec<u8>>),
    /// The copy lives elsewhere; the host fetches and opens it.
    Remote { url: String },
    /// The copy expired, ran out of views or was revoked.
    NotAccessible(ExpiryError),
}

impl DocumentView {
    /// The plaintext, or the reason there is none.
    pub fn into_content(self) -> Result<Zeroizing<Vec<u8>>> {
        match self {
            Self::Content(bytes) => Ok(bytes),
            Self::Remote { url } => Err(KernelError::InvalidOperation(format!(
                "copy is stored remotely at {url}"
            ))),
            Self::NotAccessible(reason) => Err(reason.into()),
        }
    }
}

impl std::fmt::Debug for DocumentView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Content(bytes) => write!(f, "Content({} bytes)", bytes.len()),
            Self::Remote { url } => write!(f, "Remote({url})"),
            Self::NotAccessible(reason) => write!(f, "NotAccessible({reason})"),
        }
    }
}

/// The main Wallet struct.
///
/// Provides a unified API for:
/// - Checking visibility and discovering documents
/// - Retrieving documents through single-use ephemeral keys
/// - Reading, revoking and sweeping cached copies
/// - Persisting identities
/// - Wallet-to-wallet encrypted messages
pub struct Wallet<S: Store + ?Sized, A: Authority + ?Sized> {
    /// Cached copies over the storage backend.
    cache: DocumentCache<S>,
    /// The document authority.
    authority: Arc<A>,
    /// Known document metadata.
    catalog: DocumentRegistry,
    verifier: TrustVerifier,
    config: WalletConfig,
    /// Published once the holder is signed in.
    session: watch::Sender<Option<Arc<SessionContext>>>,
}

impl<S: Store + ?Sized, A: Authority + ?Sized> Wallet<S, A> {
    /// Create a new wallet.
    pub fn new(store: Arc<S>, authority: Arc<A>, config: WalletConfig) -> Result<Self> {
        let (session, _) = watch::channel(None);
        Ok(Self {
            cache: DocumentCache::new(store, config.cache),
            authority,
            catalog: DocumentRegistry::new(config.index)?,
            verifier: TrustVerifier::new(config.trust_anchor.clone()),
            config,
            session,
        })
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        self.cache.store()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session
    // ─────────────────────────────────────────────────────────────────────────

    /// Publish the session. Fails if one is already published.
    pub fn set_session(&self, session: SessionContext) -> Result<()> {
        let session = Arc::new(session);
        let did = session.did().clone();
        let published = self.session.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(session);
            true
        });
        if !published {
            return Err(KernelError::SessionExists);
        }
        tracing::info!(holder = %did, "session established");
        Ok(())
    }

    /// Drop the published session.
    pub fn end_session(&self) {
        if self.session.send_replace(None).is_some() {
            tracing::info!("session ended");
        }
    }

    /// The published session, if any.
    pub fn session(&self) -> Option<Arc<SessionContext>> {
        self.session.borrow().as_ref().cloned()
    }

    /// Wait until a session is published, for at most `timeout`.
    pub async fn wait_for_session(&self, timeout: Duration) -> Result<Arc<SessionContext>> {
        let mut rx = self.session.subscribe();
        let waited = tokio::time::timeout(timeout, async move {
            rx.wait_for(Option::is_some).await.map(|s| s.as_ref().cloned())
        })
        .await;
        match waited {
            Ok(Ok(Some(session))) => Ok(session),
            _ => Err(KernelError::NotReady(timeout)),
        }
    }

    /// [`Self::wait_for_session`] with the configured readiness timeout.
    pub async fn ready(&self) -> Result<Arc<SessionContext>> {
        self.wait_for_session(self.config.readiness_timeout).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Catalog
    // ─────────────────────────────────────────────────────────────────────────

    /// Add document metadata to the local catalog.
    pub fn register_document(&self, record: DocumentRecord) -> Result<()> {
        Ok(self.catalog.register(record)?)
    }

    /// Whether `requester` may see the document. Unknown documents are not
    /// visible.
    pub fn check_visibility(&self, requester: &Requester, document_id: &DocumentId) -> bool {
        self.catalog.check_visibility(requester, document_id)
    }

    /// Catalog documents visible to `requester`, optionally by tag.
    pub fn discover(&self, requester: &Requester, tag: Option<&str>) -> Vec<DocumentRecord> {
        self.catalog.discover(requester, tag)
    }

    /// The policy subject of a session, after checking its credential.
    pub fn requester(&self, session: &SessionContext) -> Result<Requester> {
        Ok(self
            .verifier
            .verify_trust(session.credential(), now_millis())?
            .requester())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Access
    // ─────────────────────────────────────────────────────────────────────────

    /// Retrieve one document through a fresh ephemeral key and cache it.
    ///
    /// The credential is checked for trust and binding, the local policy
    /// must allow the document, and the authority applies its own policy
    /// again. The returned plaintext is also cached, sealed to the holder's
    /// own encryption key.
    pub async fn request_access(
        &self,
        session: &SessionContext,
        document_id: &DocumentId,
    ) -> Result<Disclosure> {
        let now = now_millis();
        let verified = self.verifier.verify_trust(session.credential(), now)?;
        // The session identity is the local key material searched.
        self.verifier
            .verify_binding(session.credential(), session.identity())?;
        if let Err(e) = self.catalog.authorize(&verified.requester(), document_id) {
            tracing::warn!(%document_id, holder = %session.did(), error = %e, "access denied locally");
            return Err(e.into());
        }

        let mut attempt = AccessAttempt::new(document_id.clone(), self.config.access);
        let disclosure = attempt
            .run(
                session.identity(),
                session.credential(),
                &self.verifier,
                self.authority.as_ref(),
                now,
            )
            .await?;

        let sealed = SealedMessage::seal_anonymous(
            &session.identity().encryption_public(),
            &disclosure.plaintext,
        )?;
        self.cache
            .insert(
                NewCopy {
                    ephemeral_id: disclosure.ephemeral_id,
                    document_id: disclosure.document_id.clone(),
                    copy_id: disclosure.copy_id.clone(),
                    content: CopyContent::Inline {
                        sealed: sealed.to_bytes()?,
                    },
                    expires_at: disclosure.expires_at,
                    max_views: disclosure.max_views,
                },
                now_millis(),
            )
            .await?;

        Ok(disclosure)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cached Copies
    // ─────────────────────────────────────────────────────────────────────────

    /// Summaries of cached copies.
    pub async fn list_cached_documents(&self, include_expired: bool) -> Result<Vec<DocumentSummary>> {
        Ok(self.cache.list(include_expired, now_millis()).await?)
    }

    /// Count one view of a cached copy.
    pub async fn record_view(&self, ephemeral_id: &EphemeralId) -> Result<ViewOutcome> {
        Ok(self.cache.record_view(ephemeral_id, now_millis()).await?)
    }

    /// Count one view and open the copy.
    ///
    /// A copy that is no longer valid yields [`DocumentView::NotAccessible`]
    /// rather than an error.
    pub async fn view_document(
        &self,
        session: &SessionContext,
        ephemeral_id: &EphemeralId,
    ) -> Result<DocumentView> {
        let outcome = self.record_view(ephemeral_id).await?;
        if let Some(reason) = outcome.reason {
            return Ok(DocumentView::NotAccessible(reason));
        }

        let copy = self
            .cache
            .get(ephemeral_id)
            .await?
            .ok_or(clearance_store::StoreError::NotFound(*ephemeral_id))?;
        match copy.content {
            CopyContent::Inline { sealed } => {
                let plaintext = SealedMessage::from_bytes(&sealed)?
                    .open(session.identity().encryption_secret())?;
                Ok(DocumentView::Content(Zeroizing::new(plaintext)))
            }
            CopyContent::Remote { url } => Ok(DocumentView::Remote { url }),
        }
    }

    /// Revoke a cached copy. Returns false if it was no longer active.
    pub async fn revoke_copy(&self, ephemeral_id: &EphemeralId) -> Result<bool> {
        Ok(self.cache.revoke(ephemeral_id).await?)
    }

    /// Delete every copy that is no longer valid.
    pub async fn sweep(&self) -> Result<usize> {
        Ok(self.cache.sweep(now_millis()).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Key Material
    // ─────────────────────────────────────────────────────────────────────────

    /// Persist an identity's seed under `label`.
    pub async fn save_identity(&self, label: &str, identity: &DualKeyIdentity) -> Result<()> {
        self.store().put_key_material(label, &identity.seed()).await?;
        tracing::debug!(label, "identity saved");
        Ok(())
    }

    /// Re-derive a saved identity.
    pub async fn load_identity(&self, label: &str) -> Result<Option<DualKeyIdentity>> {
        Ok(self
            .store()
            .get_key_material(label)
            .await?
            .map(|seed| DualKeyIdentity::generate(*seed)))
    }

    /// Delete a saved identity. Returns false if there was none.
    pub async fn delete_identity(&self, label: &str) -> Result<bool> {
        let deleted = self.store().delete_key_material(label).await?;
        if deleted {
            tracing::info!(label, "identity deleted");
        }
        Ok(deleted)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Messaging
    // ─────────────────────────────────────────────────────────────────────────

    /// Encrypt a message from this holder to another wallet.
    pub fn seal_message(
        &self,
        session: &SessionContext,
        recipient: &X25519PublicKey,
        message: &[u8],
    ) -> Result<SealedMessage> {
        Ok(SealedMessage::seal_from(
            session.identity().encryption_secret(),
            recipient,
            message,
        )?)
    }

    /// Decrypt a message sent to this holder.
    pub fn open_message(&self, session: &SessionContext, sealed: &SealedMessage) -> Result<Vec<u8>> {
        Ok(sealed.open(session.identity().encryption_secret())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clearance_core::{ClassificationLevel, Did, Organization};
    use clearance_protocol::{AuthorityConfig, MemoryAuthority};
    use clearance_store::MemoryStore;
    use clearance_trust::{ClearanceCredential, CredentialKeys, CryptoError, TrustAnchor};

    fn anchor() -> TrustAnchor {
        TrustAnchor::new(Did::parse("did:web:authority").unwrap())
    }

    fn wallet() -> Wallet<MemoryStore, MemoryAuthority> {
        Wallet::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryAuthority::new(AuthorityConfig::new(anchor()))),
            WalletConfig::new(anchor()),
        )
        .unwrap()
    }

    fn session(identity: DualKeyIdentity) -> SessionContext {
        let credential = ClearanceCredential::new(
            anchor().issuer,
            Did::parse("did:key:holder").unwrap(),
            ClassificationLevel::Secret,
            Organization::from("OrgA"),
            CredentialKeys::for_identity(&identity.export_public()),
            0,
            None,
        );
        SessionContext::new(identity, credential)
    }

    #[tokio::test]
    async fn test_wait_for_session() {
        let wallet = Arc::new(wallet());
        assert!(matches!(
            wallet.wait_for_session(Duration::from_millis(20)).await,
            Err(KernelError::NotReady(_))
        ));

        let waiter = {
            let wallet = wallet.clone();
            tokio::spawn(async move { wallet.wait_for_session(Duration::from_secs(5)).await })
        };
        tokio::task::yield_now().await;
        wallet.set_session(session(DualKeyIdentity::random())).unwrap();

        let ready = waiter.await.unwrap().unwrap();
        assert_eq!(ready.did().as_str(), "did:key:holder");
        assert!(matches!(
            wallet.set_session(session(DualKeyIdentity::random())),
            Err(KernelError::SessionExists)
        ));

        wallet.end_session();
        assert!(wallet.session().is_none());
        wallet.set_session(session(DualKeyIdentity::random())).unwrap();
    }

    #[tokio::test]
    async fn test_identity_persistence() {
        let wallet = wallet();
        let identity = DualKeyIdentity::random();
        wallet.save_identity("main", &identity).await.unwrap();

        let loaded = wallet.load_identity("main").await.unwrap().unwrap();
        assert_eq!(loaded.export_public(), identity.export_public());

        assert!(wallet.delete_identity("main").await.unwrap());
        assert!(!wallet.delete_identity("main").await.unwrap());
        assert!(wallet.load_identity("main").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_messaging_between_wallets() {
        let alice = session(DualKeyIdentity::random());
        let bob = session(DualKeyIdentity::random());
        let wallet = wallet();

        let sealed = wallet
            .seal_message(&alice, &bob.identity().encryption_public(), b"meet at noon")
            .unwrap();
        assert_eq!(wallet.open_message(&bob, &sealed).unwrap(), b"meet at noon");
        assert!(matches!(
            wallet.open_message(&alice, &sealed),
            Err(KernelError::Crypto(CryptoError::Decryption))
        ));
    }

    #[test]
    fn test_catalog_visibility() {
        let wallet = wallet();
        wallet
            .register_document(DocumentRecord::new(
                "D1",
                ClassificationLevel::Confidential,
                [Organization::from("OrgA")],
            ))
            .unwrap();
        let d1 = DocumentId::new("D1");

        assert!(wallet.check_visibility(&Requester::new(ClassificationLevel::Confidential, "OrgA"), &d1));
        assert!(!wallet.check_visibility(&Requester::new(ClassificationLevel::Secret, "OrgB"), &d1));
        assert!(!wallet.check_visibility(&Requester::new(ClassificationLevel::Unclassified, "OrgA"), &d1));
        assert!(!wallet.check_visibility(
            &Requester::new(ClassificationLevel::TopSecret, "OrgA"),
            &DocumentId::new("D2")
        ));
        assert!(wallet.register_document(DocumentRecord::new("D1", ClassificationLevel::Secret, [])).is_err());
    }

    #[test]
    fn test_requester_from_session() {
        let wallet = wallet();
        let requester = wallet.requester(&session(DualKeyIdentity::random())).unwrap();
        assert_eq!(requester, Requester::new(ClassificationLevel::Secret, "OrgA"));
    }
}
