//! Ephemeral access state machine.
//!
//! ```text
//! Created -> RequestSigned -> Sent -> ResponseReceived -> DecryptedAndDestroyed
//!    \____________\____________\__________\______________> Failed
//! ```
//!
//! Every attempt owns one [`EphemeralKeyPair`]. The key is destroyed when
//! the response is decrypted and whenever the attempt fails, so it can never
//! open a second response. Failed attempts are not retried; start a new one.

use std::fmt;
use std::time::Duration;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use clearance_core::{DocumentId, DualKeyIdentity, EphemeralId};
use clearance_store::MaxViews;
use clearance_trust::{ClearanceCredential, EphemeralKeyPair, TrustVerifier};

use crate::error::{ProtocolError, Result};
use crate::messages::{AccessRequest, AccessResponse, REQUEST_NONCE_LEN};
use crate::transport::Authority;

/// Configuration for access attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Timeout for the authority round trip.
    pub request_timeout: Duration,
    /// Assumed bound on clock difference with the authority. A credential
    /// must stay valid this long past local time to be used.
    pub max_clock_skew: Duration,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_clock_skew: Duration::from_secs(5 * 60),
        }
    }
}

/// Phase of an [`AccessAttempt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessState {
    Created,
    RequestSigned,
    Sent,
    ResponseReceived,
    DecryptedAndDestroyed,
    Failed,
}

/// The result of a successful attempt.
pub struct Disclosure {
    pub document_id: DocumentId,
    pub ephemeral_id: EphemeralId,
    pub copy_id: String,
    pub plaintext: Zeroizing<Vec<u8>>,
    /// Authority-set expiry of the cached copy.
    pub expires_at: Option<i64>,
    /// Authority-set view limit of the cached copy.
    pub max_views: Option<MaxViews>,
}

impl fmt::Debug for Disclosure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disclosure")
            .field("document_id", &self.document_id)
            .field("ephemeral_id", &self.ephemeral_id)
            .field("copy_id", &self.copy_id)
            .field("len", &self.plaintext.len())
            .field("expires_at", &self.expires_at)
            .field("max_views", &self.max_views)
            .finish()
    }
}

/// One attempt to retrieve one document.
#[derive(Debug)]
pub struct AccessAttempt {
    document_id: DocumentId,
    key: EphemeralKeyPair,
    state: AccessState,
    config: AccessConfig,
    request: Option<AccessRequest>,
    response: Option<AccessResponse>,
}

impl AccessAttempt {
    /// Start an attempt with a fresh ephemeral key.
    pub fn new(document_id: DocumentId, config: AccessConfig) -> Self {
        let key = EphemeralKeyPair::generate();
        tracing::debug!(ephemeral_id = %key.id(), %document_id, "access attempt created");
        Self {
            document_id,
            key,
            state: AccessState::Created,
            config,
            request: None,
            response: None,
        }
    }

    pub fn state(&self) -> AccessState {
        self.state
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    pub fn ephemeral_id(&self) -> EphemeralId {
        self.key.id()
    }

    /// The signed request, once there is one.
    pub fn request(&self) -> Option<&AccessRequest> {
        self.request.as_ref()
    }

    /// Whether the ephemeral private key is gone.
    pub fn is_key_destroyed(&self) -> bool {
        self.key.is_destroyed() && self.key.secret_is_zeroed()
    }

    /// Run every step against `authority`.
    pub async fn run<A: Authority + ?Sized>(
        &mut self,
        identity: &DualKeyIdentity,
        credential: &ClearanceCredential,
        verifier: &TrustVerifier,
        authority: &A,
        now: i64,
    ) -> Result<Disclosure> {
        self.sign_request(identity, credential, verifier, now)?;
        self.send(authority).await?;
        self.decrypt()
    }

    /// Check the credential and sign the request with the long-term key.
    pub fn sign_request(
        &mut self,
        identity: &DualKeyIdentity,
        credential: &ClearanceCredential,
        verifier: &TrustVerifier,
        now: i64,
    ) -> Result<()> {
        self.expect_state(AccessState::Created)?;
        match self.build_request(identity, credential, verifier, now) {
            Ok(request) => {
                self.request = Some(request);
                self.transition(AccessState::RequestSigned);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn build_request(
        &self,
        identity: &DualKeyIdentity,
        credential: &ClearanceCredential,
        verifier: &TrustVerifier,
        now: i64,
    ) -> Result<AccessRequest> {
        let skew = i64::try_from(self.config.max_clock_skew.as_millis()).unwrap_or(i64::MAX);
        let verified = verifier.verify_trust(credential, now.saturating_add(skew))?;
        verifier.verify_binding(credential, identity)?;

        let mut nonce = [0u8; REQUEST_NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let ephemeral_did = self.key.id().to_did();
        let signature = identity.sign(&AccessRequest::signing_bytes(
            &self.document_id,
            &ephemeral_did,
            &credential.holder,
            now,
            &nonce,
        ));

        Ok(AccessRequest {
            document_id: self.document_id.clone(),
            requestor_did: credential.holder.clone(),
            issuer_did: credential.issuer.clone(),
            clearance_level: verified.level,
            ephemeral_did,
            ephemeral_public_key: *self.key.public_key().as_bytes(),
            signature: *signature.as_bytes(),
            timestamp: now,
            nonce,
        })
    }

    /// Send the signed request and wait, bounded by the request timeout.
    pub async fn send<A: Authority + ?Sized>(&mut self, authority: &A) -> Result<()> {
        self.expect_state(AccessState::RequestSigned)?;
        let request = self.request.clone().ok_or(ProtocolError::InvalidState {
            expected: AccessState::RequestSigned,
            actual: self.state,
        })?;
        self.transition(AccessState::Sent);

        let timeout = self.config.request_timeout;
        let result = match tokio::time::timeout(timeout, authority.request_access(request)).await {
            Ok(result) => result.and_then(|response| {
                response
                    .validate()
                    .map_err(|e| ProtocolError::MalformedResponse(e.into()))?;
                Ok(response)
            }),
            Err(_) => Err(ProtocolError::Timeout(timeout)),
        };

        match result {
            Ok(response) => {
                self.response = Some(response);
                self.transition(AccessState::ResponseReceived);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Decrypt the response. The ephemeral key is destroyed before the
    /// plaintext is returned.
    pub fn decrypt(&mut self) -> Result<Disclosure> {
        self.expect_state(AccessState::ResponseReceived)?;
        let response = self.response.take().ok_or(ProtocolError::InvalidState {
            expected: AccessState::ResponseReceived,
            actual: self.state,
        })?;

        match self.key.decrypt_and_destroy(
            &response.server_key(),
            &response.box_nonce(),
            &response.ciphertext,
        ) {
            Ok(plaintext) => {
                self.transition(AccessState::DecryptedAndDestroyed);
                tracing::info!(
                    ephemeral_id = %self.key.id(),
                    document_id = %self.document_id,
                    copy_id = %response.copy_id,
                    "document received"
                );
                Ok(Disclosure {
                    document_id: self.document_id.clone(),
                    ephemeral_id: self.key.id(),
                    copy_id: response.copy_id,
                    plaintext: Zeroizing::new(plaintext),
                    expires_at: response.expires_at,
                    max_views: response.max_views,
                })
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    fn expect_state(&self, expected: AccessState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ProtocolError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }

    fn transition(&mut self, next: AccessState) {
        tracing::debug!(
            ephemeral_id = %self.key.id(),
            document_id = %self.document_id,
            from = ?self.state,
            to = ?next,
            "access attempt transition"
        );
        self.state = next;
    }

    fn fail(&mut self, error: ProtocolError) -> ProtocolError {
        // Already destroyed when the failure came from decryption.
        let _ = self.key.destroy();
        self.response = None;
        tracing::warn!(
            ephemeral_id = %self.key.id(),
            document_id = %self.document_id,
            from = ?self.state,
            %error,
            "access attempt failed"
        );
        self.state = AccessState::Failed;
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::tests::{Fixture, NOW};
    use crate::messages::RejectionCode;
    use async_trait::async_trait;
    use clearance_core::{now_millis, ClassificationLevel, Did};
    use clearance_trust::{
        CryptoError, EphemeralError, ReplayOrReuseError, TrustAnchor, TrustError,
    };

    fn verifier(fx: &Fixture) -> TrustVerifier {
        TrustVerifier::new(fx.authority.config().trust_anchor.clone())
    }

    /// Forwards to the fixture authority, then tampers with the answer.
    struct Tamper<'a> {
        inner: &'a crate::authority::MemoryAuthority,
        edit: fn(&mut AccessResponse),
    }

    #[async_trait]
    impl Authority for Tamper<'_> {
        async fn request_access(&self, request: AccessRequest) -> Result<AccessResponse> {
            let mut response = self.inner.handle(&request, now_millis())?;
            (self.edit)(&mut response);
            Ok(response)
        }
    }

    struct Silent;

    #[async_trait]
    impl Authority for Silent {
        async fn request_access(&self, _request: AccessRequest) -> Result<AccessResponse> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(ProtocolError::Transport("unreachable".into()))
        }
    }

    #[tokio::test]
    async fn test_full_attempt() {
        let fx = Fixture::new();
        let (u1, cred) = fx.holder(ClassificationLevel::Confidential, "OrgA");

        let mut attempt = AccessAttempt::new(DocumentId::new("D1"), AccessConfig::default());
        assert_eq!(attempt.state(), AccessState::Created);

        attempt
            .sign_request(&u1, &cred, &verifier(&fx), now_millis())
            .unwrap();
        assert_eq!(attempt.state(), AccessState::RequestSigned);
        let request = attempt.request().unwrap();
        assert_eq!(request.ephemeral_id().unwrap(), attempt.ephemeral_id());
        assert_eq!(request.clearance_level, ClassificationLevel::Confidential);

        attempt.send(&fx.authority).await.unwrap();
        assert_eq!(attempt.state(), AccessState::ResponseReceived);
        assert!(!attempt.is_key_destroyed());

        let disclosure = attempt.decrypt().unwrap();
        assert_eq!(attempt.state(), AccessState::DecryptedAndDestroyed);
        assert_eq!(disclosure.plaintext.as_slice(), b"D1 contents");
        assert_eq!(disclosure.ephemeral_id, attempt.ephemeral_id());
        assert!(attempt.is_key_destroyed());

        assert!(matches!(
            attempt.decrypt(),
            Err(ProtocolError::InvalidState {
                actual: AccessState::DecryptedAndDestroyed,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_denied_attempt_fails_and_destroys_key() {
        let fx = Fixture::new();
        let (u2, cred) = fx.holder(ClassificationLevel::Secret, "OrgB");

        let mut attempt = AccessAttempt::new(DocumentId::new("D1"), AccessConfig::default());
        let err = attempt
            .run(&u2, &cred, &verifier(&fx), &fx.authority, now_millis())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Rejected {
                code: RejectionCode::Denied,
                ..
            }
        ));
        assert_eq!(attempt.state(), AccessState::Failed);
        assert!(attempt.is_key_destroyed());
    }

    #[tokio::test]
    async fn test_untrusted_credential_stops_before_signing() {
        let fx = Fixture::new();
        let (u1, cred) = fx.holder(ClassificationLevel::Confidential, "OrgA");
        let foreign = TrustVerifier::new(TrustAnchor::new(Did::parse("did:web:elsewhere").unwrap()));

        let mut attempt = AccessAttempt::new(DocumentId::new("D1"), AccessConfig::default());
        let err = attempt.sign_request(&u1, &cred, &foreign, NOW).unwrap_err();
        assert!(matches!(err, ProtocolError::Trust(TrustError::UntrustedIssuer { .. })));
        assert!(attempt.request().is_none());
        assert_eq!(attempt.state(), AccessState::Failed);
        assert!(attempt.is_key_destroyed());
    }

    #[tokio::test]
    async fn test_credential_expiring_within_skew_rejected() {
        let fx = Fixture::new();
        let identity = DualKeyIdentity::random();
        let cred = fx.credential_for(
            &identity,
            ClassificationLevel::Secret,
            "OrgA",
            Some(NOW + 60_000),
        );
        let mut attempt = AccessAttempt::new(DocumentId::new("D1"), AccessConfig::default());
        let err = attempt
            .sign_request(&identity, &cred, &verifier(&fx), NOW)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Trust(TrustError::Expired { .. })));
    }

    #[tokio::test]
    async fn test_unbound_key_rejected() {
        let fx = Fixture::new();
        let (_, cred) = fx.holder(ClassificationLevel::Confidential, "OrgA");
        let stranger = DualKeyIdentity::random();

        let mut attempt = AccessAttempt::new(DocumentId::new("D1"), AccessConfig::default());
        let err = attempt
            .sign_request(&stranger, &cred, &verifier(&fx), NOW)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Binding(_)));
    }

    #[tokio::test]
    async fn test_timeout() {
        let fx = Fixture::new();
        let (u1, cred) = fx.holder(ClassificationLevel::Confidential, "OrgA");
        let config = AccessConfig {
            request_timeout: Duration::from_millis(50),
            ..AccessConfig::default()
        };

        let mut attempt = AccessAttempt::new(DocumentId::new("D1"), config);
        let err = attempt
            .run(&u1, &cred, &verifier(&fx), &Silent, now_millis())
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Timeout(d) if d == Duration::from_millis(50)));
        assert_eq!(attempt.state(), AccessState::Failed);
        assert!(attempt.is_key_destroyed());
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let fx = Fixture::new();
        let (u1, cred) = fx.holder(ClassificationLevel::Confidential, "OrgA");
        let authority = Tamper {
            inner: &fx.authority,
            edit: |r| r.ciphertext.truncate(3),
        };

        let mut attempt = AccessAttempt::new(DocumentId::new("D1"), AccessConfig::default());
        let err = attempt
            .run(&u1, &cred, &verifier(&fx), &authority, now_millis())
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedResponse(_)));
        assert_eq!(attempt.state(), AccessState::Failed);
    }

    #[tokio::test]
    async fn test_tampered_ciphertext_destroys_key() {
        let fx = Fixture::new();
        let (u1, cred) = fx.holder(ClassificationLevel::Confidential, "OrgA");
        let authority = Tamper {
            inner: &fx.authority,
            edit: |r| r.ciphertext[0] ^= 0x01,
        };

        let mut attempt = AccessAttempt::new(DocumentId::new("D1"), AccessConfig::default());
        let err = attempt
            .run(&u1, &cred, &verifier(&fx), &authority, now_millis())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Ephemeral(EphemeralError::Crypto(CryptoError::Decryption))
        ));
        assert!(attempt.is_key_destroyed());
        assert_eq!(attempt.state(), AccessState::Failed);
    }

    #[tokio::test]
    async fn test_steps_out_of_order() {
        let fx = Fixture::new();
        let mut attempt = AccessAttempt::new(DocumentId::new("D1"), AccessConfig::default());
        assert!(matches!(
            attempt.send(&fx.authority).await,
            Err(ProtocolError::InvalidState {
                expected: AccessState::RequestSigned,
                actual: AccessState::Created,
            })
        ));
        assert!(matches!(
            attempt.decrypt(),
            Err(ProtocolError::InvalidState { .. })
        ));
        // Misuse does not consume the attempt.
        assert_eq!(attempt.state(), AccessState::Created);
        assert!(!attempt.is_key_destroyed());
    }

    #[test]
    fn test_reuse_error_is_key_destroyed() {
        let attempt = AccessAttempt::new(DocumentId::new("D1"), AccessConfig::default());
        attempt.key.destroy().unwrap();
        assert_eq!(
            attempt.key.destroy(),
            Err(ReplayOrReuseError::KeyDestroyed(attempt.ephemeral_id()))
        );
    }
}
