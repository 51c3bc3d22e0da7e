//! Transport abstraction for the document authority.
//!
//! An [`Authority`] takes one signed [`AccessRequest`] and answers with one
//! [`AccessResponse`] or a rejection. Implementations may call a remote
//! service ([`http::HttpAuthority`]) or answer in process
//! ([`crate::authority::MemoryAuthority`]).

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::messages::{AccessRequest, AccessResponse};

/// A document authority.
///
/// Implementations must be thread-safe (Send + Sync). A rejection is
/// returned as [`crate::ProtocolError::Rejected`].
#[async_trait]
pub trait Authority: Send + Sync {
    /// Submit a signed request and wait for the authority's answer.
    async fn request_access(&self, request: AccessRequest) -> Result<AccessResponse>;
}

#[async_trait]
impl<A: Authority + ?Sized> Authority for Arc<A> {
    async fn request_access(&self, request: AccessRequest) -> Result<AccessResponse> {
        (**self).request_access(request).await
    }
}

/// HTTP client for a remote authority.
pub mod http {
    use super::*;
    use std::time::Duration;

    use crate::error::ProtocolError;
    use crate::messages::{AccessRejection, RejectionCode, PROTOCOL_VERSION};

    /// Header carrying the client's protocol version.
    pub const VERSION_HEADER: &str = "x-clearance-protocol";

    /// Default cap on a response body.
    pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

    /// Posts JSON requests to an authority endpoint.
    #[derive(Debug, Clone)]
    pub struct HttpAuthority {
        client: reqwest::Client,
        endpoint: String,
        timeout: Duration,
        max_response_bytes: usize,
    }

    impl HttpAuthority {
        /// Client for `endpoint` with a per-request timeout.
        pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| ProtocolError::Transport(e.to_string()))?;
            Ok(Self {
                client,
                endpoint: endpoint.into(),
                timeout,
                max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            })
        }

        /// Refuse response bodies larger than `limit` bytes.
        pub fn with_max_response_bytes(mut self, limit: usize) -> Self {
            self.max_response_bytes = limit;
            self
        }

        pub fn endpoint(&self) -> &str {
            &self.endpoint
        }
    }

    #[async_trait]
    impl Authority for HttpAuthority {
        async fn request_access(&self, request: AccessRequest) -> Result<AccessResponse> {
            let response = self
                .client
                .post(&self.endpoint)
                .header(VERSION_HEADER, PROTOCOL_VERSION.to_string())
                .json(&request)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        ProtocolError::Timeout(self.timeout)
                    } else {
                        ProtocolError::Transport(e.to_string())
                    }
                })?;

            let status = response.status();
            let body = read_capped(response, self.max_response_bytes).await?;

            if status.is_success() {
                return serde_json::from_slice::<AccessResponse>(&body)
                    .map_err(|e| ProtocolError::MalformedResponse(e.to_string()));
            }

            let rejection = serde_json::from_slice::<AccessRejection>(&body).unwrap_or_else(|_| {
                AccessRejection::new(
                    RejectionCode::from_http_status(status.as_u16()),
                    format!("authority answered HTTP {status}"),
                )
            });
            tracing::warn!(
                endpoint = %self.endpoint,
                status = status.as_u16(),
                code = ?rejection.code,
                "authority rejected access request"
            );
            Err(rejection.into())
        }
    }

    /// Read the body, failing as soon as it passes `limit` bytes.
    async fn read_capped(mut response: reqwest::Response, limit: usize) -> Result<Vec<u8>> {
        let too_large =
            || ProtocolError::MalformedResponse(format!("body exceeds {limit} bytes"));
        if let Some(declared) = response.content_length() {
            if declared > limit as u64 {
                return Err(too_large());
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ProtocolError::Transport(e.to_string()))?
        {
            if body.len() + chunk.len() > limit {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}
