//! Wallet configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use clearance_core::IndexConfig;
use clearance_protocol::AccessConfig;
use clearance_store::CacheConfig;
use clearance_trust::TrustAnchor;

/// Configuration for a [`crate::Wallet`].
///
/// Everything but the trust anchor has a default, so a host can load this
/// from JSON with only `trust_anchor` set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// The pinned credential issuer.
    pub trust_anchor: TrustAnchor,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Sizing of the local document catalog index.
    #[serde(default)]
    pub index: IndexConfig,
    /// Default bound for [`crate::Wallet::wait_for_session`].
    #[serde(default = "default_readiness_timeout")]
    pub readiness_timeout: Duration,
}

fn default_readiness_timeout() -> Duration {
    Duration::from_secs(10)
}

impl WalletConfig {
    pub fn new(trust_anchor: TrustAnchor) -> Self {
        Self {
            trust_anchor,
            access: AccessConfig::default(),
            cache: CacheConfig::default(),
            index: IndexConfig::default(),
            readiness_timeout: default_readiness_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clearance_core::Did;
    use clearance_store::MaxViews;

    #[test]
    fn test_minimal_json() {
        let json = r#"{"trust_anchor":{"issuer":"did:web:authority"}}"#;
        let config: WalletConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config,
            WalletConfig::new(TrustAnchor::new(Did::parse("did:web:authority").unwrap()))
        );
        assert_eq!(config.access.request_timeout, Duration::from_secs(30));
        assert_eq!(config.access.max_clock_skew, Duration::from_secs(300));
        assert_eq!(config.cache.default_ttl, Duration::from_secs(86_400));
        assert_eq!(config.cache.default_max_views, MaxViews::Unlimited);
        assert_eq!(config.index.size_bits, 1024);
        assert_eq!(config.index.hash_count, 3);
        assert_eq!(config.readiness_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_partial_override() {
        let json = r#"{
            "trust_anchor": {"issuer": "did:web:authority"},
            "cache": {"default_max_views": 3},
            "readiness_timeout": {"secs": 1, "nanos": 0}
        }"#;
        let config: WalletConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.cache.default_max_views, MaxViews::Limited(3));
        assert_eq!(config.cache.default_ttl, Duration::from_secs(86_400));
        assert_eq!(config.readiness_timeout, Duration::from_secs(1));
    }
}
