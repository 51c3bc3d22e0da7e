//! Privacy-preserving document index.
//!
//! A Bloom filter over document identifiers and tags. Each of the k bit
//! positions comes from a different digest (SHA-256, SHA-512, BLAKE3),
//! reduced mod m. There is no deletion.
//!
//! A positive answer only means "maybe present". Callers must still run the
//! classification policy before revealing anything.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

use crate::error::CoreError;

/// Maximum number of hash functions (one per digest family).
pub const MAX_HASH_COUNT: usize = 3;

/// Bloom filter sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Number of bits (m).
    pub size_bits: usize,
    /// Number of hash functions (k), at most 3.
    pub hash_count: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            size_bits: 1024,
            hash_count: 3,
        }
    }
}

impl IndexConfig {
    /// Theoretical false-positive rate after `n` insertions:
    /// `(1 - e^(-kn/m))^k`.
    pub fn expected_false_positive_rate(&self, n: usize) -> f64 {
        let k = self.hash_count as f64;
        let m = self.size_bits as f64;
        (1.0 - (-k * n as f64 / m).exp()).powf(k)
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.size_bits == 0 {
            return Err(CoreError::InvalidIndexParameters(
                "size_bits must be positive".into(),
            ));
        }
        if self.hash_count == 0 || self.hash_count > MAX_HASH_COUNT {
            return Err(CoreError::InvalidIndexParameters(format!(
                "hash_count must be between 1 and {MAX_HASH_COUNT}, got {}",
                self.hash_count
            )));
        }
        Ok(())
    }
}

/// Bloom-filter membership index.
///
/// Inserts take the write lock for the whole set of bits, so a concurrent
/// query never observes a partially inserted item.
#[derive(Debug)]
pub struct PrivacyIndex {
    config: IndexConfig,
    words: RwLock<Vec<u64>>,
}

impl Default for PrivacyIndex {
    fn default() -> Self {
        Self {
            config: IndexConfig::default(),
            words: RwLock::new(vec![0; IndexConfig::default().size_bits.div_ceil(64)]),
        }
    }
}

impl PrivacyIndex {
    /// Create an empty index with the given sizing.
    pub fn new(config: IndexConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            config,
            words: RwLock::new(vec![0; config.size_bits.div_ceil(64)]),
        })
    }

    /// The sizing in use.
    pub fn config(&self) -> IndexConfig {
        self.config
    }

    /// Add an item.
    pub fn insert(&self, item: &str) {
        let positions = self.positions(item);
        let mut words = self.words.write();
        for pos in positions.iter().take(self.config.hash_count) {
            words[pos / 64] |= 1 << (pos % 64);
        }
    }

    /// True iff all k bits for the item are set.
    pub fn query(&self, item: &str) -> bool {
        let positions = self.positions(item);
        let words = self.words.read();
        positions
            .iter()
            .take(self.config.hash_count)
            .all(|pos| words[pos / 64] & (1 << (pos % 64)) != 0)
    }

    /// Number of set bits.
    pub fn bits_set(&self) -> usize {
        self.words.read().iter().map(|w| w.count_ones() as usize).sum()
    }

    fn positions(&self, item: &str) -> [usize; MAX_HASH_COUNT] {
        let bytes = item.as_bytes();
        let m = self.config.size_bits as u64;
        let reduce = |digest: &[u8]| -> usize {
            let mut head = [0u8; 8];
            head.copy_from_slice(&digest[..8]);
            (u64::from_be_bytes(head) % m) as usize
        };
        [
            reduce(&Sha256::digest(bytes)),
            reduce(&Sha512::digest(bytes)),
            reduce(blake3::hash(bytes).as_bytes()),
        ]
    }
}
