//! Seed management for reproducible, independent fold assignments.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Component name for the outer splitter of a nested search.
pub const OUTER: &str = "outer";
/// Component name for the inner splitters of a nested search.
pub const INNER: &str = "inner";

/// Derives per-component seeds from one run seed.
///
/// Each `(component, index)` pair maps to its own stream, so the outer
/// splitter and every inner splitter draw from unrelated generators even
/// though the caller only supplied a single seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedManager {
    pub global_seed: u64,
}

impl SeedManager {
    pub fn new(global_seed: u64) -> Self {
        Self { global_seed }
    }

    pub fn seed_for(&self, component: &str, index: u64) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(self.global_seed.to_le_bytes());
        hasher.update(component.as_bytes());
        hasher.update(b"\0");
        hasher.update(index.to_le_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(bytes)
    }
}
