//! Order-sensitive fingerprints for memoizing cost queries.
//!
//! Values are folded with the golden-ratio combinator popularised by `boost::hash_combine`.
//! Integers hash to themselves, so fingerprints are stable across processes and toolchains,
//! unlike `std::collections::hash_map::DefaultHasher`.

use serde::{Deserialize, Serialize};

const GOLDEN_RATIO: u64 = 0x9e37_79b9;

/// Folds every value of `values` into `seed`, in order.
pub fn hash_combine<I>(mut seed: u64, values: I) -> u64
where
    I: IntoIterator<Item = i64>,
{
    for value in values {
        seed ^= (value as u64)
            .wrapping_add(GOLDEN_RATIO)
            .wrapping_add(seed << 6)
            .wrapping_add(seed >> 2);
    }
    seed
}

/// Fingerprint of a roofline query; used as a memoization key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RooflineKey(u64);

impl RooflineKey {
    pub const fn from_u64(value: u64) -> Self {
        RooflineKey(value)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RooflineKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Incremental builder over [`hash_combine`], starting from a zero seed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerprintHasher {
    seed: u64,
}

impl FingerprintHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_i64s(&mut self, values: &[i64]) {
        self.seed = hash_combine(self.seed, values.iter().copied());
    }

    pub fn write_usizes(&mut self, values: &[usize]) {
        self.seed = hash_combine(self.seed, values.iter().map(|&v| v as i64));
    }

    pub fn finish(self) -> RooflineKey {
        RooflineKey(self.seed)
    }
}
