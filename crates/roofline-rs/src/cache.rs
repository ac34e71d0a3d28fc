//! Fingerprint-keyed memoization of roofline estimates.
//!
//! Entries are keyed by the query fingerprint together with the element width and channel
//! indexing, since [`RooflineKey`] covers shapes and strides only. The hardware profile is not
//! part of the key, so one cache should serve one profile.

use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Mutex;

use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::conv2d::{ChannelIndexing, Conv2dRoofline, CostEstimate};
use crate::error::RooflineError;
use crate::hashing::RooflineKey;

pub const DEFAULT_CACHE_SIZE: usize = 128;

/// Whether estimates are memoized, and how many.
///
/// Parsed from `off`, `lru` or `lru(cache=N)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    Off,
    Lru { cache_size: usize },
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy::Lru {
            cache_size: DEFAULT_CACHE_SIZE,
        }
    }
}

impl CachePolicy {
    pub fn build(self) -> Option<CostCache> {
        match self {
            CachePolicy::Off => None,
            CachePolicy::Lru { cache_size } => Some(CostCache::new(cache_size)),
        }
    }
}

impl FromStr for CachePolicy {
    type Err = RooflineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("off") || trimmed.eq_ignore_ascii_case("none") {
            return Ok(CachePolicy::Off);
        }

        if trimmed.eq_ignore_ascii_case("lru") {
            return Ok(CachePolicy::default());
        }

        if let Some(rest) = trimmed
            .strip_prefix("lru(")
            .and_then(|inner| inner.strip_suffix(')'))
        {
            let mut cache_size = DEFAULT_CACHE_SIZE;
            for part in rest.split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                if let Some(value) = part.strip_prefix("cache=") {
                    cache_size = value.trim().parse().map_err(|_| {
                        RooflineError::InvalidPolicy(format!("invalid cache size: {value}"))
                    })?;
                    if cache_size == 0 {
                        return Err(RooflineError::InvalidPolicy(
                            "cache size must be greater than zero".into(),
                        ));
                    }
                } else {
                    return Err(RooflineError::InvalidPolicy(format!("unknown lru option: {part}")));
                }
            }
            return Ok(CachePolicy::Lru { cache_size });
        }

        Err(RooflineError::InvalidPolicy(format!("unrecognised policy: {trimmed}")))
    }
}

impl std::fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CachePolicy::Off => f.write_str("off"),
            CachePolicy::Lru { cache_size } if *cache_size == DEFAULT_CACHE_SIZE => {
                f.write_str("lru")
            }
            CachePolicy::Lru { cache_size } => write!(f, "lru(cache={cache_size})"),
        }
    }
}

impl Serialize for CachePolicy {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CachePolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct EntryKey {
    fingerprint: RooflineKey,
    itemsize: usize,
    channel_indexing: ChannelIndexing,
}

impl EntryKey {
    fn of(roofline: &Conv2dRoofline) -> Self {
        EntryKey {
            fingerprint: roofline.key(),
            itemsize: roofline.query().itemsize(),
            channel_indexing: roofline.channel_indexing(),
        }
    }
}

/// Thread-safe LRU of estimates. The estimate itself is computed outside the lock.
pub struct CostCache {
    entries: Mutex<LruCache<EntryKey, CostEstimate>>,
}

impl CostCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        CostCache {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, roofline: &Conv2dRoofline) -> Option<CostEstimate> {
        self.lookup(EntryKey::of(roofline))
    }

    pub fn insert(&self, roofline: &Conv2dRoofline, estimate: CostEstimate) {
        self.store(EntryKey::of(roofline), estimate);
    }

    pub fn get_or_compute(&self, roofline: &Conv2dRoofline) -> CostEstimate {
        let entry = EntryKey::of(roofline);
        let key = entry.fingerprint;
        if let Some(cached) = self.lookup(entry) {
            tracing::trace!(%key, itemsize = entry.itemsize, "cost cache hit");
            return cached;
        }

        tracing::trace!(%key, itemsize = entry.itemsize, "cost cache miss");
        let estimate = roofline.compute();
        self.store(entry, estimate);
        estimate
    }

    fn lookup(&self, entry: EntryKey) -> Option<CostEstimate> {
        self.entries
            .lock()
            .expect("cost cache mutex poisoned")
            .get(&entry)
            .copied()
    }

    fn store(&self, entry: EntryKey, estimate: CostEstimate) {
        self.entries
            .lock()
            .expect("cost cache mutex poisoned")
            .put(entry, estimate);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cost cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries
            .lock()
            .expect("cost cache mutex poisoned")
            .cap()
            .get()
    }

    pub fn clear(&self) {
        self.entries.lock().expect("cost cache mutex poisoned").clear();
    }
}

impl Default for CostCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}
