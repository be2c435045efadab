//! Utility endpoints used to exercise caching, pagination and error paths.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::cache::{DEFAULT_TTL, TtlCache};
use crate::pagination::Identified;

/// Cache namespace for random values.
pub const RANDOM_PREFIX: &str = "rnd:";

// Low 53 bits of a v4 UUID carry no version or variant bits.
const MANTISSA_MASK: u64 = (1 << 53) - 1;

/// Uniform sample from `[0, 1)`.
pub fn random_unit() -> f64 {
    let bits = Uuid::new_v4().as_u128() as u64 & MANTISSA_MASK;
    bits as f64 / (1u64 << 53) as f64
}

/// Result of one `compute` call, cached per query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomValue {
    pub q: String,
    pub value: f64,
    pub hits: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    pub name: String,
    pub value: u32,
}

impl Identified for Item {
    fn id(&self) -> u64 {
        self.id
    }
}

/// `count` items with ids `1..=count` and random values in `1..=1000`.
pub fn synthetic_items(count: u64) -> Vec<Item> {
    (1..=count)
        .map(|id| Item {
            id,
            name: format!("Item {id}"),
            value: (random_unit() * 1000.0) as u32 + 1,
        })
        .collect()
}

pub struct DemoService {
    hits: AtomicU64,
    cache: TtlCache<RandomValue>,
    cache_ttl: Duration,
}

impl Default for DemoService {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl DemoService {
    pub fn new(cache_ttl: Duration) -> Self {
        Self {
            hits: AtomicU64::new(0),
            cache: TtlCache::new(),
            cache_ttl,
        }
    }

    /// Draws a fresh random value and bumps the hit counter.
    pub fn compute(&self, q: &str) -> RandomValue {
        let hits = self.hits.fetch_add(1, Ordering::Relaxed) + 1;
        RandomValue {
            q: q.to_owned(),
            value: random_unit(),
            hits,
        }
    }

    /// Cached [`compute`](Self::compute): repeats for the same `q` return the
    /// stored value until it expires.
    pub fn random(&self, q: &str) -> RandomValue {
        let key = format!("{RANDOM_PREFIX}{q}");
        if let Some(cached) = self.cache.get(&key) {
            debug!(key, "cache hit");
            return cached;
        }
        let fresh = self.compute(q);
        self.cache.set(key, fresh.clone(), self.cache_ttl);
        fresh
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn reset_hits(&self) {
        self.hits.store(0, Ordering::Relaxed);
    }

    /// Drops every cached random value.
    pub fn clear_cache(&self) -> usize {
        self.cache.clear_by_prefix(RANDOM_PREFIX)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}
