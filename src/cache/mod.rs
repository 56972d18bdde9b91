//! Validator Cache for validus
//!
//! Compiled validators are cached under a structural key so repeated
//! validations against an unchanged schema skip recompilation entirely.
//!
//! # Design Principles
//!
//! - Keys are structural: two schemas with identical definitions and
//!   options share one entry regardless of identity
//! - Entries expire after a TTL; expiry is checked lazily on lookup
//! - When full, the oldest quarter of entries (by insertion order) is
//!   evicted to amortize the cost of making room

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::compiler::CompiledValidator;
use crate::schema::SchemaKind;

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default entry capacity.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Fraction of entries evicted when the cache is full.
pub const EVICT_FRACTION: f64 = 0.25;

/// Tuning knobs for [`ValidatorCache`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long an entry stays valid after insertion
    pub ttl: Duration,
    /// Maximum number of entries held at once
    pub capacity: usize,
    /// Fraction of entries evicted when capacity is reached
    pub evict_fraction: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            capacity: DEFAULT_CAPACITY,
            evict_fraction: EVICT_FRACTION,
        }
    }
}

/// Structural cache key: namespace kind plus content hashes of the
/// field definitions and the validation options they were compiled
/// under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Namespace the validator was compiled for
    pub kind: SchemaKind,
    /// Hash of the field definitions
    pub schema_hash: String,
    /// Hash of the compile-time options
    pub options_hash: String,
}

/// Hashes any serializable value into a short stable hex digest.
///
/// Field maps are ordered, so serialization is canonical and the digest
/// depends only on content.
pub fn structural_hash<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let encoded = serde_json::to_vec(value)?;
    let digest = Sha256::digest(&encoded);
    let mut hex = String::with_capacity(32);
    for byte in &digest[..16] {
        hex.push_str(&format!("{:02x}", byte));
    }
    Ok(hex)
}

struct CacheEntry {
    validator: Arc<CompiledValidator>,
    inserted_at: Instant,
    hits: u64,
}

/// TTL-bounded, capacity-bounded cache of compiled validators.
///
/// Not internally synchronized; the engine wraps it in a `Mutex`.
pub struct ValidatorCache {
    config: CacheConfig,
    entries: HashMap<CacheKey, CacheEntry>,
    insertion_order: VecDeque<CacheKey>,
}

impl ValidatorCache {
    /// Cache with default TTL and capacity.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Cache with explicit tuning, used by tests and embedders.
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
            insertion_order: VecDeque::new(),
        }
    }

    /// Looks up a validator, expiring the entry if its TTL has lapsed.
    pub fn lookup(&mut self, key: &CacheKey) -> Option<Arc<CompiledValidator>> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.inserted_at.elapsed() >= self.config.ttl,
            None => return None,
        };
        if expired {
            self.entries.remove(key);
            self.insertion_order.retain(|queued| queued != key);
            return None;
        }
        let entry = self.entries.get_mut(key)?;
        entry.hits += 1;
        Some(Arc::clone(&entry.validator))
    }

    /// Inserts a validator, evicting the oldest quarter of entries first
    /// if the cache is full. Returns how many entries were evicted.
    pub fn insert(&mut self, key: CacheKey, validator: Arc<CompiledValidator>) -> usize {
        let mut evicted = 0;
        if !self.entries.contains_key(&key) && self.entries.len() >= self.config.capacity {
            evicted = self.evict_oldest();
        }
        if self.entries.contains_key(&key) {
            self.insertion_order.retain(|queued| queued != &key);
        }
        self.insertion_order.push_back(key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                validator,
                inserted_at: Instant::now(),
                hits: 0,
            },
        );
        evicted
    }

    fn evict_oldest(&mut self) -> usize {
        let target = ((self.entries.len() as f64) * self.config.evict_fraction).ceil() as usize;
        let target = target.max(1);
        let mut evicted = 0;
        while evicted < target {
            let Some(oldest) = self.insertion_order.pop_front() else {
                break;
            };
            if self.entries.remove(&oldest).is_some() {
                evicted += 1;
            }
        }
        evicted
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total hits recorded against the given key, for diagnostics.
    pub fn hits(&self, key: &CacheKey) -> u64 {
        self.entries.get(key).map(|entry| entry.hits).unwrap_or(0)
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.insertion_order.clear();
    }
}

impl Default for ValidatorCache {
    fn default() -> Self {
        Self::new()
    }
}
