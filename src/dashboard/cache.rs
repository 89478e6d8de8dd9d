//! Keyed stale-while-revalidate store
//!
//! Entries are keyed by `(namespace, address)`. A load against a key is
//! started with `begin_revalidation` (skipped when one is already in flight)
//! or `begin_mutation` (always runs), and finished with `settle`. Stale data
//! stays readable while a load is in flight and after a failed load.

use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

use super::Address;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Dashboard,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Dashboard => "dashboard",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub namespace: Namespace,
    pub address: Address,
}

impl CacheKey {
    pub fn dashboard(address: Address) -> Self {
        Self {
            namespace: Namespace::Dashboard,
            address,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace.as_str(), self.address)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    Revalidation,
    Mutation,
}

/// Handle for one in-flight load; hand it back to `settle`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub key: CacheKey,
    pub kind: LoadKind,
    seq: u64,
    // generation of the entry the load was started against
    generation: u64,
}

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: Option<T>,
    pub error: Option<String>,
    in_flight: u32,
    // sequence number of the most recent mutation started on this key
    last_mutation: u64,
    // sequence number at creation; a cleared and re-created key gets a new one
    generation: u64,
}

impl<T> CacheEntry<T> {
    fn new(generation: u64) -> Self {
        Self {
            data: None,
            error: None,
            in_flight: 0,
            last_mutation: 0,
            generation,
        }
    }

    pub fn is_validating(&self) -> bool {
        self.in_flight > 0
    }
}

pub struct RevalidationCache<T> {
    entries: HashMap<CacheKey, CacheEntry<T>>,
    seq: u64,
}

impl<T> Default for RevalidationCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            seq: 0,
        }
    }
}

impl<T> RevalidationCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, key: &CacheKey) -> Option<&CacheEntry<T>> {
        self.entries.get(key)
    }

    /// Start an ordinary refetch. Returns `None` when a load for the key is
    /// already in flight.
    pub fn begin_revalidation(&mut self, key: &CacheKey) -> Option<Ticket> {
        let seq = self.next_seq();
        let entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::new(seq));
        if entry.is_validating() {
            debug!(key = %key, "Revalidation already in flight");
            return None;
        }
        entry.in_flight += 1;
        Some(Ticket {
            key: key.clone(),
            kind: LoadKind::Revalidation,
            seq,
            generation: entry.generation,
        })
    }

    /// Start an explicit invalidate-and-refetch. Any revalidation already in
    /// flight for the key will be discarded when it settles.
    pub fn begin_mutation(&mut self, key: &CacheKey) -> Ticket {
        let seq = self.next_seq();
        let entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::new(seq));
        entry.in_flight += 1;
        entry.last_mutation = seq;
        Ticket {
            key: key.clone(),
            kind: LoadKind::Mutation,
            seq,
            generation: entry.generation,
        }
    }

    /// Record the outcome of a load. Returns whether the outcome was applied.
    pub fn settle(&mut self, ticket: Ticket, outcome: Result<T, String>) -> bool {
        let Some(entry) = self.entries.get_mut(&ticket.key) else {
            debug!(key = %ticket.key, "Load settled for a cleared key");
            return false;
        };
        if entry.generation != ticket.generation {
            debug!(key = %ticket.key, "Discarding load started before the key was cleared");
            return false;
        }
        entry.in_flight = entry.in_flight.saturating_sub(1);

        if ticket.seq < entry.last_mutation {
            warn!(key = %ticket.key, "Discarding load that started before the latest mutation");
            return false;
        }

        match outcome {
            Ok(data) => {
                entry.data = Some(data);
                entry.error = None;
            }
            Err(error) => {
                entry.error = Some(error);
            }
        }
        true
    }

    pub fn clear(&mut self, key: &CacheKey) {
        self.entries.remove(key);
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::fixtures::address;

    fn key() -> CacheKey {
        CacheKey::dashboard(address())
    }

    #[test]
    fn test_key_display() {
        assert_eq!(
            key().to_string(),
            "dashboard:0x000000000000000000000000000000000000dEaD"
        );
    }

    #[test]
    fn test_revalidation_roundtrip() {
        let mut cache: RevalidationCache<u32> = RevalidationCache::new();
        assert!(cache.entry(&key()).is_none());

        let ticket = cache.begin_revalidation(&key()).unwrap();
        assert!(cache.entry(&key()).unwrap().is_validating());

        assert!(cache.settle(ticket, Ok(7)));
        let entry = cache.entry(&key()).unwrap();
        assert!(!entry.is_validating());
        assert_eq!(entry.data, Some(7));
        assert!(entry.error.is_none());
    }

    #[test]
    fn test_revalidations_are_deduplicated() {
        let mut cache: RevalidationCache<u32> = RevalidationCache::new();
        let first = cache.begin_revalidation(&key());
        assert!(first.is_some());
        assert!(cache.begin_revalidation(&key()).is_none());

        cache.settle(first.unwrap(), Ok(1));
        assert!(cache.begin_revalidation(&key()).is_some());
    }

    #[test]
    fn test_error_keeps_stale_data() {
        let mut cache: RevalidationCache<u32> = RevalidationCache::new();
        let ticket = cache.begin_revalidation(&key()).unwrap();
        cache.settle(ticket, Ok(1));

        let ticket = cache.begin_revalidation(&key()).unwrap();
        cache.settle(ticket, Err("down".to_string()));

        let entry = cache.entry(&key()).unwrap();
        assert_eq!(entry.data, Some(1));
        assert_eq!(entry.error.as_deref(), Some("down"));

        let ticket = cache.begin_mutation(&key());
        cache.settle(ticket, Ok(2));
        let entry = cache.entry(&key()).unwrap();
        assert_eq!(entry.data, Some(2));
        assert!(entry.error.is_none());
    }

    #[test]
    fn test_mutation_wins_over_older_revalidation() {
        let mut cache: RevalidationCache<u32> = RevalidationCache::new();
        let old = cache.begin_revalidation(&key()).unwrap();
        let mutation = cache.begin_mutation(&key());
        assert_eq!(mutation.kind, LoadKind::Mutation);

        assert!(cache.settle(mutation, Ok(2)));
        assert!(cache.entry(&key()).unwrap().is_validating());

        // The revalidation started before the mutation; its result is stale
        assert!(!cache.settle(old, Ok(1)));
        let entry = cache.entry(&key()).unwrap();
        assert_eq!(entry.data, Some(2));
        assert!(!entry.is_validating());
    }

    #[test]
    fn test_keys_are_independent() {
        let mut cache: RevalidationCache<u32> = RevalidationCache::new();
        let other = CacheKey::dashboard(
            Address::parse("0x1111111111111111111111111111111111111111").unwrap(),
        );

        let a = cache.begin_revalidation(&key()).unwrap();
        let b = cache.begin_revalidation(&other).unwrap();
        cache.settle(b, Ok(9));
        assert!(cache.entry(&key()).unwrap().data.is_none());
        cache.settle(a, Ok(3));
        assert_eq!(cache.entry(&other).unwrap().data, Some(9));
    }

    #[test]
    fn test_settle_after_clear_is_ignored() {
        let mut cache: RevalidationCache<u32> = RevalidationCache::new();
        let ticket = cache.begin_revalidation(&key()).unwrap();
        cache.clear(&key());
        assert!(!cache.settle(ticket, Ok(1)));
        assert!(cache.entry(&key()).is_none());
    }

    #[test]
    fn test_load_from_before_clear_leaves_recreated_entry_alone() {
        let mut cache: RevalidationCache<u32> = RevalidationCache::new();
        let old = cache.begin_revalidation(&key()).unwrap();
        cache.clear(&key());
        let new = cache.begin_revalidation(&key()).unwrap();

        assert!(!cache.settle(old, Ok(1)));
        let entry = cache.entry(&key()).unwrap();
        assert!(entry.is_validating());
        assert!(entry.data.is_none());
        assert!(cache.begin_revalidation(&key()).is_none());

        assert!(cache.settle(new, Ok(2)));
        let entry = cache.entry(&key()).unwrap();
        assert!(!entry.is_validating());
        assert_eq!(entry.data, Some(2));
    }
}
