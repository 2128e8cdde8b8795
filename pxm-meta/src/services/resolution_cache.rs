//! In-process cache of resolved reference entities, keyed by slug
//!
//! Entities never change after creation, so entries are never invalidated;
//! the optional TTL only bounds memory.

use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CachedEntry<E> {
    value: E,
    stored_at: Instant,
}

/// Slug-keyed entity cache
#[derive(Debug)]
pub struct ResolutionCache<E> {
    entries: Option<DashMap<String, CachedEntry<E>>>,
    ttl: Option<Duration>,
}

impl<E: Clone> ResolutionCache<E> {
    /// Cache with optional entry lifetime
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: Some(DashMap::new()),
            ttl,
        }
    }

    /// Cache that never stores anything
    pub fn disabled() -> Self {
        Self {
            entries: None,
            ttl: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    pub fn get(&self, slug: &str) -> Option<E> {
        let entries = self.entries.as_ref()?;

        {
            let entry = entries.get(slug)?;
            let fresh = self.ttl.map_or(true, |ttl| entry.stored_at.elapsed() < ttl);
            if fresh {
                return Some(entry.value.clone());
            }
        }

        // Ref dropped above; removing while holding it would deadlock the shard
        entries.remove(slug);
        None
    }

    pub fn set(&self, slug: &str, value: E) {
        if let Some(entries) = &self.entries {
            entries.insert(
                slug.to_string(),
                CachedEntry {
                    value,
                    stored_at: Instant::now(),
                },
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Some(entries) = &self.entries {
            entries.clear();
        }
    }
}
