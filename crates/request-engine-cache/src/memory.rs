//! The memory tier: a bounded, synchronous, no-I/O map with priority+LRU
//! eviction (§4.3 "Eviction policy (memory)").

use std::collections::HashMap;
use std::time::SystemTime;

use crate::entry::CacheEntry;

/// In-memory store. All operations are synchronous and cheap; the caller
/// (`CacheStore`) is responsible for holding the memory lock for the
/// duration of a call and releasing it before touching the disk tier.
pub(crate) struct MemoryTier {
    entries: HashMap<String, CacheEntry>,
    used_bytes: u64,
    max_bytes: u64,
}

/// An entry evicted to make room, returned so the caller can clean up the
/// tag index for it.
pub(crate) struct Evicted {
    pub key: String,
}

impl MemoryTier {
    pub(crate) fn new(max_bytes: u64) -> Self {
        Self {
            entries: HashMap::new(),
            used_bytes: 0,
            max_bytes,
        }
    }

    pub(crate) fn used_bytes(&self) -> u64 {
        self.used_bytes
    }

    pub(crate) fn get(&mut self, key: &str, now: SystemTime) -> Option<CacheEntry> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => return None,
        };
        if expired {
            self.remove(key);
            return None;
        }
        let entry = self.entries.get_mut(key).expect("checked above");
        entry.touch(now);
        Some(entry.clone())
    }

    /// Peeks without updating access metadata or treating expiry as removal
    /// (used by the expiry sweep, which removes explicitly).
    pub(crate) fn peek_expired_keys(&self, now: SystemTime) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.used_bytes = self.used_bytes.saturating_sub(entry.size());
        Some(entry)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.used_bytes = 0;
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts `entry`, evicting lowest-(priority, last_accessed_at) entries
    /// first if the insertion would push usage over `max_bytes`, down to 80%
    /// of the cap (§4.3). The entry being inserted is never evicted in the
    /// same operation. Returns the keys evicted, in eviction order.
    pub(crate) fn insert(&mut self, entry: CacheEntry) -> Vec<Evicted> {
        let key = entry.key.clone();
        let incoming_size = entry.size();

        // Replacing an existing entry first frees its old bytes so the
        // eviction threshold is computed against the net change.
        if let Some(old) = self.entries.remove(&key) {
            self.used_bytes = self.used_bytes.saturating_sub(old.size());
        }

        let mut evicted = Vec::new();
        if self.max_bytes > 0 && self.used_bytes + incoming_size > self.max_bytes {
            // Evict until the projected total (existing + the entry about to
            // be inserted) is at or under 80% of the cap, not just the
            // existing total — the incoming entry's own size counts against
            // the threshold it's about to push past (§8 S5).
            let target = (self.max_bytes * 8) / 10;
            let mut candidates: Vec<(String, request_engine_core::Priority, SystemTime)> = self
                .entries
                .iter()
                .map(|(k, e)| (k.clone(), e.priority, e.last_accessed_at))
                .collect();
            candidates.sort_by(|a, b| a.1.cmp(&b.1).then(a.2.cmp(&b.2)));

            for (candidate_key, _, _) in candidates {
                if self.used_bytes + incoming_size <= target {
                    break;
                }
                if self.remove(&candidate_key).is_some() {
                    evicted.push(Evicted { key: candidate_key });
                }
            }
        }

        self.used_bytes += incoming_size;
        self.entries.insert(key, entry);
        evicted
    }
}
