//! In-memory entry store backed by DashMap
//!
//! One entry per key, typed as either a string or a sorted set, with an
//! optional expiry instant. Expiry is enforced lazily: every access runs
//! the expired check first and purges on observation, so correctness never
//! depends on the background sweeper.

use crate::error::CommandError;
use crate::storage::zset::SortedSet;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Value types supported by scorekv
#[derive(Debug, Clone)]
pub enum ValueType {
    String(String),
    SortedSet(SortedSet),
}

impl ValueType {
    pub fn type_name(&self) -> &'static str {
        match self {
            ValueType::String(_) => "string",
            ValueType::SortedSet(_) => "zset",
        }
    }
}

/// Stored entry: the value plus an optional absolute expiry instant.
/// `None` means the key never expires.
#[derive(Debug, Clone)]
pub struct StoredValue {
    pub value: ValueType,
    pub expires_at: Option<Instant>,
}

impl StoredValue {
    pub fn new(value: ValueType) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|deadline| Instant::now() >= deadline)
    }

    pub fn set_expiration(&mut self, expires_at: Instant) {
        self.expires_at = Some(expires_at);
    }

    pub fn clear_expiration(&mut self) {
        self.expires_at = None;
    }

    /// Remaining lifetime in whole milliseconds, rounded up so a key given
    /// a 1000 ms TTL reports 1000 when queried immediately. `None` when no
    /// TTL is set; `Some(v)` with `v <= 0` when already past the deadline.
    pub fn remaining_millis(&self) -> Option<i64> {
        self.expires_at.map(|deadline| {
            let now = Instant::now();
            if deadline <= now {
                0
            } else {
                let nanos = (deadline - now).as_nanos();
                ((nanos + 999_999) / 1_000_000) as i64
            }
        })
    }
}

/// Concurrent in-memory store shared by all connections.
///
/// The main map owns every entry; `expiration_index` mirrors only the keys
/// that carry a deadline so the sweeper can scan candidates cheaply.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: DashMap<String, StoredValue>,
    expiration_index: DashMap<String, Instant>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Create or overwrite `key` as a string entry. A full replace: any
    /// previous value and TTL are discarded.
    pub fn set(&self, key: &str, value: String) {
        self.expiration_index.remove(key);
        self.data
            .insert(key.to_string(), StoredValue::new(ValueType::String(value)));
    }

    /// String value of an unexpired string-typed key.
    pub fn get(&self, key: &str) -> Result<Option<String>, CommandError> {
        if self.purge_if_expired(key) {
            return Ok(None);
        }
        match self.data.get(key) {
            Some(entry) => match &entry.value {
                ValueType::String(s) => Ok(Some(s.clone())),
                ValueType::SortedSet(_) => Err(CommandError::wrong_type()),
            },
            None => Ok(None),
        }
    }

    /// Remove a key outright. Returns `true` if an unexpired entry existed.
    pub fn del(&self, key: &str) -> bool {
        if self.purge_if_expired(key) {
            return false;
        }
        self.expiration_index.remove(key);
        self.data.remove(key).is_some()
    }

    pub fn exists(&self, key: &str) -> bool {
        !self.purge_if_expired(key) && self.data.contains_key(key)
    }

    /// Set `expires_at = now + millis` on an existing key. Returns `true`
    /// if the key existed (and the TTL was applied). A non-positive TTL
    /// expires the key immediately.
    pub fn pexpire(&self, key: &str, millis: i64) -> bool {
        if self.purge_if_expired(key) {
            return false;
        }
        if millis <= 0 {
            self.expiration_index.remove(key);
            return self.data.remove(key).is_some();
        }

        let Some(mut entry) = self.data.get_mut(key) else {
            return false;
        };
        let deadline = Instant::now() + Duration::from_millis(millis as u64);
        entry.set_expiration(deadline);
        drop(entry);
        self.expiration_index.insert(key.to_string(), deadline);
        true
    }

    /// Remaining TTL in milliseconds: `-2` if the key is missing or
    /// expired, `-1` if it exists without a TTL, otherwise the remaining
    /// time rounded up to a whole millisecond.
    pub fn pttl(&self, key: &str) -> i64 {
        if self.purge_if_expired(key) {
            return -2;
        }
        let Some(entry) = self.data.get(key) else {
            return -2;
        };
        match entry.remaining_millis() {
            None => -1,
            Some(ms) if ms <= 0 => {
                drop(entry);
                self.purge_if_expired(key);
                -2
            }
            Some(ms) => ms,
        }
    }

    /// Insert a member into the sorted set at `key`, creating the entry on
    /// first touch. Returns `true` if the member is new, `false` if an
    /// existing member's score was updated.
    pub fn zadd(&self, key: &str, member: &str, score: f64) -> Result<bool, CommandError> {
        match self.data.entry(key.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired() {
                    // Dead entry observed in place: start over as a fresh set
                    self.expiration_index.remove(key);
                    let mut set = SortedSet::new();
                    set.insert(member, score);
                    occupied.insert(StoredValue::new(ValueType::SortedSet(set)));
                    return Ok(true);
                }
                match &mut occupied.get_mut().value {
                    ValueType::SortedSet(set) => Ok(set.insert(member, score)),
                    ValueType::String(_) => Err(CommandError::wrong_type()),
                }
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let mut set = SortedSet::new();
                set.insert(member, score);
                vacant.insert(StoredValue::new(ValueType::SortedSet(set)));
                Ok(true)
            }
        }
    }

    /// Score of `member` in the sorted set at `key`; `None` when the key
    /// or member is absent.
    pub fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>, CommandError> {
        if self.purge_if_expired(key) {
            return Ok(None);
        }
        match self.data.get(key) {
            Some(entry) => match &entry.value {
                ValueType::SortedSet(set) => Ok(set.score(member)),
                ValueType::String(_) => Err(CommandError::wrong_type()),
            },
            None => Ok(None),
        }
    }

    /// Remove `member` from the sorted set at `key`. Removing the last
    /// member deletes the entry entirely.
    pub fn zrem(&self, key: &str, member: &str) -> Result<bool, CommandError> {
        if self.purge_if_expired(key) {
            return Ok(false);
        }
        let Some(mut entry) = self.data.get_mut(key) else {
            return Ok(false);
        };
        let (removed, now_empty) = match &mut entry.value {
            ValueType::SortedSet(set) => (set.remove(member), set.is_empty()),
            ValueType::String(_) => return Err(CommandError::wrong_type()),
        };
        drop(entry);

        if removed && now_empty {
            self.expiration_index.remove(key);
            self.data.remove(key);
        }
        Ok(removed)
    }

    /// Cardinality of the sorted set at `key`; 0 for a missing key.
    pub fn zcard(&self, key: &str) -> Result<usize, CommandError> {
        if self.purge_if_expired(key) {
            return Ok(0);
        }
        match self.data.get(key) {
            Some(entry) => match &entry.value {
                ValueType::SortedSet(set) => Ok(set.len()),
                ValueType::String(_) => Err(CommandError::wrong_type()),
            },
            None => Ok(0),
        }
    }

    /// Ordered range scan from `(score, member)` with skip/limit. A missing
    /// or wrong-typed key yields an empty sequence, never an error: the
    /// range contract is "elements at or after the seek point", and a key
    /// with no sorted set has none.
    pub fn zquery(
        &self,
        key: &str,
        score: f64,
        member: &str,
        offset: u64,
        limit: u64,
    ) -> Vec<(String, f64)> {
        if self.purge_if_expired(key) {
            return Vec::new();
        }
        match self.data.get(key) {
            Some(entry) => match &entry.value {
                ValueType::SortedSet(set) => set.range_from(score, member, offset, limit),
                ValueType::String(_) => Vec::new(),
            },
            None => Vec::new(),
        }
    }

    /// Drop every key. Test and admin helper.
    pub fn clear(&self) {
        self.data.clear();
        self.expiration_index.clear();
    }

    /// Purge keys whose deadline has passed. Called by the background
    /// sweeper; returns the number of keys removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let candidates: Vec<String> = self
            .expiration_index
            .iter()
            .filter(|entry| *entry.value() <= now)
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for key in candidates {
            if self.purge_if_expired(&key) {
                removed += 1;
            }
        }
        removed
    }

    /// Shared lazy-expiry check: if the key's deadline has passed, remove
    /// it and report `true`. The read guard is released before removal.
    fn purge_if_expired(&self, key: &str) -> bool {
        let expired = match self.data.get(key) {
            Some(entry) => entry.is_expired(),
            None => false,
        };
        if expired {
            self.expiration_index.remove(key);
            self.data.remove(key);
        }
        expired
    }
}
