//! Sorted-set index: unique member names with float scores, ordered by
//! `(score, member)`
//!
//! Two structures are kept in lockstep: a member→score map for point
//! lookups and a `BTreeMap` keyed on the composite `(score, member)` for
//! ordered range scans. Every mutation updates both under the caller's
//! entry guard, so readers never observe one index ahead of the other.

use ordered_float::OrderedFloat;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default)]
pub struct SortedSet {
    by_member: HashMap<String, f64>,
    by_score: BTreeMap<(OrderedFloat<f64>, String), ()>,
}

impl SortedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a member or update its score in place. Returns `true` when
    /// the member is new, `false` when an existing member's score was
    /// updated (cardinality unchanged either way in the update case).
    ///
    /// Callers must reject NaN before reaching the index.
    pub fn insert(&mut self, member: &str, score: f64) -> bool {
        debug_assert!(!score.is_nan());

        if let Some(&old_score) = self.by_member.get(member) {
            if old_score != score {
                self.by_score
                    .remove(&(OrderedFloat(old_score), member.to_string()));
                self.by_score
                    .insert((OrderedFloat(score), member.to_string()), ());
                self.by_member.insert(member.to_string(), score);
            }
            false
        } else {
            self.by_member.insert(member.to_string(), score);
            self.by_score
                .insert((OrderedFloat(score), member.to_string()), ());
            true
        }
    }

    pub fn score(&self, member: &str) -> Option<f64> {
        self.by_member.get(member).copied()
    }

    /// Remove a member. Returns `true` if it was present.
    pub fn remove(&mut self, member: &str) -> bool {
        match self.by_member.remove(member) {
            Some(score) => {
                self.by_score
                    .remove(&(OrderedFloat(score), member.to_string()));
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.by_member.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_member.is_empty()
    }

    /// Ordered range scan: seek to the first element whose composite key is
    /// `>= (score, member)`, skip `offset` elements, then yield up to
    /// `limit` elements in ascending `(score, member)` order.
    ///
    /// The seek descends the tree directly; large offsets skip without
    /// re-scanning from the start of the set.
    pub fn range_from(
        &self,
        score: f64,
        member: &str,
        offset: u64,
        limit: u64,
    ) -> Vec<(String, f64)> {
        let lower = (OrderedFloat(score), member.to_string());
        self.by_score
            .range(lower..)
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .map(|((s, m), ())| (m.clone(), s.into_inner()))
            .collect()
    }
}
