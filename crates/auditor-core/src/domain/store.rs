//! Run-scoped, append-only record stores keyed by criterion id.
//!
//! Parallel branches never write shared memory: each returns its own
//! [`CriterionMap`] and the orchestrator folds them together with
//! [`CriterionMap::merge`]. Merging concatenates per-key lists and never
//! overwrites, so it is associative, and commutative up to the order of
//! records within a key.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::evidence::Evidence;
use super::opinion::{Judge, Opinion};

/// Append-only mapping `criterion_id -> [record]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CriterionMap<T> {
    entries: BTreeMap<String, Vec<T>>,
}

impl<T> Default for CriterionMap<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

/// Evidence keyed by criterion.
pub type EvidenceMap = CriterionMap<Evidence>;

/// Opinions keyed by criterion.
pub type OpinionMap = CriterionMap<Opinion>;

impl<T> CriterionMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, criterion_id: impl Into<String>, record: T) {
        self.entries.entry(criterion_id.into()).or_default().push(record);
    }

    /// Records for a criterion, in insertion order.
    pub fn get(&self, criterion_id: &str) -> &[T] {
        self.entries
            .get(criterion_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// `true` when at least one record exists for the criterion.
    pub fn covers(&self, criterion_id: &str) -> bool {
        !self.get(criterion_id).is_empty()
    }

    /// Union merge by key: lists under the same key are concatenated,
    /// `self`'s records first.
    pub fn merge(&mut self, other: CriterionMap<T>) {
        for (key, records) in other.entries {
            self.entries.entry(key).or_default().extend(records);
        }
    }

    pub fn merged(mut self, other: CriterionMap<T>) -> Self {
        self.merge(other);
        self
    }

    pub fn criteria(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[T])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Total number of records across all criteria.
    pub fn record_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }
}

impl OpinionMap {
    /// Key each opinion by its own `criterion_id`.
    pub fn from_opinions(opinions: impl IntoIterator<Item = Opinion>) -> Self {
        let mut map = Self::new();
        for op in opinions {
            let key = op.criterion_id.clone();
            map.push(key, op);
        }
        map
    }

    pub fn has_opinion(&self, judge: Judge, criterion_id: &str) -> bool {
        self.get(criterion_id).iter().any(|op| op.judge == judge)
    }
}
