//! Same-day deduplication.
//!
//! A traveller who crosses the border several times on one day made one
//! outbound trip for counting purposes. [`EventSet`] keeps at most one entry
//! per calendar day; the order records appear in the document is irrelevant.

use crate::pipeline::extract::RawDate;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::btree_set::{self, BTreeSet};

/// Deduplicated outbound dates, ordered ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventSet(BTreeSet<RawDate>);

impl EventSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a date. Returns `false` when the day was already present.
    pub fn insert(&mut self, date: RawDate) -> bool {
        self.0.insert(date)
    }

    pub fn contains(&self, date: &RawDate) -> bool {
        self.0.contains(date)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, RawDate> {
        self.0.iter()
    }

    pub fn first(&self) -> Option<RawDate> {
        self.0.first().copied()
    }

    pub fn last(&self) -> Option<RawDate> {
        self.0.last().copied()
    }

    /// Calendar years touched by at least one event.
    pub fn calendar_years(&self) -> BTreeSet<i32> {
        self.0.iter().map(|d| d.year()).collect()
    }

    /// Keep only the dates for which `keep` returns `true`.
    pub fn retain(&mut self, keep: impl FnMut(&RawDate) -> bool) {
        self.0.retain(keep);
    }
}

impl FromIterator<RawDate> for EventSet {
    fn from_iter<I: IntoIterator<Item = RawDate>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<RawDate> for EventSet {
    fn extend<I: IntoIterator<Item = RawDate>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for EventSet {
    type Item = RawDate;
    type IntoIter = btree_set::IntoIter<RawDate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a EventSet {
    type Item = &'a RawDate;
    type IntoIter = btree_set::Iter<'a, RawDate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Collapse a date sequence to one event per calendar day.
///
/// Consumes the sequence lazily, so it can sit directly on top of
/// [`crate::pipeline::extract::DateStream`].
pub fn deduplicate(dates: impl IntoIterator<Item = RawDate>) -> EventSet {
    dates.into_iter().collect()
}
