//! Academic-year bucketing.
//!
//! An academic year runs from 1 August to 31 July of the following calendar
//! year and is labelled by the year it starts in. 31 July belongs to the
//! outgoing year, 1 August to the new one.

use crate::pipeline::extract::RawDate;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// First month of an academic year.
const FIRST_MONTH: u32 = 8;

/// The 12-month window 1 Aug `start_year` – 31 Jul `start_year + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AcademicYear {
    start_year: i32,
}

impl AcademicYear {
    pub fn new(start_year: i32) -> Self {
        Self { start_year }
    }

    /// The academic year containing `date`.
    pub fn of(date: RawDate) -> Self {
        if date.month() >= FIRST_MONTH {
            Self::new(date.year())
        } else {
            Self::new(date.year() - 1)
        }
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    /// 1 August of the starting year.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.start_year, FIRST_MONTH, 1).unwrap_or(NaiveDate::MIN)
    }

    /// 31 July of the following year.
    pub fn last_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.start_year + 1, 7, 31).unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(&self, date: RawDate) -> bool {
        Self::of(date) == *self
    }

    pub fn next(&self) -> Self {
        Self::new(self.start_year + 1)
    }

    /// `2022–2023`.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AcademicYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}–{}", self.start_year, self.start_year + 1)
    }
}

/// Per-academic-year counts, ordered by year ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountTable {
    counts: BTreeMap<AcademicYear, usize>,
}

impl CountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one date in its academic year.
    pub fn record(&mut self, date: RawDate) {
        *self.counts.entry(AcademicYear::of(date)).or_insert(0) += 1;
    }

    /// Count of `year`, zero when absent.
    pub fn get(&self, year: AcademicYear) -> usize {
        self.counts.get(&year).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum over all years.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn first_year(&self) -> Option<AcademicYear> {
        self.counts.keys().next().copied()
    }

    pub fn last_year(&self) -> Option<AcademicYear> {
        self.counts.keys().next_back().copied()
    }

    pub fn years(&self) -> impl Iterator<Item = AcademicYear> + '_ {
        self.counts.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AcademicYear, usize)> + '_ {
        self.counts.iter().map(|(y, c)| (*y, *c))
    }

    /// Insert explicit zeros for every year in `first..=last` that is missing.
    pub fn fill_range(&mut self, first: AcademicYear, last: AcademicYear) {
        let mut year = first;
        while year <= last {
            self.counts.entry(year).or_insert(0);
            year = year.next();
        }
    }

    /// Insert explicit zeros for every gap between the first and last year.
    pub fn fill_gaps(&mut self) {
        if let (Some(first), Some(last)) = (self.first_year(), self.last_year()) {
            self.fill_range(first, last);
        }
    }
}

impl FromIterator<RawDate> for CountTable {
    fn from_iter<I: IntoIterator<Item = RawDate>>(iter: I) -> Self {
        let mut table = Self::new();
        for date in iter {
            table.record(date);
        }
        table
    }
}

impl Serialize for CountTable {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.counts.len()))?;
        for (year, count) in &self.counts {
            map.serialize_entry(&year.label(), count)?;
        }
        map.end()
    }
}

/// Bucket `dates` into academic years.
///
/// With `fill_gaps`, every year between the first and the last present year
/// appears, zero when it has no events.
pub fn bucket<'a>(dates: impl IntoIterator<Item = &'a RawDate>, fill_gaps: bool) -> CountTable {
    let mut table: CountTable = dates.into_iter().copied().collect();
    if fill_gaps {
        table.fill_gaps();
    }
    table
}
