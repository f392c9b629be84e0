//! Public-holiday exclusion.
//!
//! Outbound trips that fall on a public holiday can optionally be left out
//! of the count. Holiday data comes from a [`HolidayCalendar`]: either the
//! built-in Macau table or a JSON file supplied by the caller. A calendar
//! answers `None` for a year it does not cover; dates in such years pass
//! through the filter untouched and a [`HolidayWarning`] is recorded.
//!
//! ## Holiday file format
//!
//! ```json
//! { "region": "MO", "years": { "2024": ["2024-01-01", "2024-02-10"] } }
//! ```
//!
//! Every key under `years` marks that calendar year as covered, even when
//! its list is empty.

use crate::error::HolidayWarning;
use crate::pipeline::dedup::EventSet;
use crate::pipeline::extract::RawDate;
use chrono::{Datelike, Days, NaiveDate};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};

/// Region code of the built-in calendar.
pub const MACAU: &str = "MO";

/// Environment variable naming a JSON holiday file.
pub const HOLIDAY_FILE_ENV: &str = "OUTBOUND_HOLIDAY_FILE";

/// A source of public holidays for one region.
pub trait HolidayCalendar: Send + Sync {
    /// Region code, e.g. `MO`.
    fn region(&self) -> &str;

    /// Holidays in calendar year `year`, or `None` when the year is not covered.
    fn holidays(&self, year: i32) -> Option<HashSet<NaiveDate>>;

    /// `Some(true)` for a holiday, `None` when the year is not covered.
    fn is_holiday(&self, date: &NaiveDate) -> Option<bool> {
        self.holidays(date.year()).map(|set| set.contains(date))
    }
}

// ── Built-in Macau calendar ──────────────────────────────────────────────────

/// Lunar and solar-term holidays that have no fixed Gregorian date.
///
/// Columns: year, Lunar New Year (m, d), Ching Ming (Apr d),
/// Buddha's Birthday (m, d), Tuen Ng (m, d), Mid-Autumn (m, d),
/// Chung Yeung (m, d), Winter Solstice (Dec d).
type MovableRow = (i32, (u32, u32), u32, (u32, u32), (u32, u32), (u32, u32), (u32, u32), u32);

#[rustfmt::skip]
const MACAU_MOVABLE: &[MovableRow] = &[
    (2020, (1, 25), 4, (4, 30), (6, 25), (10, 1),  (10, 25), 21),
    (2021, (2, 12), 4, (5, 19), (6, 14), (9, 21),  (10, 14), 21),
    (2022, (2, 1),  5, (5, 8),  (6, 3),  (9, 10),  (10, 4),  22),
    (2023, (1, 22), 5, (5, 26), (6, 22), (9, 29),  (10, 23), 22),
    (2024, (2, 10), 4, (5, 15), (6, 10), (9, 17),  (10, 11), 21),
    (2025, (1, 29), 4, (5, 5),  (5, 31), (10, 6),  (10, 29), 21),
    (2026, (2, 17), 5, (5, 24), (6, 19), (9, 25),  (10, 18), 22),
    (2027, (2, 6),  5, (5, 13), (6, 9),  (9, 15),  (10, 8),  22),
    (2028, (1, 26), 4, (5, 2),  (5, 28), (10, 3),  (10, 26), 21),
    (2029, (2, 13), 4, (5, 20), (6, 16), (9, 22),  (10, 16), 21),
    (2030, (2, 3),  5, (5, 9),  (6, 5),  (9, 12),  (10, 5),  22),
];

/// Fixed-date Macau public holidays (month, day).
const MACAU_FIXED: &[(u32, u32)] = &[
    (1, 1),   // New Year's Day
    (5, 1),   // Labour Day
    (10, 1),  // National Day
    (10, 2),  // Day after National Day
    (11, 2),  // All Souls' Day
    (12, 8),  // Immaculate Conception
    (12, 20), // SAR Establishment Day
    (12, 24), // Christmas Eve
    (12, 25), // Christmas Day
];

/// Macau public holidays for 2020–2030.
#[derive(Debug, Clone, Copy, Default)]
pub struct MacauCalendar;

impl MacauCalendar {
    pub fn covered_years() -> std::ops::RangeInclusive<i32> {
        let first = MACAU_MOVABLE.first().map_or(0, |r| r.0);
        let last = MACAU_MOVABLE.last().map_or(-1, |r| r.0);
        first..=last
    }
}

impl HolidayCalendar for MacauCalendar {
    fn region(&self) -> &str {
        MACAU
    }

    fn holidays(&self, year: i32) -> Option<HashSet<NaiveDate>> {
        let &(_, new_year, ching_ming, buddha, tuen_ng, mid_autumn, chung_yeung, solstice) =
            MACAU_MOVABLE.iter().find(|row| row.0 == year)?;

        let ymd = |m: u32, d: u32| NaiveDate::from_ymd_opt(year, m, d);
        let mut set: HashSet<NaiveDate> = MACAU_FIXED
            .iter()
            .filter_map(|&(m, d)| ymd(m, d))
            .collect();

        // Lunar New Year: three days
        if let Some(first) = ymd(new_year.0, new_year.1) {
            set.extend((0..3).filter_map(|n| first.checked_add_days(Days::new(n))));
        }
        // Good Friday and Holy Saturday
        if let Some(easter) = easter_sunday(year) {
            set.extend(easter.checked_sub_days(Days::new(2)));
            set.extend(easter.checked_sub_days(Days::new(1)));
        }
        // Day after Mid-Autumn
        if let Some(festival) = ymd(mid_autumn.0, mid_autumn.1) {
            set.extend(festival.checked_add_days(Days::new(1)));
        }
        set.extend(ymd(4, ching_ming));
        set.extend(ymd(buddha.0, buddha.1));
        set.extend(ymd(tuen_ng.0, tuen_ng.1));
        set.extend(ymd(chung_yeung.0, chung_yeung.1));
        set.extend(ymd(12, solstice));

        Some(set)
    }
}

/// Gregorian Easter Sunday (anonymous Gregorian algorithm).
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

// ── File-backed calendar ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct HolidayFile {
    region: String,
    years: BTreeMap<i32, Vec<NaiveDate>>,
}

/// Holidays loaded from a JSON file.
#[derive(Debug, Clone)]
pub struct FileCalendar {
    region: String,
    covered: BTreeSet<i32>,
    dates: HashSet<NaiveDate>,
}

impl FileCalendar {
    /// Parse the JSON holiday format.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: HolidayFile = serde_json::from_str(json)?;
        Ok(Self {
            region: file.region,
            covered: file.years.keys().copied().collect(),
            dates: file.years.into_values().flatten().collect(),
        })
    }

    /// Read and parse `path`.
    pub fn load(path: &Path) -> Result<Self, HolidayWarning> {
        let unavailable = |reason: String| HolidayWarning::Unavailable {
            region: "?".into(),
            year: None,
            reason,
        };
        let json = std::fs::read_to_string(path)
            .map_err(|e| unavailable(format!("cannot read '{}': {e}", path.display())))?;
        let calendar = Self::from_json(&json)
            .map_err(|e| unavailable(format!("cannot parse '{}': {e}", path.display())))?;
        debug!(
            "Loaded {} holidays for {} year(s) of region {} from {}",
            calendar.dates.len(),
            calendar.covered.len(),
            calendar.region,
            path.display()
        );
        Ok(calendar)
    }
}

impl HolidayCalendar for FileCalendar {
    fn region(&self) -> &str {
        &self.region
    }

    fn holidays(&self, year: i32) -> Option<HashSet<NaiveDate>> {
        if !self.covered.contains(&year) {
            return None;
        }
        Some(
            self.dates
                .iter()
                .filter(|d| d.year() == year)
                .copied()
                .collect(),
        )
    }
}

// ── Calendar resolution ──────────────────────────────────────────────────────

/// Pick the holiday calendar for `region`.
///
/// A holiday file (explicit, or from `OUTBOUND_HOLIDAY_FILE` when `file` is
/// `None`) takes precedence over the built-in table. Any failure degrades to
/// "no calendar" plus a warning; it is never fatal.
pub fn resolve_calendar(
    region: &str,
    file: Option<&Path>,
) -> (Option<Box<dyn HolidayCalendar>>, Vec<HolidayWarning>) {
    let env_file = std::env::var_os(HOLIDAY_FILE_ENV).filter(|v| !v.is_empty());
    let file = file.map(Path::to_path_buf).or_else(|| env_file.map(Into::into));

    if let Some(path) = file {
        return match FileCalendar::load(&path) {
            Ok(calendar) if calendar.region().eq_ignore_ascii_case(region) => {
                info!("Using holiday file {}", path.display());
                (Some(Box::new(calendar)), Vec::new())
            }
            Ok(calendar) => (
                None,
                vec![HolidayWarning::Unavailable {
                    region: region.to_string(),
                    year: None,
                    reason: format!(
                        "holiday file '{}' is for region '{}'",
                        path.display(),
                        calendar.region()
                    ),
                }],
            ),
            Err(HolidayWarning::Unavailable { reason, .. }) => (
                None,
                vec![HolidayWarning::Unavailable {
                    region: region.to_string(),
                    year: None,
                    reason,
                }],
            ),
        };
    }

    match builtin_calendar(region) {
        Some(calendar) => (Some(calendar), Vec::new()),
        None => (
            None,
            vec![HolidayWarning::Unavailable {
                region: region.to_string(),
                year: None,
                reason: "no built-in calendar for this region; supply a holiday file".into(),
            }],
        ),
    }
}

/// Built-in calendar for `region`, if any.
pub fn builtin_calendar(region: &str) -> Option<Box<dyn HolidayCalendar>> {
    if region.eq_ignore_ascii_case(MACAU) {
        Some(Box::new(MacauCalendar))
    } else {
        None
    }
}

// ── Filter ───────────────────────────────────────────────────────────────────

/// Result of [`exclude_holidays`].
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    /// Events that survived the filter.
    pub events: EventSet,
    /// Events removed because they fell on a holiday, ascending.
    pub excluded: Vec<RawDate>,
    /// Years (or regions) that could not be checked.
    pub warnings: Vec<HolidayWarning>,
}

/// Remove every event that falls on a holiday of `calendar`.
///
/// Years the calendar does not cover pass through untouched, each with one
/// [`HolidayWarning`].
pub fn exclude_holidays(events: &EventSet, calendar: &dyn HolidayCalendar) -> FilterOutcome {
    let mut holidays: HashSet<NaiveDate> = HashSet::new();
    let mut warnings = Vec::new();

    for year in events.calendar_years() {
        match calendar.holidays(year) {
            Some(set) => holidays.extend(set),
            None => {
                warn!(
                    "No {} holiday data for {}; dates in that year are not filtered",
                    calendar.region(),
                    year
                );
                warnings.push(HolidayWarning::Unavailable {
                    region: calendar.region().to_string(),
                    year: Some(year),
                    reason: "year not covered by holiday data".into(),
                });
            }
        }
    }

    let mut kept = events.clone();
    kept.retain(|d| !holidays.contains(d));
    let excluded: Vec<RawDate> = events.iter().filter(|d| holidays.contains(d)).copied().collect();
    debug!("Holiday filter removed {} of {} events", excluded.len(), events.len());

    FilterOutcome {
        events: kept,
        excluded,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::bucket::bucket;
    use crate::pipeline::dedup::deduplicate;

    fn ymd(y: i32, m: u32, d: u32) -> RawDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn easter_dates() {
        assert_eq!(easter_sunday(2023), Some(ymd(2023, 4, 9)));
        assert_eq!(easter_sunday(2024), Some(ymd(2024, 3, 31)));
        assert_eq!(easter_sunday(2025), Some(ymd(2025, 4, 20)));
    }

    #[test]
    fn macau_2024_contains_expected_days() {
        let set = MacauCalendar.holidays(2024).unwrap();
        for d in [
            ymd(2024, 1, 1),
            ymd(2024, 2, 10),
            ymd(2024, 2, 11),
            ymd(2024, 2, 12),
            ymd(2024, 3, 29),
            ymd(2024, 3, 30),
            ymd(2024, 4, 4),
            ymd(2024, 9, 18),
            ymd(2024, 10, 1),
            ymd(2024, 12, 20),
            ymd(2024, 12, 25),
        ] {
            assert!(set.contains(&d), "missing {d}");
        }
        assert!(!set.contains(&ymd(2024, 3, 15)));
    }

    #[test]
    fn macau_uncovered_year() {
        assert!(MacauCalendar.holidays(2019).is_none());
        assert!(MacauCalendar.holidays(2031).is_none());
        assert_eq!(MacauCalendar::covered_years(), 2020..=2030);
        assert_eq!(MacauCalendar.is_holiday(&ymd(2031, 1, 1)), None);
        assert_eq!(MacauCalendar.is_holiday(&ymd(2025, 1, 1)), Some(true));
    }

    #[test]
    fn filter_removes_only_holidays() {
        let events = deduplicate(vec![ymd(2024, 1, 1), ymd(2024, 1, 2), ymd(2024, 12, 25)]);
        let outcome = exclude_holidays(&events, &MacauCalendar);
        assert_eq!(outcome.events.len(), 1);
        assert!(outcome.events.contains(&ymd(2024, 1, 2)));
        assert_eq!(outcome.excluded, vec![ymd(2024, 1, 1), ymd(2024, 12, 25)]);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn uncovered_year_passes_through_with_warning() {
        let events = deduplicate(vec![ymd(2035, 1, 1), ymd(2024, 1, 1)]);
        let outcome = exclude_holidays(&events, &MacauCalendar);
        assert!(outcome.events.contains(&ymd(2035, 1, 1)));
        assert!(!outcome.events.contains(&ymd(2024, 1, 1)));
        assert_eq!(outcome.warnings.len(), 1);
        match &outcome.warnings[0] {
            HolidayWarning::Unavailable { year, .. } => assert_eq!(*year, Some(2035)),
        }
    }

    #[test]
    fn exclusion_never_increases_counts() {
        let events = deduplicate(vec![
            ymd(2023, 9, 29),
            ymd(2023, 10, 1),
            ymd(2023, 10, 3),
            ymd(2024, 2, 10),
            ymd(2024, 5, 7),
        ]);
        let before = bucket(&events, false);
        let after = bucket(&exclude_holidays(&events, &MacauCalendar).events, false);
        for (year, count) in before.iter() {
            assert!(after.get(year) <= count);
        }
    }

    #[test]
    fn file_calendar_parses_and_scopes_coverage() {
        let json = r#"{ "region": "XX", "years": { "2024": ["2024-03-01"], "2025": [] } }"#;
        let cal = FileCalendar::from_json(json).unwrap();
        assert_eq!(cal.region(), "XX");
        assert_eq!(cal.is_holiday(&ymd(2024, 3, 1)), Some(true));
        assert_eq!(cal.is_holiday(&ymd(2025, 3, 1)), Some(false));
        assert_eq!(cal.is_holiday(&ymd(2026, 3, 1)), None);
    }

    #[test]
    fn file_calendar_rejects_bad_json() {
        assert!(FileCalendar::from_json("{ \"region\": 1 }").is_err());
    }

    #[test]
    fn resolve_builtin_and_unknown_region() {
        let (cal, warnings) = resolve_calendar("mo", None);
        if std::env::var_os(HOLIDAY_FILE_ENV).is_none() {
            assert!(cal.is_some());
            assert!(warnings.is_empty());

            let (cal, warnings) = resolve_calendar("ZZ", None);
            assert!(cal.is_none());
            assert_eq!(warnings.len(), 1);
        }
    }

    #[test]
    fn resolve_missing_file_degrades_to_warning() {
        let (cal, warnings) =
            resolve_calendar(MACAU, Some(Path::new("/definitely/not/a/holiday/file.json")));
        assert!(cal.is_none());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn resolve_region_mismatch_is_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hk.json");
        std::fs::write(&path, r#"{ "region": "HK", "years": { "2024": [] } }"#).unwrap();
        let (cal, warnings) = resolve_calendar(MACAU, Some(&path));
        assert!(cal.is_none());
        assert!(warnings[0].to_string().contains("HK"));
    }
}
