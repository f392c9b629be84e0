//! Configuration types for outbound-record analysis.
//!
//! All analysis behaviour is controlled through [`StatsConfig`], built via
//! its [`StatsConfigBuilder`]. The builder validates the marker grammar up
//! front so a bad `--pattern` fails before the PDF is opened.

use crate::error::StatsError;
use crate::pipeline::extract::{DateExtractor, MarkerGrammar};
use crate::pipeline::holiday::MACAU;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Configuration for one analysis run.
///
/// Built via [`StatsConfig::builder()`] or using [`StatsConfig::default()`].
///
/// # Example
/// ```rust
/// use outbound_stats::StatsConfig;
///
/// let config = StatsConfig::builder()
///     .exclude_holidays(true)
///     .holiday_region("MO")
///     .fill_gaps(false)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct StatsConfig {
    /// How outbound markers and their dates are recognised. Default: keyword `出境`.
    pub grammar: MarkerGrammar,

    /// Zero-fill academic years between the first and last year with events. Default: true.
    pub fill_gaps: bool,

    /// Remove events that fall on a public holiday before counting. Default: true.
    pub exclude_holidays: bool,

    /// Region whose public holidays are excluded. Default: `MO` (Macau).
    pub holiday_region: String,

    /// JSON holiday file. When `None`, `OUTBOUND_HOLIDAY_FILE` is consulted,
    /// then the built-in calendar for `holiday_region`.
    pub holiday_file: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// Optional per-page extraction progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            grammar: MarkerGrammar::default(),
            fill_gaps: true,
            exclude_holidays: true,
            holiday_region: MACAU.to_string(),
            holiday_file: None,
            password: None,
            pages: PageSelection::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for StatsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatsConfig")
            .field("grammar", &self.grammar)
            .field("fill_gaps", &self.fill_gaps)
            .field("exclude_holidays", &self.exclude_holidays)
            .field("holiday_region", &self.holiday_region)
            .field("holiday_file", &self.holiday_file)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pages", &self.pages)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl StatsConfig {
    /// Create a new builder for `StatsConfig`.
    pub fn builder() -> StatsConfigBuilder {
        StatsConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`StatsConfig`].
#[derive(Debug)]
pub struct StatsConfigBuilder {
    config: StatsConfig,
}

impl StatsConfigBuilder {
    pub fn grammar(mut self, grammar: MarkerGrammar) -> Self {
        self.config.grammar = grammar;
        self
    }

    /// Use `keyword` with the default gap and separator grammar.
    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.config.grammar = MarkerGrammar::keyword(keyword);
        self
    }

    /// Use a full regular expression with `year`, `month`, `day` groups.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.grammar = MarkerGrammar::Custom(pattern.into());
        self
    }

    pub fn fill_gaps(mut self, v: bool) -> Self {
        self.config.fill_gaps = v;
        self
    }

    pub fn exclude_holidays(mut self, v: bool) -> Self {
        self.config.exclude_holidays = v;
        self
    }

    pub fn holiday_region(mut self, region: impl Into<String>) -> Self {
        self.config.holiday_region = region.into();
        self
    }

    pub fn holiday_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.holiday_file = Some(path.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    /// Attach a callback that receives per-page extraction events.
    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<StatsConfig, StatsError> {
        let c = &self.config;
        if c.exclude_holidays && c.holiday_region.trim().is_empty() {
            return Err(StatsError::InvalidConfig(
                "Holiday region must not be empty when holiday exclusion is on".into(),
            ));
        }
        DateExtractor::new(&c.grammar)?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the PDF to read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Read all pages (default).
    #[default]
    All,
    /// Read a single page (1-indexed).
    Single(usize),
    /// Read a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Read specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

impl std::str::FromStr for PageSelection {
    type Err = StatsError;

    /// Parse `all`, `5`, `3-15` or `1,3,5,7`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let invalid = |msg: String| StatsError::InvalidConfig(msg);
        let page = |p: &str| -> Result<usize, StatsError> {
            let n: usize = p
                .trim()
                .parse()
                .map_err(|_| invalid(format!("Invalid page number: '{}'", p.trim())))?;
            if n < 1 {
                return Err(invalid(format!("Pages are 1-indexed, minimum is 1 (got {n})")));
            }
            Ok(n)
        };

        if s == "all" {
            return Ok(PageSelection::All);
        }

        if let Some((start, end)) = s.split_once('-') {
            let (start, end) = (page(start)?, page(end)?);
            if start > end {
                return Err(invalid(format!(
                    "Invalid page range '{start}-{end}': start must be <= end"
                )));
            }
            return Ok(PageSelection::Range(start, end));
        }

        if s.contains(',') {
            let pages = s.split(',').map(&page).collect::<Result<Vec<_>, _>>()?;
            return Ok(PageSelection::Set(pages));
        }

        Ok(PageSelection::Single(page(&s)?))
    }
}
