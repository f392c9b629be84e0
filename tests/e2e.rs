//! End-to-end tests against real PDFs in `./test_cases/`.
//!
//! They need a pdfium library and are gated behind the `E2E_ENABLED`
//! environment variable so they do not run in CI unless requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/path/to/libpdfium.so cargo test --test e2e -- --nocapture
//!
//! `departures.pdf` is two pages of Helvetica text using the ASCII marker
//! `DEP`; `blank.pdf` is a single page with no text layer.

use outbound_stats::{
    analyze, analyze_to_files, inspect, AcademicYear, PageSelection, StatsConfig, StatsError,
};
use std::path::{Path, PathBuf};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        p
    }};
}

fn dep_config() -> StatsConfig {
    StatsConfig::builder()
        .keyword("DEP")
        .exclude_holidays(false)
        .build()
        .expect("valid config")
}

/// Copy `src` into a fresh temp dir so reports do not land in `test_cases/`.
fn staged_copy(src: &Path) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let dst = dir.path().join(src.file_name().expect("file name"));
    std::fs::copy(src, &dst).expect("copy fixture");
    (dir, dst)
}

// ── Inspect ──────────────────────────────────────────────────────────────────

#[test]
fn test_inspect_departures() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("departures.pdf"));

    let meta = inspect(&path, None).expect("inspect() should succeed");
    assert_eq!(meta.page_count, 2);
    assert!(!meta.pdf_version.is_empty());
    println!("Metadata: {:?}", meta);
}

// ── Analysis ─────────────────────────────────────────────────────────────────

#[test]
fn test_analyze_departures() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("departures.pdf"));

    let out = analyze(&path, &dep_config()).expect("analyze() should succeed");
    assert_eq!(out.metadata.raw_records, 5);
    assert_eq!(out.metadata.unique_days, 4);
    assert_eq!(out.metadata.skipped_records, 1);
    assert_eq!(out.skipped[0].page, Some(2));
    assert_eq!(out.counts.get(AcademicYear::new(2022)), 3);
    assert_eq!(out.counts.get(AcademicYear::new(2023)), 1);
    assert_eq!(out.document.as_ref().map(|d| d.page_count), Some(2));
}

#[test]
fn test_analyze_single_page() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("departures.pdf"));

    let config = StatsConfig::builder()
        .keyword("DEP")
        .exclude_holidays(false)
        .pages(PageSelection::Single(2))
        .build()
        .unwrap();
    let out = analyze(&path, &config).unwrap();
    assert_eq!(out.metadata.raw_records, 2);
    assert_eq!(out.skipped.len(), 1);
}

#[test]
fn test_page_out_of_range() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("departures.pdf"));

    let config = StatsConfig::builder()
        .keyword("DEP")
        .pages(PageSelection::Single(9))
        .build()
        .unwrap();
    assert!(matches!(
        analyze(&path, &config),
        Err(StatsError::PageOutOfRange { total: 2, .. })
    ));
}

#[test]
fn test_blank_document_is_unreadable() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("blank.pdf"));

    let (dir, staged) = staged_copy(&path);
    let err = analyze_to_files(&staged, &dep_config()).unwrap_err();
    assert!(matches!(err, StatsError::UnreadableDocument { .. }), "got {err:?}");
    // fatal before any output
    assert!(!dir.path().join("blank.md").exists());
    assert!(!dir.path().join("blank.xlsx").exists());
}

// ── Reports ──────────────────────────────────────────────────────────────────

#[test]
fn test_reports_written() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("departures.pdf"));

    let (dir, staged) = staged_copy(&path);
    let (_, paths) = analyze_to_files(&staged, &dep_config()).unwrap();
    let paths = paths.expect("records were found");

    assert_eq!(paths.markdown, dir.path().join("departures.md"));
    assert_eq!(paths.xlsx, dir.path().join("departures.xlsx"));
    let md = std::fs::read_to_string(&paths.markdown).unwrap();
    println!("{md}");
    assert!(md.contains("| 2022–2023学年 (2022-08-01~2023-07-31) | 4 | 3 | 3 |"));
}

#[test]
fn test_no_records_writes_nothing() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("departures.pdf"));

    let (dir, staged) = staged_copy(&path);
    // default keyword 出境 does not occur in the fixture
    let config = StatsConfig::builder().exclude_holidays(false).build().unwrap();
    let (out, paths) = analyze_to_files(&staged, &config).unwrap();
    assert!(out.is_empty());
    assert!(paths.is_none());
    assert!(!dir.path().join("departures.md").exists());
}
