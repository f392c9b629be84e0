//! Integration tests for the text → report pipeline.
//!
//! These run without pdfium: text is fed through `analyze_text` /
//! `analyze_document`, and reports are written into temp directories.

use chrono::NaiveDate;
use outbound_stats::pipeline::bucket::bucket;
use outbound_stats::pipeline::dedup::deduplicate;
use outbound_stats::pipeline::text::DocumentText;
use outbound_stats::{
    analyze_document, analyze_text, render_markdown, write_reports, AcademicYear, MarkerGrammar,
    RecordError, StatsConfig, StatsError,
};
use std::io::Write;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn plain() -> StatsConfig {
    StatsConfig::builder()
        .exclude_holidays(false)
        .fill_gaps(false)
        .build()
        .unwrap()
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[test]
fn end_to_end_scenario() {
    let raw = [d(2022, 8, 15), d(2022, 8, 15), d(2023, 1, 2), d(2023, 7, 31), d(2023, 8, 1)];
    let events = deduplicate(raw);
    assert_eq!(
        events.iter().copied().collect::<Vec<_>>(),
        vec![d(2022, 8, 15), d(2023, 1, 2), d(2023, 7, 31), d(2023, 8, 1)]
    );

    let counts = bucket(&events, false);
    assert_eq!(counts.get(AcademicYear::new(2022)), 3);
    assert_eq!(counts.get(AcademicYear::new(2023)), 1);
    assert_eq!(counts.len(), 2);
}

#[test]
fn end_to_end_scenario_from_text() {
    let text = "出境 2022-08-15\n出境 2022-08-15\n出境 2023-01-02\n出境 2023-07-31\n出境 2023-08-01\n";
    let out = analyze_text(text, &plain()).unwrap();
    assert_eq!(out.events.len(), 4);
    assert_eq!(out.counts.get(AcademicYear::new(2022)), 3);
    assert_eq!(out.counts.get(AcademicYear::new(2023)), 1);
    assert_eq!(out.rows[0].label, "2022–2023");
    assert_eq!(out.rows[1].label, "2023–2024");
}

#[test]
fn malformed_record_is_skipped_not_fatal() {
    let text = "出境 2023-01-02\n出境 2022-13-40\n出境 2023-03-04\n";
    let out = analyze_text(text, &plain()).unwrap();

    assert_eq!(out.metadata.skipped_records, 1);
    assert_eq!(out.events.len(), 2);
    match &out.skipped[0].error {
        RecordError::Malformed { excerpt, .. } => assert!(excerpt.contains("2022-13-40")),
    }
}

#[test]
fn document_without_records_is_empty_not_an_error() {
    let out = analyze_text("入境 2023-01-02\n", &StatsConfig::default()).unwrap();
    assert!(out.is_empty());
    assert!(out.rows.is_empty());
    assert_eq!(out.metadata.total_events, 0);
}

#[test]
fn blank_document_is_unreadable() {
    let doc = DocumentText::from_pages([(1, "   "), (2, "\u{200B}")]);
    let err = analyze_document(&doc, &StatsConfig::default()).unwrap_err();
    assert!(
        matches!(err, StatsError::UnreadableDocument { pages: 2, .. }),
        "got {err:?}"
    );
    assert!(matches!(
        analyze_text("", &plain()),
        Err(StatsError::UnreadableDocument { .. })
    ));
}

// ── Properties ───────────────────────────────────────────────────────────────

#[test]
fn dedup_never_grows_and_is_idempotent() {
    let raw = vec![d(2024, 1, 1), d(2024, 1, 1), d(2024, 1, 2), d(2023, 12, 31)];
    let once = deduplicate(raw.clone());
    assert!(once.len() <= raw.len());
    assert_eq!(once.len(), 3);
    let twice = deduplicate(once.clone());
    assert_eq!(once, twice);

    let distinct = vec![d(2024, 1, 1), d(2024, 1, 2)];
    assert_eq!(deduplicate(distinct.clone()).len(), distinct.len());
}

#[test]
fn holiday_exclusion_is_monotonic() {
    let text = "出境 2023-10-01\n出境 2023-10-03\n出境 2023-12-25\n\
                出境 2024-01-01\n出境 2024-05-01\n出境 2024-05-06";
    let without = analyze_text(text, &plain()).unwrap();
    let with = analyze_text(
        text,
        &StatsConfig::builder().fill_gaps(false).build().unwrap(),
    )
    .unwrap();

    for (year, count) in without.counts.iter() {
        assert!(with.counts.get(year) <= count, "{year} grew");
    }
    assert!(with.metadata.total_events < without.metadata.total_events);
}

#[test]
fn counts_sum_to_events_minus_holidays() {
    let text = "出境 2023-10-01\n出境 2023-10-01\n出境 2023-10-09\n出境 2024-12-20\n出境 2024-12-30";
    let out = analyze_text(text, &StatsConfig::builder().fill_gaps(false).build().unwrap())
        .unwrap();
    assert_eq!(
        out.counts.total(),
        out.events.len() - out.metadata.holiday_excluded
    );
    // 2023-10-01 (National Day) and 2024-12-20 (SAR Establishment Day)
    assert_eq!(out.metadata.holiday_excluded, 2);
}

#[test]
fn gaps_fill_with_zero_rows() {
    let config = StatsConfig::builder().exclude_holidays(false).build().unwrap();
    let out = analyze_text("出境 2019-09-09\n出境 2022-09-09", &config).unwrap();
    let labels: Vec<&str> = out.rows.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, ["2019–2020", "2020–2021", "2021–2022", "2022–2023"]);
    assert_eq!(out.rows[1].total_records, 0);
    assert_eq!(out.counts.total(), 2);
}

// ── Grammar ──────────────────────────────────────────────────────────────────

#[test]
fn custom_keyword_and_separators() {
    let config = StatsConfig::builder()
        .keyword("DEP")
        .exclude_holidays(false)
        .build()
        .unwrap();
    let out = analyze_text("DEP: 2023/01/02\nDEP 2023.1.3\nARR 2023-01-04", &config).unwrap();
    assert_eq!(out.events.len(), 2);
}

#[test]
fn full_pattern_grammar() {
    let config = StatsConfig::builder()
        .grammar(MarkerGrammar::Custom(
            r"出境\s*(?P<year>\d{4})年(?P<month>\d{1,2})月(?P<day>\d{1,2})日".into(),
        ))
        .exclude_holidays(false)
        .build()
        .unwrap();
    let out = analyze_text("出境 2023年1月2日\n出境 2023年8月1日", &config).unwrap();
    assert_eq!(out.rows.len(), 2);
}

#[test]
fn full_width_text_is_normalised() {
    let out = analyze_text("出境：２０２３－０１－０２", &plain()).unwrap();
    assert!(out.events.contains(&d(2023, 1, 2)));
}

#[test]
fn records_split_across_pages_keep_page_numbers() {
    let doc = DocumentText::from_pages([
        (1, "出境 2023-01-02"),
        (2, "header\n出境 2023-02-30"),
        (3, "出境 2023-03-04"),
    ]);
    let out = analyze_document(&doc, &plain()).unwrap();
    assert_eq!(out.events.len(), 2);
    assert_eq!(out.skipped.len(), 1);
    assert_eq!(out.skipped[0].page, Some(2));
}

#[test]
fn header_marker_does_not_swallow_next_line() {
    let out = analyze_text("类别 出境\n1 2023-01-02 入境\n出境 2023-01-03", &plain()).unwrap();
    assert_eq!(out.metadata.skipped_records, 0);
    assert_eq!(out.metadata.raw_records, 1);
}

// ── Holiday sources ──────────────────────────────────────────────────────────

#[test]
fn holiday_file_overrides_builtin() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        r#"{{"region": "HK", "years": {{"2023": ["2023-07-01"]}}}}"#
    )
    .unwrap();

    let config = StatsConfig::builder()
        .holiday_region("HK")
        .holiday_file(file.path())
        .build()
        .unwrap();
    let out = analyze_text("出境 2023-07-01\n出境 2023-07-02\n出境 2024-07-01", &config).unwrap();

    assert_eq!(out.metadata.holiday_excluded, 1);
    assert_eq!(out.metadata.uncovered_years, vec![2024]);
    // the uncovered year passes through unfiltered
    assert_eq!(out.counts.get(AcademicYear::new(2023)), 1);
    assert_eq!(out.counts.get(AcademicYear::new(2022)), 1);
}

#[test]
fn missing_holiday_file_degrades_to_warning() {
    let config = StatsConfig::builder()
        .holiday_file("/no/such/holidays.json")
        .build()
        .unwrap();
    let out = analyze_text("出境 2023-12-25", &config).unwrap();
    assert_eq!(out.metadata.total_events, 1);
    assert_eq!(out.warnings.len(), 1);
}

// ── Reports ──────────────────────────────────────────────────────────────────

#[test]
fn reports_are_written_next_to_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("movements.pdf");
    let out = analyze_text("出境 2023-01-02\n出境 2023-08-01", &StatsConfig::default()).unwrap();

    let paths = write_reports(&out, &input).unwrap();
    assert_eq!(paths.markdown, dir.path().join("movements.md"));
    assert_eq!(paths.xlsx, dir.path().join("movements.xlsx"));

    let md = std::fs::read_to_string(&paths.markdown).unwrap();
    assert_eq!(md, render_markdown(&out));
    assert!(md.contains("| 2022–2023学年 (2022-08-01~2023-07-31) | 1 | 1 | 1 |"));

    let xlsx = std::fs::read(&paths.xlsx).unwrap();
    assert_eq!(&xlsx[..4], b"PK\x03\x04");
}

#[test]
fn reports_replace_previous_run() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("movements.pdf");
    std::fs::write(dir.path().join("movements.md"), "stale").unwrap();

    let out = analyze_text("出境 2023-01-02", &plain()).unwrap();
    let paths = write_reports(&out, &input).unwrap();
    assert_ne!(std::fs::read_to_string(paths.markdown).unwrap(), "stale");
}

#[test]
fn failed_workbook_write_keeps_previous_markdown() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("movements.pdf");
    std::fs::write(dir.path().join("movements.md"), "previous run").unwrap();
    // a directory in the workbook's place makes its rename fail
    std::fs::create_dir(dir.path().join("movements.xlsx")).unwrap();

    let out = analyze_text("出境 2023-01-02", &plain()).unwrap();
    let err = write_reports(&out, &input).unwrap_err();
    assert!(matches!(err, StatsError::OutputWriteFailed { .. }), "got {err:?}");

    let md = std::fs::read_to_string(dir.path().join("movements.md")).unwrap();
    assert_eq!(md, "previous run");
    let mut names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, ["movements.md", "movements.xlsx"]);
}

#[test]
fn failed_workbook_write_without_previous_report_leaves_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("movements.pdf");
    std::fs::create_dir(dir.path().join("movements.xlsx")).unwrap();

    let out = analyze_text("出境 2023-01-02", &plain()).unwrap();
    assert!(write_reports(&out, &input).is_err());
    assert!(!dir.path().join("movements.md").exists());
}

#[test]
fn unwritable_target_leaves_no_reports() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("missing-dir").join("movements.pdf");
    let out = analyze_text("出境 2023-01-02", &plain()).unwrap();

    let err = write_reports(&out, &input).unwrap_err();
    assert!(matches!(err, StatsError::OutputWriteFailed { .. }));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn summary_serialises_to_json() {
    let out = analyze_text("出境 2023-01-02\n出境 2022-13-40", &plain()).unwrap();
    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json["metadata"]["raw_records"], 1);
    assert_eq!(json["metadata"]["skipped_records"], 1);
    assert_eq!(json["counts"]["2022–2023"], 1);
    assert_eq!(json["rows"][0]["label"], "2022–2023");
}
