//! Report rendering and writing.
//!
//! Two files land next to the input PDF: `<base>.md` with a Markdown table and
//! `<base>.xlsx` with the same table as a one-sheet workbook. Both are staged
//! as temp files in the target directory and renamed into place, so a failed
//! run leaves the previous reports as they were.

use crate::error::StatsError;
use crate::output::StatsOutput;
use crate::pipeline::input::output_paths;
use serde::Serialize;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempPath};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Column headers, in table order.
pub const HEADERS: [&str; 4] = ["学年", "出境总次数", "单日去重后次数", "去除假期后次数"];

/// Paths of the two reports written by [`write_reports`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportPaths {
    pub xlsx: PathBuf,
    pub markdown: PathBuf,
}

/// Render the summary as a Markdown document.
pub fn render_markdown(output: &StatsOutput) -> String {
    let mut md = String::new();
    md.push_str(&format!("| {} |\n", HEADERS.join(" | ")));
    md.push_str("|------|-----------|---------------|------------------|\n");
    for row in &output.rows {
        md.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            row.long_label(),
            row.total_records,
            row.unique_days,
            row.counted
        ));
    }

    let meta = &output.metadata;
    md.push('\n');
    md.push_str(&format!("- 出境记录: {}\n", meta.raw_records));
    md.push_str(&format!("- 去重后天数: {}\n", meta.unique_days));
    md.push_str(&format!("- 计入次数: {}\n", meta.total_events));
    match (&meta.holiday_region, meta.exclude_holidays) {
        (Some(region), true) => {
            md.push_str(&format!(
                "- 假期排除: {} ({} 天被排除)\n",
                region, meta.holiday_excluded
            ));
        }
        _ => md.push_str("- 假期排除: 关闭\n"),
    }
    if !meta.uncovered_years.is_empty() {
        let years: Vec<String> = meta.uncovered_years.iter().map(i32::to_string).collect();
        md.push_str(&format!("- 无假期数据年份: {}\n", years.join(", ")));
    }
    if meta.skipped_records > 0 {
        md.push_str(&format!("- 跳过的无效记录: {}\n", meta.skipped_records));
    }
    md
}

// ── Workbook ─────────────────────────────────────────────────────────────────

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

/// Encode the summary as an `.xlsx` workbook (one sheet, header row first).
pub fn build_workbook(output: &StatsOutput) -> Result<Vec<u8>, zip::result::ZipError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("xl/workbook.xml", WORKBOOK.to_string()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
        ("xl/worksheets/sheet1.xml", sheet_xml(output)),
    ];
    for (name, body) in parts {
        zip.start_file(name, options)?;
        zip.write_all(body.as_bytes())?;
    }
    Ok(zip.finish()?.into_inner())
}

fn sheet_xml(output: &StatsOutput) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );

    xml.push_str(r#"<row r="1">"#);
    for (col, header) in HEADERS.iter().enumerate() {
        xml.push_str(&string_cell(col, 1, header));
    }
    xml.push_str("</row>");

    for (i, row) in output.rows.iter().enumerate() {
        let r = i + 2;
        xml.push_str(&format!(r#"<row r="{r}">"#));
        xml.push_str(&string_cell(0, r, &row.long_label()));
        xml.push_str(&number_cell(1, r, row.total_records));
        xml.push_str(&number_cell(2, r, row.unique_days));
        xml.push_str(&number_cell(3, r, row.counted));
        xml.push_str("</row>");
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

/// `A1`-style reference. Four columns only, so a single letter suffices.
fn cell_ref(col: usize, row: usize) -> String {
    format!("{}{}", (b'A' + col as u8) as char, row)
}

fn string_cell(col: usize, row: usize, value: &str) -> String {
    format!(
        r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
        cell_ref(col, row),
        escape_xml(value)
    )
}

fn number_cell(col: usize, row: usize, value: usize) -> String {
    format!(r#"<c r="{}"><v>{}</v></c>"#, cell_ref(col, row), value)
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

// ── Writing ──────────────────────────────────────────────────────────────────

/// Write `<base>.xlsx` and `<base>.md` next to `input`.
///
/// Either both files are replaced or neither is. Both new files are staged
/// first; a previous Markdown report is set aside while the two renames run
/// and put back if the workbook rename fails.
pub fn write_reports(output: &StatsOutput, input: &Path) -> Result<ReportPaths, StatsError> {
    let (xlsx_path, md_path) = output_paths(input);

    let workbook = build_workbook(output).map_err(|e| StatsError::WorkbookFailed {
        path: xlsx_path.clone(),
        detail: e.to_string(),
    })?;
    let markdown = render_markdown(output);

    let md_tmp = stage(&md_path, markdown.as_bytes())?;
    let xlsx_tmp = stage(&xlsx_path, &workbook)?;
    let md_backup = set_aside(&md_path)?;

    if let Err(e) = md_tmp.persist(&md_path) {
        restore(md_backup, &md_path);
        return Err(StatsError::OutputWriteFailed {
            path: md_path,
            source: e.error,
        });
    }
    debug!("Wrote {}", md_path.display());

    if let Err(e) = xlsx_tmp.persist(&xlsx_path) {
        restore(md_backup, &md_path);
        return Err(StatsError::OutputWriteFailed {
            path: xlsx_path,
            source: e.error,
        });
    }
    debug!("Wrote {}", xlsx_path.display());

    info!(
        "Reports written: {} and {}",
        xlsx_path.display(),
        md_path.display()
    );
    // dropping the backup deletes the previous report
    drop(md_backup);
    Ok(ReportPaths {
        xlsx: xlsx_path,
        markdown: md_path,
    })
}

/// Move an existing `target` to a temp path beside it.
fn set_aside(target: &Path) -> Result<Option<TempPath>, StatsError> {
    if !target.exists() {
        return Ok(None);
    }
    let write_failed = |source| StatsError::OutputWriteFailed {
        path: target.to_path_buf(),
        source,
    };
    let backup = tempfile::Builder::new()
        .prefix(".outbound-stats-")
        .suffix(".bak")
        .tempfile_in(target_dir(target))
        .map_err(write_failed)?
        .into_temp_path();
    std::fs::rename(target, &backup).map_err(write_failed)?;
    Ok(Some(backup))
}

/// Put a set-aside report back, or remove the new one when there was none.
fn restore(backup: Option<TempPath>, target: &Path) {
    let result = match backup {
        Some(backup) => backup.persist(target).map_err(|e| e.error),
        None => match std::fs::remove_file(target) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        },
    };
    if let Err(e) = result {
        warn!("Could not restore {} after failed write: {}", target.display(), e);
    }
}

fn target_dir(target: &Path) -> PathBuf {
    match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Write `bytes` to a temp file in the directory of `target`.
fn stage(target: &Path, bytes: &[u8]) -> Result<NamedTempFile, StatsError> {
    let dir = target_dir(target);
    let write_failed = |source| StatsError::OutputWriteFailed {
        path: target.to_path_buf(),
        source,
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".outbound-stats-")
        .tempfile_in(&dir)
        .map_err(write_failed)?;
    tmp.write_all(bytes).map_err(write_failed)?;
    tmp.as_file().sync_all().map_err(write_failed)?;
    Ok(tmp)
}
