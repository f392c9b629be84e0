//! Text normalisation: canonicalise pdfium text before the date grammar runs.
//!
//! Text layers of immigration-record PDFs are produced by many different
//! generators. The same record may come out as `出境 2023-01-02`,
//! `出境：２０２３－０１－０２` or `出境\u{200B}2023‐01‐02` depending on the
//! font and the producer. The grammar in [`crate::pipeline::extract`] is
//! written against ASCII digits and separators, so every variant is folded
//! here first.
//!
//! ## Rule Order
//!
//! Line endings are normalised before anything else so that byte offsets
//! reported for skipped records refer to the same text the user would see
//! after `dos2unix`. Invisible characters are removed before width folding
//! so that a zero-width joiner between two full-width digits does not split
//! the date.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all normalisation rules to raw page text.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, etc.)
/// 3. Fold full-width ASCII (`０`–`９`, `－`, `／`, `：` …) and the
///    ideographic space to their ASCII forms
/// 4. Fold dash look-alikes (hyphen, non-breaking hyphen, figure dash,
///    en/em dash, minus sign) to `-`
/// 5. Collapse runs of horizontal whitespace to a single space
pub fn normalize_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = fold_full_width(&s);
    let s = fold_dashes(&s);
    collapse_horizontal_whitespace(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Fold full-width forms ────────────────────────────────────────────

fn fold_full_width(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '\u{3000}' => ' ',
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            _ => c,
        })
        .collect()
}

// ── Rule 4: Fold dash variants ──────────────────────────────────────────────

fn fold_dashes(input: &str) -> String {
    input.replace(
        [
            '\u{2010}', '\u{2011}', '\u{2012}', '\u{2013}', '\u{2014}', '\u{2212}', '\u{FE63}',
        ],
        "-",
    )
}

// ── Rule 5: Collapse horizontal whitespace ──────────────────────────────────

static RE_HSPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{00A0}]{2,}").unwrap());

fn collapse_horizontal_whitespace(input: &str) -> String {
    RE_HSPACE.replace_all(input, " ").to_string()
}
