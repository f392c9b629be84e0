//! Pipeline stages for outbound-record analysis.
//!
//! Each submodule implements one step. Data flows strictly one way.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ text ──▶ extract ──▶ dedup ──▶ holiday ──▶ bucket
//! (path)  (pdfium)  (dates)    (days)    (filter)    (years)
//! ```
//!
//! 1. [`input`]   — check the user-supplied path is a readable PDF
//! 2. [`text`]    — read the text layer of the selected pages; each page
//!    goes through [`normalize`] first
//! 3. [`extract`] — lazily match marker + date records, skipping malformed ones
//! 4. [`dedup`]   — collapse records on the same calendar day
//! 5. [`holiday`] — optionally drop days that are public holidays
//! 6. [`bucket`]  — count events per academic year (Aug 1 – Jul 31)

pub mod bucket;
pub mod dedup;
pub mod extract;
pub mod holiday;
pub mod input;
pub mod normalize;
pub mod text;
