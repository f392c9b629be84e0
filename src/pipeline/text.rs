//! PDF text extraction via pdfium.
//!
//! Each selected page's text layer is read with `PdfPageText::all`,
//! normalised, and joined with `\n` into one [`DocumentText`]. Records can
//! therefore be matched even when a page break falls between two records,
//! and byte offsets in the joined text can be mapped back to page numbers.
//!
//! The pdfium library is located through `PDFIUM_LIB_PATH` (a library file
//! or the directory containing it), then through the system loader.

use crate::config::PageSelection;
use crate::error::StatsError;
use crate::output::DocumentMetadata;
use crate::pipeline::normalize::normalize_text;
use crate::progress::ProgressCallback;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable pointing at an existing pdfium library.
pub const PDFIUM_LIB_ENV: &str = "PDFIUM_LIB_PATH";

/// Normalised text of the selected pages, joined with `\n`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentText {
    text: String,
    /// `(byte offset, 1-indexed page number)` for each page, ascending.
    page_starts: Vec<(usize, usize)>,
}

impl DocumentText {
    /// Build from `(page_num, raw_text)` pairs. Each page is normalised.
    pub fn from_pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = (usize, S)>,
        S: AsRef<str>,
    {
        let mut doc = Self::default();
        for (page_num, raw) in pages {
            if !doc.page_starts.is_empty() {
                doc.text.push('\n');
            }
            doc.page_starts.push((doc.text.len(), page_num));
            doc.text.push_str(&normalize_text(raw.as_ref()));
        }
        doc
    }

    /// Single-page document, for text obtained outside pdfium.
    pub fn from_text(text: &str) -> Self {
        Self::from_pages([(1, text)])
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn page_count(&self) -> usize {
        self.page_starts.len()
    }

    /// `true` when no page carries any non-whitespace character.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// 1-indexed page containing byte `offset`.
    pub fn page_at(&self, offset: usize) -> Option<usize> {
        let idx = self.page_starts.partition_point(|&(start, _)| start <= offset);
        idx.checked_sub(1).map(|i| self.page_starts[i].1)
    }
}

/// Bind to a pdfium library: `PDFIUM_LIB_PATH` first, then the system loader.
pub fn bind_pdfium() -> Result<Pdfium, StatsError> {
    if let Some(path) = std::env::var_os(PDFIUM_LIB_ENV).filter(|v| !v.is_empty()) {
        let path = PathBuf::from(path);
        let lib_path = if path.is_dir() {
            Pdfium::pdfium_platform_library_name_at_path(&path)
        } else {
            path
        };
        debug!("Binding pdfium from {}", lib_path.display());
        return Pdfium::bind_to_library(&lib_path)
            .map(Pdfium::new)
            .map_err(|e| StatsError::PdfiumBindingFailed(format!("{}: {e:?}", lib_path.display())));
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| StatsError::PdfiumBindingFailed(format!("{e:?}")))
}

fn load_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, StatsError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                StatsError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                StatsError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            StatsError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// Read the text layer of the selected pages.
///
/// # Errors
/// - [`StatsError::PageOutOfRange`] when the selection matches no page
/// - [`StatsError::UnreadableDocument`] when no selected page has text
pub fn extract_text(
    pdf_path: &Path,
    password: Option<&str>,
    pages: &PageSelection,
    progress: Option<&ProgressCallback>,
) -> Result<DocumentText, StatsError> {
    let pdfium = bind_pdfium()?;
    let document = load_document(&pdfium, pdf_path, password)?;

    let doc_pages = document.pages();
    let total_pages = doc_pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let indices = pages.to_indices(total_pages);
    if indices.is_empty() {
        return Err(StatsError::PageOutOfRange {
            page: 0,
            total: total_pages,
        });
    }

    if let Some(cb) = progress {
        cb.on_extraction_start(indices.len());
    }

    let mut texts = Vec::with_capacity(indices.len());
    for &idx in &indices {
        let page_num = idx + 1;
        let page = doc_pages
            .get(idx as u16)
            .map_err(|e| StatsError::TextExtractionFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?;

        let text = match page.text() {
            Ok(t) => t.all(),
            Err(e) => {
                // a page without a text layer is treated like an empty page
                warn!("Page {} has no text layer: {:?}", page_num, e);
                String::new()
            }
        };
        debug!("Page {} → {} chars", page_num, text.chars().count());

        if let Some(cb) = progress {
            cb.on_page_extracted(page_num, indices.len(), text.len());
        }
        texts.push((page_num, text));
    }

    let doc = DocumentText::from_pages(texts);
    if doc.is_blank() {
        return Err(StatsError::UnreadableDocument {
            path: pdf_path.to_path_buf(),
            pages: indices.len(),
        });
    }
    Ok(doc)
}

/// Extract document metadata without reading page text.
pub fn extract_metadata(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, StatsError> {
    let pdfium = bind_pdfium()?;
    let document = load_document(&pdfium, pdf_path, password)?;

    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    })
}
