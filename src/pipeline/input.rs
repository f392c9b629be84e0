//! Input resolution: validate the user-supplied PDF path.
//!
//! pdfium gives poor diagnostics for a missing or non-PDF file, so the path
//! is checked here first: existence, read permission, and the `%PDF` magic
//! bytes.

use crate::error::StatsError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate that `path` is a readable PDF file.
pub fn resolve_input(path: impl AsRef<Path>) -> Result<PathBuf, StatsError> {
    let path = path.as_ref().to_path_buf();

    if !path.is_file() {
        return Err(StatsError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(StatsError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(StatsError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(StatsError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

/// Report paths next to the input: `<base>.xlsx` and `<base>.md`.
pub fn output_paths(input: &Path) -> (PathBuf, PathBuf) {
    (input.with_extension("xlsx"), input.with_extension("md"))
}
