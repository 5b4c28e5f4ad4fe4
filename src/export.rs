//! Export capability: getting the current image bytes out of the process.
//!
//! The session hands encoded bytes plus a suggested filename to an
//! [`Exporter`]; where those bytes end up (native save dialog, fixed
//! directory in tests) is the exporter's business.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What became of an export request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Bytes were written to this path.
    Saved(PathBuf),
    /// The user backed out of the destination dialog. Not an error.
    Cancelled,
}

pub trait Exporter {
    fn export(&self, bytes: &[u8], suggested_name: &str) -> Result<ExportOutcome, ExportError>;
}

/// Desktop exporter: asks for a destination via a native save dialog.
#[derive(Default)]
pub struct SaveDialogExporter;

impl Exporter for SaveDialogExporter {
    fn export(&self, bytes: &[u8], suggested_name: &str) -> Result<ExportOutcome, ExportError> {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG image", &["png"])
            .set_file_name(suggested_name)
            .save_file()
        else {
            return Ok(ExportOutcome::Cancelled);
        };
        write_png(&path, bytes)
    }
}

/// Dialog-free exporter writing into a fixed directory. Backs the tests.
pub struct DirectoryExporter {
    pub dir: PathBuf,
}

impl Exporter for DirectoryExporter {
    fn export(&self, bytes: &[u8], suggested_name: &str) -> Result<ExportOutcome, ExportError> {
        write_png(&self.dir.join(suggested_name), bytes)
    }
}

/// Writes `bytes` to `path`, forcing a `.png` extension when absent.
fn write_png(path: &Path, bytes: &[u8]) -> Result<ExportOutcome, ExportError> {
    let mut path = path.to_path_buf();
    if path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("png"))
        != Some(true)
    {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(".png");
        path.set_file_name(name);
    }
    fs::write(&path, bytes).map_err(|source| ExportError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(ExportOutcome::Saved(path))
}
