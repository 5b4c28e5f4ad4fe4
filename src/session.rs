//! In-memory session state: the loaded image, its unmodified original and
//! the undo history.
//!
//! Every image state is held as an encoded PNG blob, so undo restores the
//! exact bytes that were displayed before. There is deliberately no redo
//! stack: undo discards what it pops.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use thiserror::Error;

use crate::export::{ExportError, ExportOutcome, Exporter};
use crate::preset::apply_preset;

/// Filename suggested by the export dialog.
pub const EXPORT_FILENAME: &str = "filtered.png";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("could not encode image: {0}")]
    Encode(#[source] image::ImageError),
}

/// The mutable record of one editing session.
///
/// `history` holds past values of `current`, most recent last. Uploading a
/// new image discards everything unconditionally.
#[derive(Default)]
pub struct Session {
    original: Option<Vec<u8>>,
    current: Option<Vec<u8>>,
    history: Vec<Vec<u8>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.is_some()
    }

    pub fn current_bytes(&self) -> Option<&[u8]> {
        self.current.as_deref()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Decodes `bytes` and makes the result both the original and current
    /// image, clearing any history. On a decode failure the prior session
    /// state is left untouched.
    ///
    /// The upload is re-encoded to PNG so that later states compare
    /// bit-for-bit regardless of the uploaded container format.
    pub fn upload(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        let img = decode(bytes)?;
        let blob = encode(&img)?;
        self.original = Some(blob.clone());
        self.current = Some(blob);
        self.history.clear();
        Ok(())
    }

    /// Applies the named preset to the current image, pushing the prior
    /// state onto the history. Returns `Ok(false)` when no image is loaded.
    pub fn apply_filter(&mut self, preset_name: &str) -> Result<bool, SessionError> {
        let Some(current) = self.current.clone() else {
            return Ok(false);
        };
        let img = decode(&current)?;
        let blob = encode(&apply_preset(&img, preset_name))?;
        // Only mutate once both the decode and the re-encode have succeeded.
        self.history.push(current);
        self.current = Some(blob);
        Ok(true)
    }

    /// Restores the most recent history entry, discarding it. Returns false
    /// when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(prev) => {
                self.current = Some(prev);
                true
            }
            None => false,
        }
    }

    /// Restores the original upload and clears the history. Returns false
    /// when no image has been uploaded.
    pub fn reset(&mut self) -> bool {
        match &self.original {
            Some(original) => {
                self.current = Some(original.clone());
                self.history.clear();
                true
            }
            None => false,
        }
    }

    /// Hands the current bytes to `exporter`. Returns `Ok(None)` when no
    /// image is loaded.
    pub fn export(&self, exporter: &dyn Exporter) -> Result<Option<ExportOutcome>, ExportError> {
        match &self.current {
            Some(bytes) => exporter.export(bytes, EXPORT_FILENAME).map(Some),
            None => Ok(None),
        }
    }

    /// Decodes the current blob for display. `None` when nothing is loaded.
    pub fn current_image(&self) -> Result<Option<DynamicImage>, SessionError> {
        match &self.current {
            Some(bytes) => decode(bytes).map(Some),
            None => Ok(None),
        }
    }
}

fn decode(bytes: &[u8]) -> Result<DynamicImage, SessionError> {
    image::load_from_memory(bytes).map_err(SessionError::Decode)
}

fn encode(img: &DynamicImage) -> Result<Vec<u8>, SessionError> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(SessionError::Encode)?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{DirectoryExporter, ExportOutcome};
    use image::{Rgba, RgbaImage};

    fn png_fixture(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8, 255])
        }));
        encode(&img).unwrap()
    }

    #[test]
    fn upload_sets_original_and_current_and_clears_history() {
        let mut session = Session::new();
        let bytes = png_fixture(10, 10);
        session.upload(&bytes).unwrap();
        assert!(session.is_loaded());
        assert_eq!(session.history_len(), 0);
        assert_eq!(session.current_bytes().unwrap(), session.original.as_deref().unwrap());
    }

    #[test]
    fn upload_of_garbage_fails_and_leaves_state_untouched() {
        let mut session = Session::new();
        assert!(matches!(
            session.upload(b"definitely not an image"),
            Err(SessionError::Decode(_))
        ));
        assert!(!session.is_loaded());

        // Same with an image already loaded: the old state survives.
        let bytes = png_fixture(4, 4);
        session.upload(&bytes).unwrap();
        session.apply_filter("Blur").unwrap();
        let before = session.current_bytes().unwrap().to_vec();
        assert!(session.upload(b"\x89PNG truncated").is_err());
        assert_eq!(session.current_bytes().unwrap(), &before[..]);
        assert_eq!(session.history_len(), 1);
    }

    #[test]
    fn second_upload_discards_everything() {
        let mut session = Session::new();
        session.upload(&png_fixture(8, 8)).unwrap();
        session.apply_filter("Invert").unwrap();
        session.apply_filter("Blur").unwrap();

        let second = png_fixture(5, 5);
        session.upload(&second).unwrap();
        assert_eq!(session.history_len(), 0);
        assert_eq!(session.current_bytes().unwrap(), session.original.as_deref().unwrap());
    }

    #[test]
    fn apply_then_undo_restores_bytes_exactly() {
        let mut session = Session::new();
        session.upload(&png_fixture(16, 16)).unwrap();
        let before = session.current_bytes().unwrap().to_vec();

        assert!(session.apply_filter("Sharpen").unwrap());
        assert_eq!(session.history_len(), 1);
        assert_ne!(session.current_bytes().unwrap(), &before[..]);

        assert!(session.undo());
        assert_eq!(session.history_len(), 0);
        assert_eq!(session.current_bytes().unwrap(), &before[..]);
    }

    #[test]
    fn n_filters_then_n_undos_return_to_start() {
        let mut session = Session::new();
        session.upload(&png_fixture(12, 9)).unwrap();
        let start = session.current_bytes().unwrap().to_vec();

        let presets = ["Blur", "Emboss", "Posterize", "Mirror"];
        for name in presets {
            session.apply_filter(name).unwrap();
        }
        assert_eq!(session.history_len(), presets.len());

        for _ in 0..presets.len() {
            assert!(session.undo());
        }
        assert_eq!(session.current_bytes().unwrap(), &start[..]);
        assert_eq!(session.history_len(), 0);

        // Further undos are no-ops.
        assert!(!session.undo());
        assert_eq!(session.current_bytes().unwrap(), &start[..]);
    }

    #[test]
    fn reset_restores_original_and_empties_history() {
        let mut session = Session::new();
        session.upload(&png_fixture(7, 7)).unwrap();
        let original = session.current_bytes().unwrap().to_vec();

        session.apply_filter("Blur").unwrap();
        session.apply_filter("Invert").unwrap();
        assert_eq!(session.history_len(), 2);
        session.undo();

        assert!(session.reset());
        assert_eq!(session.current_bytes().unwrap(), &original[..]);
        assert_eq!(session.history_len(), 0);
    }

    #[test]
    fn operations_before_upload_are_no_ops() {
        let mut session = Session::new();
        assert!(!session.apply_filter("Blur").unwrap());
        assert!(!session.undo());
        assert!(!session.reset());
        let exporter = DirectoryExporter {
            dir: std::env::temp_dir(),
        };
        assert_eq!(session.export(&exporter).unwrap(), None);
        assert!(!session.is_loaded());
    }

    #[test]
    fn unknown_preset_still_pushes_history() {
        // Dispatch treats an unknown name as the identity transform; the
        // state machine still records the step.
        let mut session = Session::new();
        session.upload(&png_fixture(6, 6)).unwrap();
        assert!(session.apply_filter("Nonsense").unwrap());
        assert_eq!(session.history_len(), 1);
        // Identity re-encode of the same decoded image reproduces the blob.
        assert_eq!(
            session.current_bytes().unwrap(),
            session.history.last().unwrap().as_slice()
        );
    }

    #[test]
    fn grayscale_collapses_to_single_channel_and_undo_restores() {
        let mut session = Session::new();
        session.upload(&png_fixture(100, 100)).unwrap();
        let before = session.current_bytes().unwrap().to_vec();

        session.apply_filter("Grayscale").unwrap();
        let gray = session.current_image().unwrap().unwrap();
        assert_eq!(gray.color().channel_count(), 1);
        assert_eq!(gray.width(), 100);
        assert_eq!(gray.height(), 100);
        assert_eq!(session.history_len(), 1);

        session.undo();
        assert_eq!(session.current_bytes().unwrap(), &before[..]);
        assert_eq!(session.history_len(), 0);
    }

    #[test]
    fn export_writes_current_bytes() {
        let dir = std::env::temp_dir().join(format!("retoque-session-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut session = Session::new();
        session.upload(&png_fixture(5, 5)).unwrap();
        session.apply_filter("Solarize").unwrap();

        let exporter = DirectoryExporter { dir: dir.clone() };
        let outcome = session.export(&exporter).unwrap();
        let path = dir.join(EXPORT_FILENAME);
        assert_eq!(outcome, Some(ExportOutcome::Saved(path.clone())));
        assert_eq!(
            std::fs::read(&path).unwrap(),
            session.current_bytes().unwrap()
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn upload_reencodes_foreign_containers_to_png() {
        // A BMP upload becomes a PNG blob internally.
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 3, Rgba([1, 2, 3, 255])));
        let mut bmp = Cursor::new(Vec::new());
        img.write_to(&mut bmp, ImageFormat::Bmp).unwrap();

        let mut session = Session::new();
        session.upload(bmp.get_ref()).unwrap();
        let blob = session.current_bytes().unwrap();
        assert_eq!(&blob[..8], b"\x89PNG\r\n\x1a\n");
    }
}
