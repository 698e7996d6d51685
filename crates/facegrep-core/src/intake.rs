//! Selection of reference and gallery images from disk.
//!
//! Intake reads files, sniffs their format, and turns them into
//! [`ImageRecord`]s with best-effort preview thumbnails. A selection is
//! all-or-nothing: if any requested file fails to load, the existing
//! selection is left untouched.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::preview::{PreviewHandle, PreviewStore};
use crate::types::ImageRecord;

/// File extensions accepted as gallery candidates, lowercase.
pub const RASTER_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "webp", "gif", "bmp", "tif", "tiff"];

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not a supported image format")]
    UnsupportedFormat { path: PathBuf },
}

/// What a new selection does to the images already held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// The new selection supersedes the old one.
    Replace,
    /// The new selection is added after the old one.
    Append,
}

/// Holds one selection of images plus the previews generated for them.
pub struct Intake {
    mode: SelectionMode,
    records: Vec<ImageRecord>,
    // Declared before `store` so handles release their files first.
    previews: Vec<PreviewHandle>,
    store: PreviewStore,
}

impl Intake {
    pub fn new(mode: SelectionMode, store: PreviewStore) -> Self {
        Self {
            mode,
            records: Vec::new(),
            previews: Vec::new(),
            store,
        }
    }

    /// Load the given files into the selection.
    ///
    /// Every path is read and sniffed before the selection changes, so a
    /// failure on any one of them leaves the previous selection intact. In
    /// [`SelectionMode::Replace`] the old records and their previews are
    /// dropped first; in [`SelectionMode::Append`] both lists grow.
    pub fn select<I, P>(&mut self, paths: I) -> Result<&[ImageRecord], IntakeError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut loaded = Vec::new();
        for path in paths {
            loaded.push(load_record(path.as_ref())?);
        }

        if self.mode == SelectionMode::Replace {
            for handle in self.previews.drain(..) {
                handle.release();
            }
            self.records.clear();
        }

        for record in loaded {
            if let Some(handle) = self.store.create(&record) {
                self.previews.push(handle);
            }
            self.records.push(record);
        }

        tracing::debug!(selected = self.records.len(), "selection updated");
        Ok(&self.records)
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    /// Preview file for a record, if one was generated.
    pub fn preview_for(&self, record: &ImageRecord) -> Option<&Path> {
        self.previews
            .iter()
            .find(|handle| handle.source() == record.path())
            .map(PreviewHandle::path)
    }

    /// Drop every record and release every preview.
    pub fn clear(&mut self) -> &[ImageRecord] {
        for handle in self.previews.drain(..) {
            handle.release();
        }
        self.records.clear();
        &self.records
    }
}

fn load_record(path: &Path) -> Result<ImageRecord, IntakeError> {
    let bytes = fs::read(path).map_err(|source| IntakeError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mime = sniff_mime(path, &bytes).ok_or_else(|| IntakeError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    Ok(ImageRecord::new(path, mime, bytes))
}

/// Sniff the MIME type from content, falling back to the extension for
/// formats whose magic bytes are not recognized.
fn sniff_mime(path: &Path, bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes)
        .ok()
        .or_else(|| image::ImageFormat::from_path(path).ok())
        .and_then(accepted_mime)
}

fn accepted_mime(format: image::ImageFormat) -> Option<&'static str> {
    use image::ImageFormat;
    match format {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::Bmp => Some("image/bmp"),
        ImageFormat::Tiff => Some("image/tiff"),
        _ => None,
    }
}
