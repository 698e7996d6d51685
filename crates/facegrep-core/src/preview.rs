//! Preview thumbnails with an explicit create/release lifecycle.
//!
//! A preview is the displayable stand-in for a selected image: a small PNG
//! written under a per-run directory. Every create is paired with an
//! explicit release on supersede or clear, and dropping a handle releases
//! its file on teardown, so preview storage never outlives the selection
//! that produced it.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::ImageRecord;

/// Longest edge of a generated preview, in pixels.
const PREVIEW_EDGE: u32 = 256;

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("failed to create preview directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Handle to one preview file. Minted by a [`PreviewStore`]; the file lives
/// until the handle is released or dropped.
#[derive(Debug)]
pub struct PreviewHandle {
    path: PathBuf,
    source: PathBuf,
    released: bool,
}

impl PreviewHandle {
    /// Path of the preview file itself.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the image this preview was generated from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Delete the preview file now.
    pub fn release(mut self) {
        self.delete_file();
    }

    fn delete_file(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(preview = %self.path.display(), "preview released"),
            Err(error) => {
                tracing::warn!(preview = %self.path.display(), error = %error, "failed to remove preview file")
            }
        }
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.delete_file();
    }
}

/// Mints preview files under one directory and reaps the directory when it
/// goes away.
pub struct PreviewStore {
    dir: PathBuf,
    next_id: u64,
}

impl PreviewStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, PreviewError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| PreviewError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir, next_id: 0 })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Generate a thumbnail for the record and hand back its handle.
    ///
    /// Best-effort: image data that does not decode, or a thumbnail that
    /// cannot be written, yields `None`. The record stays fully usable for
    /// matching either way; it just has nothing to display.
    pub fn create(&mut self, record: &ImageRecord) -> Option<PreviewHandle> {
        let decoded = match image::load_from_memory(record.bytes()) {
            Ok(decoded) => decoded,
            Err(error) => {
                tracing::warn!(
                    source = %record.path().display(),
                    error = %error,
                    "image did not decode; no preview generated"
                );
                return None;
            }
        };

        let id = self.next_id;
        self.next_id += 1;
        let stem = record
            .path()
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image");
        let path = self.dir.join(format!("{id:04}-{stem}.png"));

        let thumbnail = decoded.thumbnail(PREVIEW_EDGE, PREVIEW_EDGE);
        if let Err(error) = thumbnail.save_with_format(&path, image::ImageFormat::Png) {
            tracing::warn!(preview = %path.display(), error = %error, "failed to write preview");
            return None;
        }

        tracing::debug!(
            source = %record.path().display(),
            preview = %path.display(),
            "preview created"
        );
        Some(PreviewHandle {
            path,
            source: record.path().to_path_buf(),
            released: false,
        })
    }
}

impl Drop for PreviewStore {
    fn drop(&mut self) {
        // Handles delete their own files; reap the directory if empty.
        let _ = fs::remove_dir(&self.dir);
    }
}
