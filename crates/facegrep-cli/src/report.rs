//! Search result output: terminal summary, JSON report, thumbnail export.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use facegrep_core::{ImageRecord, Intake};
use serde::Serialize;

/// One settled search, in a shape other tools can consume.
#[derive(Debug, Serialize)]
pub struct SearchReport {
    pub search_id: String,
    pub model: String,
    pub reference: PathBuf,
    pub searched_at: DateTime<Utc>,
    pub candidates: usize,
    pub matches: Vec<PathBuf>,
}

impl SearchReport {
    pub fn new(
        search_id: String,
        model: &str,
        reference: &ImageRecord,
        candidates: usize,
        matches: &[ImageRecord],
    ) -> Self {
        Self {
            search_id,
            model: model.to_string(),
            reference: reference.path().to_path_buf(),
            searched_at: Utc::now(),
            candidates,
            matches: matches.iter().map(|m| m.path().to_path_buf()).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serializing search report")
    }
}

pub fn print_summary(matches: &[ImageRecord], total: usize) {
    print!("{}", summary_text(matches, total));
}

fn summary_text(matches: &[ImageRecord], total: usize) -> String {
    if matches.is_empty() {
        return format!("no matches found in {total} gallery images\n");
    }
    let mut out = format!("matched {} of {} gallery images:\n", matches.len(), total);
    for record in matches {
        out.push_str(&format!("  {}\n", record.path().display()));
    }
    out
}

/// Copy the previews of the matched images into `dir`.
///
/// A match that never got a preview (its bytes did not decode) is logged
/// and skipped rather than failing the export.
pub fn export_thumbs(gallery: &Intake, matches: &[ImageRecord], dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut exported = 0usize;
    for record in matches {
        let Some(preview) = gallery.preview_for(record) else {
            tracing::warn!(image = %record.path().display(), "no thumbnail to export");
            continue;
        };
        if let Some(name) = preview.file_name() {
            let target = dir.join(name);
            fs::copy(preview, &target)
                .with_context(|| format!("copying {}", preview.display()))?;
            exported += 1;
        }
    }
    println!("exported {exported} thumbnails to {}", dir.display());
    Ok(())
}
