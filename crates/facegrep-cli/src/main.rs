use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use facegrep_core::{
    BatchMatcher, GeminiClassifier, Intake, PreviewStore, SearchSession, SelectionMode,
    RASTER_EXTENSIONS,
};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

mod config;
mod report;

#[derive(Parser)]
#[command(name = "facegrep", about = "Find a person across a gallery of photos")]
struct Cli {
    /// Photo of the person to look for
    #[arg(short, long)]
    reference: PathBuf,

    /// Gallery image files or directories to search
    #[arg(required = true)]
    gallery: Vec<PathBuf>,

    /// Model to query, overriding configuration
    #[arg(long)]
    model: Option<String>,

    /// Print a JSON report instead of a text summary
    #[arg(long)]
    json: bool,

    /// Copy thumbnails of the matched images into DIR
    #[arg(long, value_name = "DIR")]
    thumbs: Option<PathBuf>,

    /// Working directory for preview files (default: cache dir)
    #[arg(long, value_name = "DIR")]
    preview_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    let mut gemini = config::load().context("loading configuration")?;
    if let Some(model) = cli.model {
        gemini.model = model;
    }
    let classifier = GeminiClassifier::new(&gemini).context("building Gemini client")?;
    let model = classifier.model().to_string();
    let matcher = BatchMatcher::new(classifier);

    let preview_root = cli.preview_dir.unwrap_or_else(default_preview_root);

    let mut reference_intake = Intake::new(
        SelectionMode::Replace,
        PreviewStore::new(preview_root.join("reference"))?,
    );
    let reference = reference_intake
        .select([&cli.reference])
        .with_context(|| format!("loading reference image {}", cli.reference.display()))?[0]
        .clone();

    let gallery_paths = expand_gallery(&cli.gallery)?;
    anyhow::ensure!(
        !gallery_paths.is_empty(),
        "no gallery images found under the given paths"
    );

    let mut gallery = Intake::new(
        SelectionMode::Append,
        PreviewStore::new(preview_root.join("gallery"))?,
    );
    let candidates = gallery
        .select(&gallery_paths)
        .context("loading gallery images")?
        .to_vec();
    tracing::info!(gallery = candidates.len(), model = %model, "images loaded");

    let mut session = SearchSession::new();
    session.set_reference(Some(reference.clone()));
    session.set_candidates(candidates);

    let token = session.begin_search()?;
    let search_id = token.search_id().to_string();
    let total = token.candidates().len();

    let outcome = matcher
        .find_matches(token.reference(), token.candidates())
        .await;
    session.settle(token, outcome);

    if let Some(error) = session.last_error() {
        return Err(anyhow::anyhow!(error.clone()));
    }

    if cli.json {
        let report =
            report::SearchReport::new(search_id, &model, &reference, total, session.results());
        println!("{}", report.to_json()?);
    } else {
        report::print_summary(session.results(), total);
    }

    if let Some(dir) = cli.thumbs {
        report::export_thumbs(&gallery, session.results(), &dir)?;
    }

    drop(reference_intake);
    drop(gallery);
    let _ = fs::remove_dir(&preview_root);
    Ok(())
}

fn default_preview_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("facegrep")
        .join("previews")
        .join(std::process::id().to_string())
}

/// Flatten the gallery arguments into image paths.
///
/// File arguments pass through in the order given. Directory arguments are
/// walked recursively; entries with a recognized raster extension are kept,
/// sorted within each directory.
fn expand_gallery(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(input) {
                let entry = entry.with_context(|| format!("walking {}", input.display()))?;
                if entry.file_type().is_file() && has_raster_extension(entry.path()) {
                    found.push(entry.into_path());
                }
            }
            if found.is_empty() {
                tracing::warn!(dir = %input.display(), "no images found in directory");
            }
            found.sort();
            paths.extend(found);
        } else {
            paths.push(input.clone());
        }
    }
    Ok(paths)
}

fn has_raster_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| RASTER_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_walks_filters_and_sorts_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let album = tmp.path().join("album");
        fs::create_dir_all(album.join("nested")).unwrap();
        fs::write(album.join("b.jpg"), "x").unwrap();
        fs::write(album.join("a.PNG"), "x").unwrap();
        fs::write(album.join("notes.txt"), "x").unwrap();
        fs::write(album.join("nested").join("c.webp"), "x").unwrap();

        let paths = expand_gallery(&[album.clone()]).unwrap();
        assert_eq!(
            paths,
            vec![
                album.join("a.PNG"),
                album.join("b.jpg"),
                album.join("nested").join("c.webp"),
            ]
        );
    }

    #[test]
    fn test_expand_keeps_file_arguments_in_given_order() {
        let tmp = tempfile::tempdir().unwrap();
        let zed = tmp.path().join("z.jpg");
        let alpha = tmp.path().join("a.jpg");
        fs::write(&zed, "x").unwrap();
        fs::write(&alpha, "x").unwrap();

        let paths = expand_gallery(&[zed.clone(), alpha.clone()]).unwrap();
        assert_eq!(paths, vec![zed, alpha]);
    }

    #[test]
    fn test_expand_passes_explicit_files_without_extension_filter() {
        let tmp = tempfile::tempdir().unwrap();
        let odd = tmp.path().join("scan.raw");
        fs::write(&odd, "x").unwrap();

        // Intake decides whether explicit files are supported; expansion
        // only filters walked directories.
        let paths = expand_gallery(&[odd.clone()]).unwrap();
        assert_eq!(paths, vec![odd]);
    }

    #[test]
    fn test_expand_mixes_files_before_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let single = tmp.path().join("single.jpg");
        fs::write(&single, "x").unwrap();
        let album = tmp.path().join("album");
        fs::create_dir_all(&album).unwrap();
        fs::write(album.join("inside.png"), "x").unwrap();

        let paths = expand_gallery(&[single.clone(), album.clone()]).unwrap();
        assert_eq!(paths, vec![single, album.join("inside.png")]);
    }

    #[test]
    fn test_default_preview_root_is_per_process() {
        let root = default_preview_root();
        assert_eq!(
            root.file_name().unwrap().to_string_lossy(),
            std::process::id().to_string()
        );
        assert!(root.parent().unwrap().ends_with("facegrep/previews"));
    }

    #[test]
    fn test_raster_extension_matching() {
        assert!(has_raster_extension(Path::new("a.jpg")));
        assert!(has_raster_extension(Path::new("a.JPG")));
        assert!(has_raster_extension(Path::new("a.jpeg")));
        assert!(has_raster_extension(Path::new("a.webp")));
        assert!(!has_raster_extension(Path::new("a.txt")));
        assert!(!has_raster_extension(Path::new("a")));
    }
}
