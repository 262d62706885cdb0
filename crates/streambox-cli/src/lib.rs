use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use streambox_api_client::{BatchItem, ItemStatus, SubmissionObserver, SubmissionSummary, VideoUpload};
use streambox_core::constants::{CLI_UPLOAD_DESCRIPTION, DEFAULT_GENRE};

/// Extensions picked up as videos, lowercase.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "mkv", "avi"];

/// Sibling thumbnail extensions, in lookup order.
pub const THUMBNAIL_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Content type sent for a video file.
pub fn content_type_for(path: &Path) -> &'static str {
    match lowercase_extension(path).as_deref() {
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

/// First `{stem}.{ext}` next to the video that exists.
pub fn find_thumbnail(dir: &Path, stem: &str) -> Option<PathBuf> {
    THUMBNAIL_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", stem, ext)))
        .find(|candidate| candidate.is_file())
}

/// Videos directly inside `dir`, sorted by name, each paired with its thumbnail.
pub fn discover_uploads(dir: &Path) -> Result<Vec<VideoUpload>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

    let mut videos = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?
            .path();
        let is_video = lowercase_extension(&path)
            .map(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false);
        if is_video && path.is_file() {
            videos.push(path);
        }
    }
    videos.sort();

    let uploads = videos
        .into_iter()
        .map(|path| {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            VideoUpload {
                content_type: content_type_for(&path).to_string(),
                thumbnail: find_thumbnail(dir, &stem),
                title: stem,
                description: CLI_UPLOAD_DESCRIPTION.to_string(),
                genre: Some(DEFAULT_GENRE.to_string()),
                path,
            }
        })
        .collect();

    Ok(uploads)
}

/// Summary block printed after the queue drains.
pub fn format_summary(summary: &SubmissionSummary) -> String {
    let mut out = format!(
        "Upload summary:\n  Success: {}\n  Failed: {}",
        summary.succeeded,
        summary.failed.len()
    );
    if !summary.failed.is_empty() {
        out.push_str("\n  Failed files:");
        for (file, reason) in &summary.failed {
            out.push_str(&format!("\n    {} -> {}", file, reason));
        }
    }
    out
}

/// Prints per-item progress to stdout.
#[derive(Default)]
pub struct ConsoleObserver {
    last_percent: AtomicU8,
}

impl SubmissionObserver for ConsoleObserver {
    fn on_status(&self, position: usize, total: usize, item: &BatchItem) {
        match item.status() {
            ItemStatus::Uploading if item.attempts() == 1 => {
                self.last_percent.store(0, Ordering::Relaxed);
                let with_thumbnail = if item.upload.thumbnail.is_some() {
                    " (with thumbnail)"
                } else {
                    ""
                };
                println!(
                    "Uploading [{}/{}] {}{}",
                    position + 1,
                    total,
                    item.filename(),
                    with_thumbnail
                );
            }
            ItemStatus::Uploading => {
                self.last_percent.store(0, Ordering::Relaxed);
                println!("  -> Retrying (attempt {})", item.attempts());
            }
            ItemStatus::Retrying | ItemStatus::Error => println!(
                "\n  -> Error attempt {}: {}",
                item.attempts(),
                item.error().unwrap_or("unknown error")
            ),
            ItemStatus::Done => println!("\n  -> OK"),
            ItemStatus::Pending => {}
        }
    }

    fn on_progress(&self, _position: usize, percent: u8) {
        // Redraw in 10% steps.
        let step = percent / 10 * 10;
        if self.last_percent.swap(step, Ordering::Relaxed) != step {
            print!("\r  {:>3}%", step);
            let _ = std::io::stdout().flush();
        }
    }
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
