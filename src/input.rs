//! Turns a path on disk into a [`SelectedFile`].
//!
//! The MIME type is sniffed from the content first; formats without magic bytes
//! (plain text, SVG, ...) fall back to the file extension.

use crate::model::SelectedFile;
use anyhow::{Context, Result};
use bytes::Bytes;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const FALLBACK_MIME: &str = "application/octet-stream";

fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("heic") => "image/heic",
        Some("txt") | Some("md") | Some("log") => "text/plain",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        _ => FALLBACK_MIME,
    }
}

/// Detect the MIME type of `bytes`, using `path` as a hint when the content is not recognized.
pub fn detect_mime(path: &Path, bytes: &[u8]) -> String {
    match infer::get(bytes) {
        Some(kind) => kind.mime_type().to_string(),
        None => mime_from_extension(path).to_string(),
    }
}

/// Content read for type detection when the body itself is not loaded.
const SNIFF_BYTES: u64 = 8 * 1024;

/// Read a file into memory.
///
/// The size check belongs to the validator, so the reported size comes from the filesystem
/// metadata. Files above `max_bytes` are not loaded: only a short prefix is read so the
/// type can still be reported.
pub fn read_selected_file(path: &Path, max_bytes: u64) -> Result<SelectedFile> {
    let meta = std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
    if !meta.is_file() {
        anyhow::bail!("{} is not a regular file", path.display());
    }
    let size_bytes = meta.len();
    let budget = if size_bytes > max_bytes {
        SNIFF_BYTES
    } else {
        // The file may grow between stat and read; never take more than the cap allows.
        max_bytes.saturating_add(1)
    };

    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut bytes = Vec::with_capacity(size_bytes.min(budget) as usize);
    file.take(budget)
        .read_to_end(&mut bytes)
        .with_context(|| format!("read {}", path.display()))?;

    let mime_type = detect_mime(path, &bytes);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    log::debug!(
        "loaded {} ({} of {} bytes, {})",
        path.display(),
        bytes.len(),
        size_bytes,
        mime_type
    );

    Ok(SelectedFile {
        name,
        mime_type,
        size_bytes: size_bytes.max(bytes.len() as u64),
        bytes: Bytes::from(bytes),
    })
}

/// [`read_selected_file`] on the blocking pool.
pub async fn load_selected_file(path: &Path, max_bytes: u64) -> Result<SelectedFile> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || read_selected_file(&owned, max_bytes))
        .await
        .context("file loader task failed")?
}
