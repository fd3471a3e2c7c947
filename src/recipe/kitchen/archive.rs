// src/recipe/kitchen/archive.rs

//! Archive and source file utilities for the Kitchen

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Maximum retry attempts for failed downloads
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds
const RETRY_DELAY_MS: u64 = 1000;

/// Buffer size for streaming downloads (8 KB)
const STREAM_BUFFER_SIZE: usize = 8192;

/// Download options
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub timeout: Duration,
    pub show_progress: bool,
}

/// Fetch a source URL into `dest`
///
/// `http://` and `https://` URLs are downloaded; `file://` URLs and plain
/// paths are copied, which lets mirrors and tests work offline.
pub fn fetch_url(url: &str, dest: &Path, options: &DownloadOptions) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        return download_file(url, dest, options);
    }

    let local = url.strip_prefix("file://").unwrap_or(url);
    debug!("Copying local source {}", local);
    fs::copy(local, dest)
        .map_err(|e| Error::Network(format!("Failed to read local source {}: {}", local, e)))?;
    Ok(())
}

/// Download a file over HTTP with retry support
pub fn download_file(url: &str, dest: &Path, options: &DownloadOptions) -> Result<()> {
    let client = Client::builder()
        .timeout(options.timeout)
        .build()
        .map_err(|e| Error::Network(format!("Failed to create HTTP client: {e}")))?;

    let mut attempt = 0;
    loop {
        attempt += 1;
        match download_once(&client, url, dest, options.show_progress) {
            Ok(bytes) => {
                info!("Downloaded {} ({} bytes)", url, bytes);
                return Ok(());
            }
            Err(e) => {
                let _ = fs::remove_file(dest);
                if attempt >= MAX_RETRIES {
                    return Err(Error::Network(format!(
                        "Failed to download {url} after {attempt} attempts: {e}"
                    )));
                }
                warn!("Download attempt {} failed: {}, retrying...", attempt, e);
                std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64));
            }
        }
    }
}

fn download_once(client: &Client, url: &str, dest: &Path, show_progress: bool) -> Result<u64> {
    let mut response = client
        .get(url)
        .send()
        .map_err(|e| Error::Network(e.to_string()))?;

    if !response.status().is_success() {
        return Err(Error::Network(format!("HTTP {} from {}", response.status(), url)));
    }

    let total_size = response.content_length().unwrap_or(0);
    let progress = if show_progress {
        let pb = ProgressBar::new(total_size);
        if let Ok(style) = ProgressStyle::with_template(
            "{msg} [{bar:40}] {bytes}/{total_bytes} ({bytes_per_sec})",
        ) {
            pb.set_style(style.progress_chars("=> "));
        }
        pb.set_message(url.rsplit('/').next().unwrap_or(url).to_string());
        Some(pb)
    } else {
        None
    };

    let mut file = File::create(dest)?;
    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; STREAM_BUFFER_SIZE];

    loop {
        let bytes_read = response
            .read(&mut buffer)
            .map_err(|e| Error::Network(format!("Failed to read response: {e}")))?;
        if bytes_read == 0 {
            break;
        }
        file.write_all(&buffer[..bytes_read])?;
        downloaded += bytes_read as u64;
        if let Some(pb) = &progress {
            pb.set_position(downloaded);
        }
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    Ok(downloaded)
}

/// Extract a gzip-compressed tarball into `dest`
///
/// Entries that would land outside `dest` are rejected.
pub fn extract_tar_gz(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive)?;
    let mut tar = tar::Archive::new(GzDecoder::new(file));
    tar.set_preserve_permissions(true);

    let entries = tar
        .entries()
        .map_err(|e| corrupt(archive, e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| corrupt(archive, e))?;
        let path = entry.path().map_err(|e| corrupt(archive, e))?.into_owned();

        if path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
        {
            return Err(Error::Extraction(format!(
                "{}: entry escapes the extraction directory: {}",
                archive.display(),
                path.display()
            )));
        }

        entry.unpack_in(dest).map_err(|e| corrupt(archive, e))?;
    }

    Ok(())
}

fn corrupt(archive: &Path, e: io::Error) -> Error {
    Error::Extraction(format!("{}: {}", archive.display(), e))
}

/// Locate the expected top-level directory after extraction
///
/// Falls back to the only directory present when the name differs.
pub fn find_extracted_root(dest: &Path, expected: &str) -> Result<PathBuf> {
    let candidate = dest.join(expected);
    if candidate.is_dir() {
        return Ok(candidate);
    }

    let dirs: Vec<PathBuf> = fs::read_dir(dest)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.path())
        .collect();

    match dirs.as_slice() {
        [only] => {
            warn!(
                "Archive root is {} rather than {}",
                only.display(),
                expected
            );
            Ok(only.clone())
        }
        _ => Err(Error::Extraction(format!(
            "Expected top-level directory {} in archive",
            expected
        ))),
    }
}
