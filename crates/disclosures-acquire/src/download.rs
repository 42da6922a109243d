use crate::session::Session;
use anyhow::{Context, Result};
use disclosures_model::{url_filename, DownloadRecord, DownloadStatus, HarvestConfig};
use disclosures_validate::{looks_like_pdf, PARTIAL_SUFFIX};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Download every PDF URL into `out_dir`, in sorted order.
///
/// Files are keyed by the basename of their URL path: a non-empty file of
/// that name already on disk is left alone, so re-runs and duplicate
/// basenames across datasets are cheap. Individual failures are recorded
/// and the run continues; only local I/O errors abort.
pub async fn download_all(
    session: &Session,
    urls: &BTreeSet<String>,
    out_dir: &Path,
    cfg: &HarvestConfig,
) -> Result<Vec<DownloadRecord>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

    let mut records = Vec::with_capacity(urls.len());
    for url in urls {
        records.push(download_one(session, url, out_dir, cfg).await?);
    }

    let ok = records.iter().filter(|r| r.status.is_ok()).count();
    tracing::info!(ok, total = records.len(), dir = %out_dir.display(), "Downloaded (or already existed)");
    Ok(records)
}

/// Download a single PDF, validating its signature before it lands on disk.
pub async fn download_one(
    session: &Session,
    url: &str,
    out_dir: &Path,
    cfg: &HarvestConfig,
) -> Result<DownloadRecord> {
    let filename = url_filename(url);
    let target = out_dir.join(&filename);
    let record = |status, bytes| DownloadRecord {
        url: url.to_string(),
        filename: filename.clone(),
        status,
        bytes,
    };

    if let Ok(meta) = fs::metadata(&target) {
        if meta.is_file() && meta.len() > 0 {
            tracing::info!(file = %filename, "Exists");
            return Ok(record(DownloadStatus::Existed, Some(meta.len())));
        }
    }

    let fetched = match session.fetch_bytes(url, cfg.download_timeout()).await {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!(url, error = %e, "Download failed");
            return Ok(record(
                DownloadStatus::Failed {
                    reason: e.to_string(),
                },
                None,
            ));
        }
    };

    if !fetched.is_success() {
        tracing::warn!(url, status = fetched.status, "HTTP error");
        return Ok(record(
            DownloadStatus::HttpError {
                code: fetched.status,
            },
            None,
        ));
    }

    if !looks_like_pdf(&fetched.body) {
        // Usually an HTML access page served in place of the document
        tracing::warn!(file = %filename, content_type = %fetched.content_type, "Not a PDF");
        return Ok(record(
            DownloadStatus::NotPdf {
                content_type: fetched.content_type,
            },
            None,
        ));
    }

    write_atomic(&target, &fetched.body)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    tracing::info!(file = %filename, bytes = fetched.body.len(), "Downloaded");

    Ok(record(DownloadStatus::Downloaded, Some(fetched.body.len() as u64)))
}

/// Write to `<target>.part`, then rename over `target`.
pub fn write_atomic(target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let partial = partial_path(target);
    fs::write(&partial, bytes)?;
    fs::rename(&partial, target)
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(PARTIAL_SUFFIX);
    target.with_file_name(name)
}
