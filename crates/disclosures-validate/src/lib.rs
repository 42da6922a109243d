use anyhow::Result;
use disclosures_model::{Dataset, PageListing};
use std::fmt;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Leading bytes of every PDF file.
pub const PDF_SIGNATURE: &[u8] = b"%PDF";

/// Suffix of in-progress downloads before they are renamed into place.
pub const PARTIAL_SUFFIX: &str = ".part";

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{file}: expected a PDF, found {kind}")]
    NotPdf { file: String, kind: FileKind },

    #[error("{0}: file is empty")]
    EmptyFile(String),

    #[error("{0}: leftover partial download")]
    LeftoverPartial(String),

    #[error("line {line}: not an absolute http(s) URL: {url}")]
    BadListingUrl { line: usize, url: String },

    #[error("line {line}: {url} is outside every configured dataset")]
    ListingOutsideDatasets { line: usize, url: String },
}

/// What a blob of bytes appears to be, judged by its first bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Html,
    Empty,
    Unknown,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileKind::Pdf => "PDF",
            FileKind::Html => "HTML",
            FileKind::Empty => "empty file",
            FileKind::Unknown => "unknown content",
        };
        f.write_str(name)
    }
}

/// True if the bytes start with the `%PDF` signature.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_SIGNATURE)
}

/// Classify content by signature. HTML usually means an access page
/// slipped through in place of the document.
pub fn sniff(bytes: &[u8]) -> FileKind {
    if bytes.is_empty() {
        return FileKind::Empty;
    }
    if looks_like_pdf(bytes) {
        return FileKind::Pdf;
    }
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let head: Vec<u8> = bytes[start..]
        .iter()
        .take(16)
        .map(u8::to_ascii_lowercase)
        .collect();
    if head.starts_with(b"<!doctype") || head.starts_with(b"<html") {
        FileKind::Html
    } else {
        FileKind::Unknown
    }
}

/// Validate a download directory or a listing file.
///
/// Directories are checked for non-PDF content and leftover partial
/// downloads; any other path is read as a listing file and checked
/// against `datasets`.
pub fn validate(path: &Path, datasets: &[Dataset]) -> Result<()> {
    let errors = if path.is_dir() {
        validate_download_dir(path)?
    } else {
        let listing = PageListing::load(path)?;
        validate_listing(&listing, datasets)
    };

    for e in &errors {
        tracing::warn!("{e}");
    }
    anyhow::ensure!(
        errors.is_empty(),
        "{} validation errors in {}",
        errors.len(),
        path.display()
    );
    tracing::info!(path = %path.display(), "Valid");
    Ok(())
}

/// Check every `*.pdf` in `dir` carries a PDF signature, and that no
/// partial downloads were left behind.
pub fn validate_download_dir(dir: &Path) -> Result<Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut entries: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    entries.sort();

    let mut checked = 0usize;
    for path in &entries {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let lower = name.to_ascii_lowercase();

        if lower.ends_with(PARTIAL_SUFFIX) {
            errors.push(ValidationError::LeftoverPartial(name));
            continue;
        }
        if !lower.ends_with(".pdf") {
            continue;
        }

        checked += 1;
        let mut head = Vec::with_capacity(64);
        std::fs::File::open(path)?.take(64).read_to_end(&mut head)?;
        match sniff(&head) {
            FileKind::Pdf => {}
            FileKind::Empty => errors.push(ValidationError::EmptyFile(name)),
            kind => errors.push(ValidationError::NotPdf { file: name, kind }),
        }
    }

    tracing::debug!(dir = %dir.display(), files = checked, errors = errors.len(), "Checked download directory");
    Ok(errors)
}

/// Check that every listing line is an absolute http(s) URL inside one of
/// `datasets`.
pub fn validate_listing(listing: &PageListing, datasets: &[Dataset]) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (i, raw) in listing.urls.iter().enumerate() {
        let line = i + 1;
        let scheme_ok = url::Url::parse(raw)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false);
        if !scheme_ok {
            errors.push(ValidationError::BadListingUrl {
                line,
                url: raw.clone(),
            });
            continue;
        }
        if !datasets.iter().any(|d| d.contains(raw)) {
            errors.push(ValidationError::ListingOutsideDatasets {
                line,
                url: raw.clone(),
            });
        }
    }

    errors
}
