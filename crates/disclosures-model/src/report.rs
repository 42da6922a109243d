use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of fetching one PDF URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DownloadStatus {
    Downloaded,
    /// A non-empty file with the same name was already on disk.
    Existed,
    HttpError { code: u16 },
    /// The body did not carry a PDF signature (usually an HTML block page).
    NotPdf { content_type: String },
    Failed { reason: String },
}

impl DownloadStatus {
    /// Downloaded or already present.
    pub fn is_ok(&self) -> bool {
        matches!(self, DownloadStatus::Downloaded | DownloadStatus::Existed)
    }
}

/// One row of the download manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub url: String,
    pub filename: String,
    #[serde(flatten)]
    pub status: DownloadStatus,
    /// Bytes written, or the size of the existing file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
}

/// Summary of a full harvest run, written as `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestReport {
    pub started_at: String,
    pub finished_at: String,
    pub out_dir: PathBuf,
    /// Listing pages the PDF links were collected from.
    pub pages: Vec<String>,
    pub records: Vec<DownloadRecord>,
}

impl HarvestReport {
    pub fn new(out_dir: PathBuf, pages: Vec<String>) -> Self {
        Self {
            started_at: chrono::Utc::now().to_rfc3339(),
            finished_at: String::new(),
            out_dir,
            pages,
            records: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = chrono::Utc::now().to_rfc3339();
    }

    pub fn ok_count(&self) -> usize {
        self.records.iter().filter(|r| r.status.is_ok()).count()
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn downloaded_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.status == DownloadStatus::Downloaded)
            .count()
    }
}

/// Basename of the URL path, or `download.pdf` when the path has none.
pub fn url_filename(url: &str) -> String {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => "download.pdf".to_string(),
    }
}

/// Fix the `.ppdf` typo some listing pages carry.
pub fn normalize_pdf_url(url: &str) -> String {
    if url.to_ascii_lowercase().ends_with(".ppdf") {
        format!("{}.pdf", &url[..url.len() - 5])
    } else {
        url.to_string()
    }
}
