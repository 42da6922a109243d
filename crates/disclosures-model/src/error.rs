use thiserror::Error;

/// Failures that the harvest pipeline distinguishes when deciding whether
/// to skip a page, stop a dataset, or abort.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("timed out loading {0}")]
    Timeout(String),

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl HarvestError {
    /// True for failures that mean "this page is unavailable" rather than
    /// "something is broken locally".
    pub fn is_page_unavailable(&self) -> bool {
        matches!(
            self,
            HarvestError::Timeout(_) | HarvestError::Status { .. } | HarvestError::Request { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_unavailable() {
        assert!(HarvestError::Timeout("u".into()).is_page_unavailable());
        assert!(HarvestError::Status { url: "u".into(), status: 404 }.is_page_unavailable());
        assert!(!HarvestError::InvalidUrl("u".into()).is_page_unavailable());
        assert_eq!(
            HarvestError::Status { url: "https://x.org".into(), status: 403 }.to_string(),
            "HTTP 403 for https://x.org"
        );
    }
}
