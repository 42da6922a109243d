/// Listing roots harvested when no datasets are configured.
pub const DEFAULT_DATASETS: &[&str] = &[
    "https://www.justice.gov/epstein/doj-disclosures/data-set-9-files",
    "https://www.justice.gov/epstein/doj-disclosures/data-set-10-files",
    "https://www.justice.gov/epstein/doj-disclosures/data-set-11-files",
];

/// A named dataset: the root URL of a paginated listing of PDF links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub url: String,
}

impl Dataset {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// The root URL without a trailing slash.
    pub fn root(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Last path segment of the root (e.g., "data-set-10-files").
    pub fn slug(&self) -> &str {
        self.root().rsplit('/').next().unwrap_or_default()
    }

    /// Whether `url` still belongs to this dataset's listing.
    ///
    /// Substring match on the root, so `?page=N` variants count.
    pub fn contains(&self, url: &str) -> bool {
        url.contains(self.root())
    }

    /// URL of the Nth listing page, as the site's pager writes it.
    pub fn page_url(&self, page: u32) -> String {
        format!("{}?page={page}", self.root())
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

/// Build datasets from URL strings, falling back to [`DEFAULT_DATASETS`].
pub fn datasets_from(urls: &[String]) -> Vec<Dataset> {
    if urls.is_empty() {
        DEFAULT_DATASETS.iter().map(|u| Dataset::new(*u)).collect()
    } else {
        urls.iter().map(|u| Dataset::new(u.clone())).collect()
    }
}
