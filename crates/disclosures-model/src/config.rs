use crate::dataset::{datasets_from, Dataset, DEFAULT_DATASETS};
use crate::error::HarvestError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Desktop Chrome user agent; the site's bot blocker rejects obvious tools.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Runtime settings for a harvest run.
///
/// Every field has a default, so a JSON config file only needs the keys it
/// wants to change. CLI flags are applied on top after loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Listing root URLs to harvest.
    pub datasets: Vec<String>,
    pub user_agent: String,
    pub accept_language: String,
    /// Pause after passing the age gate so the session settles.
    pub age_gate_wait_ms: u64,
    /// Pause before following each "Next" link.
    pub next_delay_ms: u64,
    pub navigation_timeout_ms: u64,
    pub age_gate_timeout_ms: u64,
    pub download_timeout_ms: u64,
    /// Pause before retrying a navigation that timed out.
    pub timeout_retry_delay_ms: u64,
    /// Highest `?page=N` tried by the probe strategy.
    pub max_page: u32,
    /// `name=value` cookie presented when the gate has no followable link.
    pub age_cookie: Option<String>,
    pub out_dir: PathBuf,
    /// Listing file of discovered page URLs, one per line.
    pub valid_urls_file: PathBuf,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            datasets: DEFAULT_DATASETS.iter().map(|s| s.to_string()).collect(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            age_gate_wait_ms: 4_000,
            next_delay_ms: 1_200,
            navigation_timeout_ms: 60_000,
            age_gate_timeout_ms: 30_000,
            download_timeout_ms: 120_000,
            timeout_retry_delay_ms: 1_000,
            max_page: 1_000,
            age_cookie: None,
            out_dir: PathBuf::from("doj_epstein_datasets_9_10_11_pdfs"),
            valid_urls_file: PathBuf::from("valid_page_urls.txt"),
        }
    }
}

impl HarvestConfig {
    /// Load a config from a JSON file; missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, HarvestError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn datasets(&self) -> Vec<Dataset> {
        datasets_from(&self.datasets)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn age_gate_timeout(&self) -> Duration {
        Duration::from_millis(self.age_gate_timeout_ms)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_millis(self.download_timeout_ms)
    }

    pub fn age_gate_wait(&self) -> Duration {
        Duration::from_millis(self.age_gate_wait_ms)
    }

    pub fn next_delay(&self) -> Duration {
        Duration::from_millis(self.next_delay_ms)
    }

    pub fn timeout_retry_delay(&self) -> Duration {
        Duration::from_millis(self.timeout_retry_delay_ms)
    }
}
