use crate::error::HarvestError;
use std::collections::BTreeSet;
use std::path::Path;

/// The listing file: every discovered listing-page URL, one per line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageListing {
    pub urls: Vec<String>,
}

impl PageListing {
    /// Build a listing from discovered URLs, sorted and de-duplicated.
    pub fn from_discovered<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = urls.into_iter().map(Into::into).collect();
        Self {
            urls: set.into_iter().collect(),
        }
    }

    /// Parse listing text. Lines are trimmed; blank lines are skipped.
    pub fn parse(text: &str) -> Self {
        Self {
            urls: text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Render as sorted unique URLs joined by newlines, no trailing newline.
    pub fn render(&self) -> String {
        let set: BTreeSet<&str> = self.urls.iter().map(String::as_str).collect();
        set.into_iter().collect::<Vec<_>>().join("\n")
    }

    pub fn load(path: &Path) -> Result<Self, HarvestError> {
        Ok(Self::parse(&std::fs::read_to_string(path)?))
    }

    pub fn save(&self, path: &Path) -> Result<(), HarvestError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render())?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
