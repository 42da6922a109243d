use anyhow::{Context, Result};
use disclosures_model::{HarvestReport, PageListing};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the download manifest inside the output directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Write the listing file of discovered page URLs.
pub fn write_listing(listing: &PageListing, path: &Path) -> Result<()> {
    listing
        .save(path)
        .with_context(|| format!("Failed to write listing {}", path.display()))?;
    tracing::info!(path = %path.display(), urls = listing.len(), "Saved valid page URLs");
    Ok(())
}

/// Write `manifest.json` describing every download outcome of a run.
pub fn write_manifest(report: &HarvestReport, out_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(report)?;
    fs::write(&path, &json)?;
    tracing::info!(
        path = %path.display(),
        records = report.total(),
        ok = report.ok_count(),
        "Wrote download manifest"
    );
    Ok(path)
}
