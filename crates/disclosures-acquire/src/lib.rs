//! Harvest PDFs from paginated, age-gated disclosure listings.
//!
//! A run has three phases: discover the listing pages of each dataset
//! (or reuse a saved listing file), collect the PDF links on those pages,
//! then download each PDF once.

pub mod age_gate;
pub mod discover;
pub mod download;
pub mod links;
pub mod output;
pub mod session;

pub use discover::Strategy;
pub use session::Session;

use anyhow::Result;
use disclosures_model::{HarvestConfig, HarvestReport, PageListing};

/// Run the full pipeline: listing, link collection, download, manifest.
///
/// Returns `None` when there was nothing to download (no listing pages or
/// no PDF links), which usually means the site's markup changed.
pub async fn run(cfg: &HarvestConfig, strategy: Strategy, rediscover: bool) -> Result<Option<HarvestReport>> {
    let session = Session::new(cfg)?;
    let mut report = HarvestReport::new(cfg.out_dir.clone(), Vec::new());

    let listing = load_or_discover(&session, cfg, strategy, rediscover).await?;
    if listing.is_empty() {
        tracing::warn!("No valid page URLs found");
        return Ok(None);
    }

    let pdf_urls = links::collect_from_pages(&session, &listing.urls, cfg).await?;
    if pdf_urls.is_empty() {
        tracing::warn!("No PDFs found; the listing markup may have changed");
        return Ok(None);
    }

    report.pages = listing.urls.clone();
    report.records = download::download_all(&session, &pdf_urls, &cfg.out_dir, cfg).await?;
    report.finish();
    output::write_manifest(&report, &cfg.out_dir)?;

    tracing::info!(
        ok = report.ok_count(),
        total = report.total(),
        downloaded = report.downloaded_count(),
        dir = %cfg.out_dir.display(),
        "Done"
    );
    Ok(Some(report))
}

/// Reuse the saved listing file if it has URLs, otherwise discover pages
/// and save them.
pub async fn load_or_discover(
    session: &Session,
    cfg: &HarvestConfig,
    strategy: Strategy,
    rediscover: bool,
) -> Result<PageListing> {
    let path = &cfg.valid_urls_file;
    if !rediscover && path.exists() {
        let listing = PageListing::load(path)?;
        if !listing.is_empty() {
            tracing::info!(urls = listing.len(), path = %path.display(), "Using saved valid page URLs");
            return Ok(listing);
        }
        tracing::info!(path = %path.display(), "Saved listing is empty, discovering");
    }

    let listing = discover::discover(session, cfg, strategy).await?;
    output::write_listing(&listing, path)?;
    Ok(listing)
}
