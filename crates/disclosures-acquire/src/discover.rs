//! Listing-page discovery.
//!
//! The site rejects direct `?page=N` requests from fresh sessions, so the
//! default strategy walks the pager the way a reader would: load the
//! dataset root, pass the age gate, then keep following "Next" until it
//! disappears or leads somewhere already seen.

use crate::age_gate::{self, GateOutcome};
use crate::session::{resolve, Page, Session};
use anyhow::Result;
use disclosures_model::{Dataset, HarvestConfig, HarvestError, PageListing};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strategy {
    /// Follow the pager's "Next" link from the dataset root.
    #[default]
    Follow,
    /// Request `?page=1..=max_page` directly, stopping at the first failure.
    Probe,
}

/// Extra condition a pager candidate must meet besides its CSS selector.
#[derive(Debug, Clone, Copy)]
enum Filter {
    Any,
    HrefHasSlug,
    HrefHasPageQuery,
    TextNext,
    TextNextAndPageQuery,
    TextNextAndSlug,
}

/// Pager candidates, most specific first.
const NEXT_RULES: &[(&str, Filter)] = &[
    ("li.pager__item--next a", Filter::HrefHasSlug),
    ("li.pager__item--next a", Filter::HrefHasPageQuery),
    ("li.pager__item--next a", Filter::Any),
    ("a[rel='next']", Filter::HrefHasSlug),
    ("a[rel='next']", Filter::HrefHasPageQuery),
    (".pager a", Filter::TextNext),
    ("a", Filter::TextNextAndPageQuery),
    ("a", Filter::TextNextAndSlug),
];

/// Discover listing-page URLs for every configured dataset.
pub async fn discover(session: &Session, cfg: &HarvestConfig, strategy: Strategy) -> Result<PageListing> {
    let mut found = Vec::new();

    for dataset in cfg.datasets() {
        tracing::info!(dataset = %dataset, strategy = ?strategy, "Discovering pages");
        let pages = match strategy {
            Strategy::Follow => follow_pages(session, &dataset, cfg).await?,
            Strategy::Probe => probe_pages(session, &dataset, cfg).await?,
        };
        tracing::info!(dataset = %dataset, pages = pages.len(), "Dataset done");
        found.extend(pages);
    }

    let listing = PageListing::from_discovered(found);
    tracing::info!(total = listing.len(), "Total valid page URLs");
    Ok(listing)
}

/// Load a dataset root and pass the age gate. `None` means skip the dataset.
async fn open_dataset(session: &Session, dataset: &Dataset, cfg: &HarvestConfig) -> Result<Option<Page>> {
    let page = match session.goto(&dataset.url, cfg.navigation_timeout()).await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(dataset = %dataset, error = %e, "Base URL unavailable, skipping dataset");
            return Ok(None);
        }
    };

    let (outcome, page) = age_gate::pass_if_present(session, page, cfg).await?;
    match outcome {
        GateOutcome::Passed => tracing::info!("Age verification passed"),
        GateOutcome::NotPresent => tracing::info!("No age gate found (or already passed)"),
        GateOutcome::Failed => {
            tracing::warn!(dataset = %dataset, "Age verification not passed; continuing with gated page")
        }
    }
    Ok(Some(page))
}

/// Walk the pager from the dataset root, recording every page landed on.
pub async fn follow_pages(session: &Session, dataset: &Dataset, cfg: &HarvestConfig) -> Result<Vec<String>> {
    let Some(mut page) = open_dataset(session, dataset, cfg).await? else {
        return Ok(Vec::new());
    };

    let mut seen = HashSet::new();
    let mut found = Vec::new();

    loop {
        if !dataset.contains(&page.url) {
            tracing::debug!(url = %page.url, "Navigated outside dataset, stopping");
            break;
        }
        if !seen.insert(page.url.clone()) {
            tracing::debug!(url = %page.url, "Page already seen, stopping");
            break;
        }
        tracing::info!(url = %page.url, "valid");
        found.push(page.url.clone());

        tokio::time::sleep(cfg.next_delay()).await;

        let Some(href) = find_next_link(&page.html, dataset.slug()) else {
            tracing::debug!(url = %page.url, "No Next link");
            break;
        };
        let next_url = match resolve(&page.url, &href) {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(href = %href, error = %e, "Unusable Next link");
                break;
            }
        };

        match goto_with_retry(session, &next_url, cfg).await {
            Ok(next) => page = next,
            Err(e) => {
                tracing::warn!(url = %next_url, error = %e, "Could not follow Next, stopping dataset");
                break;
            }
        }
    }

    Ok(found)
}

/// Request `?page=N` for N = 1..=max_page until the first failure.
pub async fn probe_pages(session: &Session, dataset: &Dataset, cfg: &HarvestConfig) -> Result<Vec<String>> {
    if open_dataset(session, dataset, cfg).await?.is_none() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for n in 1..=cfg.max_page {
        let url = dataset.page_url(n);
        match session.goto(&url, cfg.navigation_timeout()).await {
            Ok(_) => {
                if n <= 5 || n % 50 == 0 || n == cfg.max_page {
                    tracing::info!(url = %url, "valid");
                } else {
                    tracing::debug!(url = %url, "valid");
                }
                found.push(url);
            }
            Err(e) => {
                tracing::info!(url = %url, error = %e, last_page = n - 1, "Stopping probe");
                break;
            }
        }
    }

    Ok(found)
}

/// Navigate, retrying once after a pause if the first attempt timed out.
async fn goto_with_retry(session: &Session, url: &str, cfg: &HarvestConfig) -> Result<Page, HarvestError> {
    match session.goto(url, cfg.navigation_timeout()).await {
        Err(HarvestError::Timeout(_)) => {
            tracing::debug!(url, "Navigation timed out, retrying once");
            tokio::time::sleep(cfg.timeout_retry_delay()).await;
            session.goto(url, cfg.navigation_timeout()).await
        }
        other => other,
    }
}

/// Find the pager's "Next" href for the dataset identified by `slug`.
///
/// Each rule contributes its first matching anchor; a candidate pointing at
/// a different `data-set-*` listing is rejected and the next rule tried.
pub fn find_next_link(html: &str, slug: &str) -> Option<String> {
    let document = Html::parse_document(html);

    for (css, filter) in NEXT_RULES {
        let selector = Selector::parse(css).expect("valid selector");
        let Some(href) = document
            .select(&selector)
            .filter(|a| rule_matches(a, *filter, slug))
            .find_map(|a| a.value().attr("href").map(|h| h.trim().to_string()))
            .filter(|h| !h.is_empty())
        else {
            continue;
        };

        if href.contains("data-set-") && !href.contains(slug) {
            tracing::debug!(href = %href, slug, "Rejecting Next link to another dataset");
            continue;
        }
        return Some(href);
    }

    None
}

fn rule_matches(anchor: &ElementRef, filter: Filter, slug: &str) -> bool {
    let href = anchor.value().attr("href").unwrap_or_default();
    let says_next = || {
        anchor
            .text()
            .collect::<String>()
            .to_lowercase()
            .contains("next")
    };
    match filter {
        Filter::Any => true,
        Filter::HrefHasSlug => href.contains(slug),
        Filter::HrefHasPageQuery => href.contains("?page="),
        Filter::TextNext => says_next(),
        Filter::TextNextAndPageQuery => href.contains("?page=") && says_next(),
        Filter::TextNextAndSlug => href.contains(slug) && says_next(),
    }
}
