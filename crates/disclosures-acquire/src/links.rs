use crate::age_gate::{self, GateOutcome};
use crate::session::Session;
use anyhow::Result;
use disclosures_model::{normalize_pdf_url, HarvestConfig};
use reqwest::Url;
use scraper::{Html, Selector};
use std::collections::BTreeSet;

/// Href endings treated as PDF links. `.ppdf` is a typo the listings carry.
const PDF_SUFFIXES: &[&str] = &[".pdf", ".PDF", ".ppdf", ".PPDF"];

/// Extract every PDF link on a listing page as an absolute, normalized URL.
pub fn collect_pdf_links(html: &str, base_url: &str) -> BTreeSet<String> {
    let document = Html::parse_document(html);
    let anchor_sel = Selector::parse("a[href]").expect("valid selector");
    let base = Url::parse(base_url).ok();

    let mut links = BTreeSet::new();
    for anchor in document.select(&anchor_sel) {
        let Some(href) = anchor.value().attr("href").map(str::trim) else {
            continue;
        };
        if !PDF_SUFFIXES.iter().any(|s| href.ends_with(s)) {
            continue;
        }

        let absolute = match &base {
            Some(b) => b.join(href),
            None => Url::parse(href),
        };
        match absolute {
            Ok(url) => {
                links.insert(normalize_pdf_url(url.as_str()));
            }
            Err(e) => tracing::debug!(href, error = %e, "Skipping unresolvable PDF link"),
        }
    }

    links
}

/// Visit every listing page and gather the union of their PDF links.
///
/// Pages that time out or answer with an error status are skipped. The age
/// gate is passed the first time it shows up.
pub async fn collect_from_pages(
    session: &Session,
    page_urls: &[String],
    cfg: &HarvestConfig,
) -> Result<BTreeSet<String>> {
    let mut all = BTreeSet::new();
    let mut gate_tried = false;

    for (i, url) in page_urls.iter().enumerate() {
        let page = match session.goto(url, cfg.navigation_timeout()).await {
            Ok(p) => p,
            Err(e) if e.is_page_unavailable() => {
                tracing::warn!(url = %url, error = %e, "Skipping listing page");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let page = if !gate_tried && age_gate::is_present(&page.html) {
            gate_tried = true;
            let (outcome, page) = age_gate::pass_if_present(session, page, cfg).await?;
            if outcome == GateOutcome::Passed {
                tracing::info!("Age verification passed");
            }
            page
        } else {
            page
        };

        let found = collect_pdf_links(&page.html, &page.url);
        let before = all.len();
        all.extend(found);
        tracing::debug!(
            page = i + 1,
            of = page_urls.len(),
            url = %page.url,
            new = all.len() - before,
            "Collected PDF links"
        );
    }

    tracing::info!(pages = page_urls.len(), pdfs = all.len(), "Total unique PDFs found");
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
        <div class="view-content">
          <ul>
            <li><a href="/epstein/files/DataSet%209/EFTA00039025.pdf">EFTA00039025.pdf</a></li>
            <li><a href="/epstein/files/DataSet%209/EFTA00039026.PDF">EFTA00039026.PDF</a></li>
            <li><a href="https://www.justice.gov/epstein/files/DataSet%209/EFTA00039027.ppdf">typo</a></li>
            <li><a href="/epstein/files/DataSet%209/EFTA00039025.pdf">duplicate</a></li>
            <li><a href="/epstein/files/DataSet%209/index.html">not a pdf</a></li>
            <li><a href="/epstein/files/DataSet%209/EFTA.pdf?download=1">query string</a></li>
            <li><a>no href</a></li>
          </ul>
        </div>
        <nav class="pager"><ul><li class="pager__item--next"><a href="?page=1">Next</a></li></ul></nav>
        </body></html>
    "#;

    #[test]
    fn test_collect_pdf_links() {
        let links = collect_pdf_links(
            LISTING,
            "https://www.justice.gov/epstein/doj-disclosures/data-set-9-files",
        );
        let expected: BTreeSet<String> = [
            "https://www.justice.gov/epstein/files/DataSet%209/EFTA00039025.pdf",
            "https://www.justice.gov/epstein/files/DataSet%209/EFTA00039026.PDF",
            "https://www.justice.gov/epstein/files/DataSet%209/EFTA00039027.pdf",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        assert_eq!(links, expected);
    }

    #[test]
    fn test_relative_links_resolve_against_page() {
        let html = r#"<a href="docs/a.pdf">a</a>"#;
        let links = collect_pdf_links(html, "https://example.org/listing/page");
        assert!(links.contains("https://example.org/listing/docs/a.pdf"));
    }

    #[test]
    fn test_no_links() {
        assert!(collect_pdf_links("<p>nothing here</p>", "https://example.org/").is_empty());
    }
}
