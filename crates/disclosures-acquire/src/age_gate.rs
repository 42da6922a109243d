use crate::session::{resolve, Page, Session};
use anyhow::Result;
use disclosures_model::HarvestConfig;
use scraper::{ElementRef, Html, Selector};

/// Question text shown by the interstitial.
pub const AGE_QUESTION: &str = "Are you 18 years of age or older?";

/// Selectors tried, in order, for the "Yes" answer.
const YES_SELECTORS: &[&str] = &["a", "button", "[role='button']"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YesControl {
    /// An anchor with a followable href.
    Link(String),
    /// A script-driven control (button, or anchor without a real target).
    Script { id: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    NotPresent,
    Passed,
    Failed,
}

/// Whether the page is showing the age question, ignoring case.
pub fn is_present(html: &str) -> bool {
    let document = Html::parse_document(html);
    let text = collapse_whitespace(&document.root_element().text().collect::<String>());
    text.to_lowercase().contains(&AGE_QUESTION.to_lowercase())
}

/// Locate the "Yes" control, preferring anchors, then buttons, then ARIA buttons.
pub fn find_yes_control(html: &str) -> Option<YesControl> {
    let document = Html::parse_document(html);

    for sel in YES_SELECTORS {
        let selector = Selector::parse(sel).expect("valid selector");
        let Some(el) = document
            .select(&selector)
            .find(|el| element_text(el).to_lowercase().contains("yes"))
        else {
            continue;
        };

        let href = el
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|h| is_followable(h));
        return Some(match (el.value().name(), href) {
            ("a", Some(h)) => YesControl::Link(h.to_string()),
            _ => YesControl::Script {
                id: el.value().attr("id").map(str::to_string),
            },
        });
    }

    None
}

/// Pass the age gate on `page` if it is showing.
///
/// Follows the "Yes" link when there is one; for script-driven gates the
/// configured `age_cookie` is presented instead. Either way the original
/// page is reloaded and returned so the caller continues from verified
/// content. When the gate cannot be passed the given page is returned
/// unchanged with [`GateOutcome::Failed`].
pub async fn pass_if_present(
    session: &Session,
    page: Page,
    cfg: &HarvestConfig,
) -> Result<(GateOutcome, Page)> {
    if !is_present(&page.html) {
        return Ok((GateOutcome::NotPresent, page));
    }
    tracing::debug!(url = %page.url, "Age verification prompt found");

    match find_yes_control(&page.html) {
        Some(YesControl::Link(href)) => {
            let target = resolve(&page.url, &href)?;
            if let Err(e) = session.goto(&target, cfg.age_gate_timeout()).await {
                tracing::warn!(url = %target, error = %e, "Following age verification link failed");
                return Ok((GateOutcome::Failed, page));
            }
        }
        control => {
            let Some(cookie) = cfg.age_cookie.as_deref() else {
                tracing::warn!(
                    control = ?control,
                    "Age gate is script-driven and no age_cookie is configured"
                );
                return Ok((GateOutcome::Failed, page));
            };
            session.add_cookie(&page.url, cookie)?;
        }
    }

    tokio::time::sleep(cfg.age_gate_wait()).await;

    let reloaded = match session.goto(&page.url, cfg.navigation_timeout()).await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(url = %page.url, error = %e, "Reload after age verification failed");
            return Ok((GateOutcome::Failed, page));
        }
    };

    if is_present(&reloaded.html) {
        Ok((GateOutcome::Failed, reloaded))
    } else {
        Ok((GateOutcome::Passed, reloaded))
    }
}

fn is_followable(href: &str) -> bool {
    !href.is_empty() && !href.starts_with('#') && !href.to_ascii_lowercase().starts_with("javascript:")
}

fn element_text(el: &ElementRef) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
