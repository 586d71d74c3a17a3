use crate::error::{Result, ScanError};
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}")
        .expect("hardcoded regex pattern is valid")
});

static EXACT_EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("hardcoded regex pattern is valid")
});

// (selector, attribute) pairs that carry navigable targets
const LINK_SOURCES: &[(&str, &str)] = &[
    ("a[href]", "href"),
    ("area[href]", "href"),
    ("iframe[src]", "src"),
    ("frame[src]", "src"),
];

/// Links and emails pulled out of one page, each in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    pub links: Vec<String>,
    pub emails: Vec<String>,
    /// hrefs that looked navigable but could not be resolved
    pub malformed: usize,
}

impl ParsedPage {
    pub fn degraded(&self) -> Option<ScanError> {
        (self.malformed > 0).then_some(ScanError::ParseDegraded(self.malformed))
    }
}

/// Parse an absolute http(s) URL and reduce it to its identity form
/// (fragment stripped, host lowercased, empty path as `/`).
pub fn normalize_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ScanError::InvalidUrl(format!(
            "'{}' is not an http(s) URL",
            raw
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ScanError::InvalidUrl(format!("'{}' has no host", raw)));
    }
    url.set_fragment(None);
    Ok(url)
}

enum Href {
    Link(Url),
    Ignored,
    Malformed,
}

fn resolve_href(base: &Url, href: &str) -> Href {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return Href::Ignored;
    }

    match base.join(href) {
        Ok(mut url) => {
            // javascript:, tel:, mailto:, data: and friends
            if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
                return Href::Ignored;
            }
            url.set_fragment(None);
            Href::Link(url)
        }
        Err(_) => Href::Malformed,
    }
}

/// Recipients of a `mailto:` target; `None` for any other scheme.
/// Handles comma-separated lists and percent-encoded addresses.
fn mailto_addresses(href: &str) -> Option<Vec<String>> {
    let href = href.trim();
    let rest = href
        .get(..7)
        .filter(|scheme| scheme.eq_ignore_ascii_case("mailto:"))
        .map(|_| &href[7..])?;
    let recipients = rest.split('?').next().unwrap_or_default();
    let recipients = urlencoding::decode(recipients)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| recipients.to_string());

    Some(
        recipients
            .split(',')
            .map(str::trim)
            .filter(|address| EXACT_EMAIL_REGEX.is_match(address))
            .map(str::to_string)
            .collect(),
    )
}

fn push_unique(seen: &mut HashSet<String>, out: &mut Vec<String>, value: String) {
    if seen.insert(value.clone()) {
        out.push(value);
    }
}

/// Extract outbound links and email addresses from `html`.
///
/// Relative targets resolve against `base_url`, or against the document's
/// `<base href>` when it declares a valid one. Only http(s) links are kept.
/// Emails come from `mailto:` targets and from a pattern match over the
/// page text. Never fails: unparseable hrefs are counted in
/// [`ParsedPage::malformed`] and skipped.
pub fn parse_page(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);
    let mut parsed = ParsedPage::default();

    let base = Selector::parse("base[href]")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| base_url.join(href.trim()).ok())
        .unwrap_or_else(|| base_url.clone());

    let mut seen_links = HashSet::new();
    let mut seen_emails = HashSet::new();

    for (css, attr) in LINK_SOURCES {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        for element in document.select(&selector) {
            let Some(target) = element.value().attr(attr) else {
                continue;
            };

            if let Some(emails) = mailto_addresses(target) {
                for email in emails {
                    push_unique(&mut seen_emails, &mut parsed.emails, email);
                }
                continue;
            }

            match resolve_href(&base, target) {
                Href::Link(url) => {
                    push_unique(&mut seen_links, &mut parsed.links, url.to_string());
                }
                Href::Ignored => {}
                Href::Malformed => {
                    debug!("Unresolvable link target {:?} on {}", target, base_url);
                    parsed.malformed += 1;
                }
            }
        }
    }

    let text = document.root_element().text().collect::<Vec<_>>().join(" ");
    for found in EMAIL_REGEX.find_iter(&text) {
        push_unique(&mut seen_emails, &mut parsed.emails, found.as_str().to_string());
    }

    parsed
}
