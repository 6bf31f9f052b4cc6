//! Link discoverer.
//!
//! Enumerates anchors on a rendered page and filters them down to the
//! same-origin, funding-flavored candidates worth extracting. The filter
//! is pure; only the enumeration touches the page.

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::config::SiteConfig;
use crate::error::AppResult;
use crate::infrastructure::PageDriver;

/// Default keyword pattern for candidate detail pages.
pub const DEFAULT_KEYWORD_PATTERN: &str =
    r"(?i)funding|programme|program\b|apply|grant|loan|tender|opportunit|finance|support";

const ANCHOR_ENUM_JS: &str = r#"
    Array.from(document.querySelectorAll('a[href]')).map(a => ({
        href: a.getAttribute('href') || '',
        text: (a.textContent || '').trim().slice(0, 200)
    }))
"#;

#[derive(Debug, Clone, Deserialize)]
pub struct Anchor {
    pub href: String,
    pub text: String,
}

/// Discover candidate detail-page links from the page the driver is
/// currently on.
pub async fn discover_links(
    driver: &PageDriver,
    base_url: &str,
    site: &SiteConfig,
) -> AppResult<Vec<String>> {
    let anchors: Vec<Anchor> = driver.eval_as(ANCHOR_ENUM_JS).await?;
    debug!("[{}] {} anchors on entry page", site.name, anchors.len());

    let pattern = site
        .keyword_pattern
        .as_deref()
        .unwrap_or(DEFAULT_KEYWORD_PATTERN);

    Ok(filter_links(&anchors, base_url, pattern, site.max_links))
}

/// Keyword-filtered, same-origin, absolute, deduplicated candidate URLs in
/// first-seen order. Malformed URLs are skipped silently.
pub fn filter_links(
    anchors: &[Anchor],
    base_url: &str,
    keyword_pattern: &str,
    max_links: usize,
) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };
    let Ok(keyword_re) = regex::Regex::new(keyword_pattern) else {
        return Vec::new();
    };

    let mut out: Vec<String> = Vec::new();
    for anchor in anchors {
        let href = anchor.href.trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
            || href.starts_with("javascript:")
        {
            continue;
        }

        let Ok(mut resolved) = base.join(href) else {
            continue;
        };
        resolved.set_fragment(None);

        if !same_origin(&base, &resolved) {
            continue;
        }
        if !keyword_re.is_match(href) && !keyword_re.is_match(&anchor.text) {
            continue;
        }

        let absolute = resolved.to_string();
        if absolute == base.as_str() || out.contains(&absolute) {
            continue;
        }

        out.push(absolute);
        if out.len() == max_links {
            break;
        }
    }
    out
}

/// Scheme, host and port all identical.
fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme() && a.host_str() == b.host_str() && a.port_or_known_default() == b.port_or_known_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(href: &str, text: &str) -> Anchor {
        Anchor {
            href: href.to_string(),
            text: text.to_string(),
        }
    }

    const BASE: &str = "https://x.org/funding/";

    #[test]
    fn same_origin_keyword_links_survive_off_origin_dropped() {
        let anchors = vec![
            anchor("/funding/youth-grant", "Youth Grant"),
            anchor("https://x.org/funding/sme-loan", "SME Loan"),
            anchor("https://other.org/funding/big-grant", "Big Grant"),
        ];
        let out = filter_links(&anchors, BASE, DEFAULT_KEYWORD_PATTERN, 10);
        assert_eq!(
            out,
            vec![
                "https://x.org/funding/youth-grant".to_string(),
                "https://x.org/funding/sme-loan".to_string(),
            ]
        );
    }

    #[test]
    fn non_http_targets_are_skipped() {
        let anchors = vec![
            anchor("mailto:grants@x.org", "Email about funding"),
            anchor("tel:+27115550199", "Call the funding desk"),
            anchor("#apply", "Apply"),
            anchor("javascript:void(0)", "Apply for funding"),
        ];
        assert!(filter_links(&anchors, BASE, DEFAULT_KEYWORD_PATTERN, 10).is_empty());
    }

    #[test]
    fn keyword_can_match_text_instead_of_href() {
        let anchors = vec![
            anchor("/pages/x17", "Tender opportunities"),
            anchor("/pages/x18", "Board members"),
        ];
        let out = filter_links(&anchors, BASE, DEFAULT_KEYWORD_PATTERN, 10);
        assert_eq!(out, vec!["https://x.org/pages/x17".to_string()]);
    }

    #[test]
    fn duplicates_and_fragments_collapse() {
        let anchors = vec![
            anchor("/funding/a", "Grant A"),
            anchor("/funding/a#details", "Grant A details"),
            anchor("/funding/a", "Grant A again"),
        ];
        let out = filter_links(&anchors, BASE, DEFAULT_KEYWORD_PATTERN, 10);
        assert_eq!(out, vec!["https://x.org/funding/a".to_string()]);
    }

    #[test]
    fn max_links_caps_output() {
        let anchors: Vec<Anchor> = (0..10)
            .map(|i| anchor(&format!("/grant/{}", i), "Grant"))
            .collect();
        let out = filter_links(&anchors, BASE, DEFAULT_KEYWORD_PATTERN, 2);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn malformed_base_yields_empty() {
        assert!(filter_links(&[anchor("/a", "grant")], "not a url", DEFAULT_KEYWORD_PATTERN, 5).is_empty());
    }

    #[test]
    fn scheme_mismatch_is_off_origin() {
        let anchors = vec![anchor("http://x.org/funding/a", "Grant A")];
        assert!(filter_links(&anchors, BASE, DEFAULT_KEYWORD_PATTERN, 5).is_empty());
    }
}
