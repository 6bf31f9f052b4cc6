//! Page extractor.
//!
//! Drives one browser page from navigation to an assembled
//! [`ProgramRecord`]. The DOM is read through a single evaluation that
//! builds a lightweight snapshot from the queried nodes; the rendered
//! document is never mutated. Everything after the snapshot is pure and
//! unit-tested as such.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tokio::time::{sleep, Duration};
use tracing::debug;

use crate::config::SiteConfig;
use crate::error::{AppResult, ExtractionError};
use crate::extract::{fields, marketing, normalize};
use crate::infrastructure::PageDriver;
use crate::models::ProgramRecord;
use crate::services::ai_gate::AiGate;
use crate::services::link_discovery::{self, Anchor};

/// Post-DOMContentLoaded settle time for late-arriving content.
const SETTLE_DELAY: Duration = Duration::from_millis(1200);

/// Summary candidate length window.
const SUMMARY_MIN_CHARS: usize = 60;
const SUMMARY_MAX_CHARS: usize = 900;
/// Final summary budget; trimmed to a sentence boundary within it.
const SUMMARY_BUDGET_CHARS: usize = 420;

/// Subprogram anchors whose href or text hits one of these are site
/// plumbing, not programs.
static SUBLINK_EXCLUDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)about|contact|career|privacy|terms|cookie|news|blog|event|login|register|sitemap|faq")
        .unwrap()
});

/// Everything the single DOM evaluation brings back.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub title: String,
    pub doc_title: String,
    pub text: String,
    pub paragraphs: Vec<String>,
    pub eligibility: String,
    pub sub_links: Vec<Anchor>,
}

/// One extracted page: the record plus any nested subprogram links found
/// on it.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub record: ProgramRecord,
    pub subprogram_links: Vec<String>,
}

/// Extract one program page. `parent` tags the record as a subprogram of
/// an already-extracted parent.
pub async fn extract_program(
    driver: &PageDriver,
    url: &str,
    site: &SiteConfig,
    parent: Option<(&str, &str)>,
    ai: &AiGate,
) -> AppResult<Extraction> {
    driver.navigate(url).await?;
    sleep(SETTLE_DELAY).await;

    let snapshot: PageSnapshot = driver.eval_as(snapshot_js(site)).await?;
    if snapshot.text.trim().is_empty()
        && snapshot.title.trim().is_empty()
        && snapshot.doc_title.trim().is_empty()
    {
        return Err(ExtractionError::NoContent {
            url: url.to_string(),
        }
        .into());
    }
    debug!(
        "snapshot of {}: {} chars text, {} paragraphs, {} sub-links",
        url,
        snapshot.text.len(),
        snapshot.paragraphs.len(),
        snapshot.sub_links.len()
    );

    let mut extraction = assemble_record(&snapshot, url, site, parent);
    let text = normalize::clean_text(&snapshot.text);
    enhance(&mut extraction.record, &text, ai).await;
    Ok(extraction)
}

/// The one evaluation: locate main content, skip noise subtrees, pull the
/// title, walk headings for an eligibility section, gather paragraphs and
/// subprogram anchors. Builds a fresh structure; never touches the live
/// tree.
fn snapshot_js(site: &SiteConfig) -> String {
    format!(
        r#"
        (() => {{
            const NOISE = 'nav, header, footer, aside, .sidebar, .side-bar, .cookie, .cookies, ' +
                '.cookie-banner, .testimonial, .testimonials, .social, .social-share, .share, ' +
                '.breadcrumb, .breadcrumbs, .menu, .site-nav';
            const root = document.querySelector('main')
                || document.querySelector('article')
                || document.querySelector('[role="main"]')
                || document.querySelector('.content, .main-content, #content, #main, .page-content')
                || document.body;
            const isNoise = el => el && el.closest(NOISE) !== null;

            const chunks = [];
            const walker = document.createTreeWalker(root, NodeFilter.SHOW_TEXT);
            let node;
            while ((node = walker.nextNode())) {{
                const parent = node.parentElement;
                if (!parent || isNoise(parent)) continue;
                const tag = parent.tagName;
                if (tag === 'SCRIPT' || tag === 'STYLE' || tag === 'NOSCRIPT') continue;
                const t = node.textContent.trim();
                if (t) chunks.push(t);
            }}

            const paragraphs = Array.from(root.querySelectorAll('{content_selector}'))
                .filter(p => !isNoise(p))
                .map(p => (p.textContent || '').trim())
                .filter(t => t.length > 0)
                .slice(0, 40);

            const headingEl = document.querySelector('{heading_selector}');

            let eligibility = '';
            const headings = Array.from(root.querySelectorAll('h1, h2, h3, h4, h5'))
                .filter(h => !isNoise(h));
            const eligHeading = headings.find(h =>
                /eligib|who can apply|who qualifies|qualif|criteria|requirements/i.test(h.textContent || ''));
            if (eligHeading) {{
                const parts = [];
                let length = 0;
                for (let sib = eligHeading.nextElementSibling;
                     sib && parts.length < 12 && length < 1500;
                     sib = sib.nextElementSibling) {{
                    if (/^H[1-5]$/.test(sib.tagName)) break;
                    const t = (sib.textContent || '').trim();
                    if (!t) continue;
                    if (/success stor|testimonial|apply now|sign up|subscribe|follow us/i.test(t)) break;
                    parts.push(t);
                    length += t.length;
                }}
                eligibility = parts.join('\n');
            }}

            const subLinks = Array.from(document.querySelectorAll('{subprogram_selector}'))
                .filter(a => !isNoise(a) && a.getAttribute('href'))
                .map(a => ({{
                    href: a.getAttribute('href') || '',
                    text: (a.textContent || '').trim().slice(0, 200)
                }}))
                .slice(0, 120);

            return {{
                title: headingEl ? (headingEl.textContent || '').trim() : '',
                docTitle: document.title || '',
                text: chunks.join('\n'),
                paragraphs: paragraphs,
                eligibility: eligibility,
                subLinks: subLinks
            }};
        }})()
        "#,
        content_selector = site.content_selector.replace('\'', "\\'"),
        heading_selector = site.heading_selector.replace('\'', "\\'"),
        subprogram_selector = site.subprogram_selector.replace('\'', "\\'"),
    )
}

/// Pure assembly of a record from a snapshot.
pub fn assemble_record(
    snapshot: &PageSnapshot,
    url: &str,
    site: &SiteConfig,
    parent: Option<(&str, &str)>,
) -> Extraction {
    let text = normalize::clean_text(&snapshot.text);
    let text = marketing::strip_marketing(&text);

    let name = clean_title(&snapshot.title, &snapshot.doc_title);
    let eligibility = marketing::clean_eligibility(&normalize::clean_text(&snapshot.eligibility));
    let summary = pick_summary(&snapshot.paragraphs, &eligibility);

    let record = ProgramRecord {
        name,
        summary,
        source: url.to_string(),
        eligibility,
        funding_amount: fields::extract_funding_amounts(&text),
        deadlines: fields::extract_deadlines(&text),
        contact_email: fields::extract_contact_email(&text),
        contact_phone: fields::extract_contact_phone(&text),
        application_process: fields::extract_application_process(&text),
        sectors: fields::extract_sectors(&text),
        parent_program: parent.map(|(name, _)| name.to_string()),
        parent_source: parent.map(|(_, source)| source.to_string()),
    };

    let subprogram_links = if site.follow_subprograms {
        filter_subprogram_links(&snapshot.sub_links, url, site)
    } else {
        Vec::new()
    };

    Extraction {
        record,
        subprogram_links,
    }
}

/// Title from the configured heading, falling back to the document title;
/// decorative separators and site-name suffixes stripped.
fn clean_title(heading: &str, doc_title: &str) -> String {
    let raw = if heading.trim().is_empty() {
        doc_title
    } else {
        heading
    };
    let cleaned = normalize::clean_text(raw);

    // "Program Name | Agency" and friends: keep the leading segment when
    // it still looks like a name. The spaced hyphen is split as a string
    // so hyphenated names stay whole.
    let candidate = cleaned
        .split([ '|', '\u{2013}', '\u{2014}' ])
        .next()
        .unwrap_or(&cleaned);
    let candidate = candidate.split(" - ").next().unwrap_or(candidate).trim();
    let candidate = if candidate.chars().count() >= 5 {
        candidate
    } else {
        cleaned.trim()
    };

    candidate
        .trim_matches(|c: char| matches!(c, '-' | ':' | '\u{bb}' | '\u{ab}' | '\u{203a}' | '*' | '\u{2022}') || c.is_whitespace())
        .to_string()
}

/// First paragraph that is long enough, short enough, not
/// eligibility-flavored, not navigation boilerplate, and not a restatement
/// of the eligibility section; trimmed to end on a sentence boundary.
fn pick_summary(paragraphs: &[String], eligibility: &str) -> String {
    for paragraph in paragraphs {
        let cleaned = marketing::strip_marketing(&normalize::clean_text(paragraph));
        let len = cleaned.chars().count();
        if len < SUMMARY_MIN_CHARS || len > SUMMARY_MAX_CHARS {
            continue;
        }
        if is_eligibility_flavored(&cleaned) {
            continue;
        }
        if marketing::is_boilerplate(&cleaned) {
            continue;
        }
        if !eligibility.is_empty() && duplicates_eligibility(&cleaned, eligibility) {
            continue;
        }
        return normalize::trim_to_sentence(&cleaned, SUMMARY_BUDGET_CHARS);
    }
    String::new()
}

fn is_eligibility_flavored(text: &str) -> bool {
    let head: String = text.chars().take(80).collect();
    let head = head.to_lowercase();
    head.contains("eligib")
        || head.contains("who can apply")
        || head.contains("who qualifies")
        || head.contains("qualifying criteria")
}

/// A summary candidate whose opening matches the eligibility text is the
/// eligibility section seen twice.
fn duplicates_eligibility(candidate: &str, eligibility: &str) -> bool {
    let prefix: String = candidate.chars().take(60).collect();
    eligibility.starts_with(prefix.trim()) || candidate.starts_with(eligibility)
}

/// Subprogram anchors must look funding-related and must not hit the
/// exclusion list; same-origin and capped like discovered links.
fn filter_subprogram_links(anchors: &[Anchor], base_url: &str, site: &SiteConfig) -> Vec<String> {
    let keyword = site
        .keyword_pattern
        .as_deref()
        .unwrap_or(link_discovery::DEFAULT_KEYWORD_PATTERN);

    let kept: Vec<Anchor> = anchors
        .iter()
        .filter(|a| !SUBLINK_EXCLUDE_RE.is_match(&a.href) && !SUBLINK_EXCLUDE_RE.is_match(&a.text))
        .cloned()
        .collect();

    link_discovery::filter_links(&kept, base_url, keyword, site.max_subprograms)
}

/// AI cleanup of the ambiguous prose fields. The gate handles quota
/// latching and pass-through; a disabled gate returns the input.
async fn enhance(record: &mut ProgramRecord, page_text: &str, ai: &AiGate) {
    if !record.summary.is_empty() {
        record.summary = ai.enhance_summary(&record.summary).await;
    }
    if !record.eligibility.is_empty() {
        record.eligibility = ai.enhance_eligibility(&record.eligibility).await;
    }
    if record.sectors.is_empty() && !record.summary.is_empty() {
        record.sectors = ai.categorize(&record.summary, &record.sectors).await;
    }

    // Heuristics came up empty on the prose fields; a structured pass over
    // the full text is the last resort before shipping a bare record.
    if record.summary.is_empty() && record.eligibility.is_empty() && !page_text.is_empty() {
        if let Some(fields) = ai.extract_structured(page_text).await {
            if let Some(summary) = fields.get("summary").and_then(|v| v.as_str()) {
                record.summary = summary.to_string();
            }
            if let Some(eligibility) = fields.get("eligibility").and_then(|v| v.as_str()) {
                record.eligibility = eligibility.to_string();
            }
        }
    }
}
