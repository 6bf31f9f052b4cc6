//! Program record model and validity filter.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::extract::marketing;

/// Minimum length for a credible program name.
pub const NAME_MIN_CHARS: usize = 5;

/// One funding opportunity, assembled fresh each run. Identity within a
/// run is the `(name, source)` pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramRecord {
    pub name: String,
    pub summary: String,
    /// Canonical detail-page URL.
    pub source: String,
    pub eligibility: String,
    pub funding_amount: String,
    pub deadlines: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub application_process: String,
    pub sectors: String,
    /// Set only on records discovered under another program's detail page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_program: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_source: Option<String>,
}

/// A top-level program with its re-attached children, as written to the
/// output artifact.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramTree {
    #[serde(flatten)]
    pub program: ProgramRecord,
    pub subprograms: Vec<ProgramRecord>,
}

static MARKUP_ARTIFACTS: &[&str] = &[
    "<![CDATA[", "<script", "<div", "<span", "</", "function(", "function (", "=>", "){",
];

static NAV_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:home|menu|navigation|about(?: us)?|contact(?: us)?|search|login|sign in|register|news|blog|events|sitemap|faqs?|resources|services|careers|read more|learn more|skip to .*)$",
    )
    .unwrap()
});

impl ProgramRecord {
    /// Dedup key within one run.
    pub fn identity(&self) -> (String, String) {
        (self.name.clone(), self.source.clone())
    }

    pub fn is_subprogram(&self) -> bool {
        self.parent_program.is_some() && self.parent_source.is_some()
    }

    /// True when the record passes the post-extraction content-quality
    /// checks. A failing record is dropped, never surfaced as an error.
    pub fn is_valid(&self) -> bool {
        let name = self.name.trim();
        if name.chars().count() < NAME_MIN_CHARS {
            return false;
        }
        if MARKUP_ARTIFACTS
            .iter()
            .any(|artifact| name.contains(artifact))
            || name.contains('<')
            || name.contains('{')
        {
            return false;
        }
        if NAV_NAME_RE.is_match(name) {
            return false;
        }
        if marketing::is_boilerplate(name) {
            return false;
        }
        true
    }

    /// Clear low-quality optional fields in place. Boilerplate-flavored
    /// eligibility under the footer threshold is residue, not content.
    pub fn scrub(&mut self) {
        if marketing::is_boilerplate(&self.eligibility)
            && self.eligibility.chars().count() < marketing::FOOTER_ELIGIBILITY_MIN_CHARS
        {
            self.eligibility.clear();
        }
    }
}

/// Deduplicate by `(name, source)`, preserving first-seen order.
pub fn dedupe_programs(programs: Vec<ProgramRecord>) -> Vec<ProgramRecord> {
    let mut seen: Vec<(String, String)> = Vec::new();
    let mut out = Vec::with_capacity(programs.len());
    for program in programs {
        let id = program.identity();
        if seen.contains(&id) {
            continue;
        }
        seen.push(id);
        out.push(program);
    }
    out
}
