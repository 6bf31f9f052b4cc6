//! Field extractors.
//!
//! Pattern-based extraction of structured fragments from normalized page
//! text. Every function here is pure, never errors, and returns an empty
//! value when nothing matches.

use std::sync::LazyLock;

use regex::Regex;

use super::deadline;
use super::sectors;

/// Cap on list-valued fields (amounts, deadlines, process steps).
pub const MAX_FIELD_MATCHES: usize = 5;

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        (?: \b(?:ZAR|USD|EUR|GBP|R) \s? [\d,]+(?:\.\d+)? (?:\s?(?:million|billion|bn|m|k))?\b
          | [$\u{20ac}\u{a3}] \s? [\d,]+(?:\.\d+)? (?:\s?(?:million|billion|bn|m|k))?\b
          | \b[\d,]+(?:\.\d+)? \s? (?:million|billion|bn|k) \b
        )",
    )
    .unwrap()
});

static DEADLINE_PHRASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:closing date|deadline|applications? (?:close|due|open until)|submit (?:by|before)|apply (?:by|before))[:\s][^\n]{0,100}",
    )
    .unwrap()
});

static ONGOING_PHRASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:ongoing|rolling(?: basis)?|open (?:all year|year[- ]round)|no (?:closing )?deadline)\b").unwrap()
});

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap()
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+\d{1,3}[\s-]?)?\(?0?\d{2,3}\)?[\s-]?\d{3}[\s-]?\d{4}\b").unwrap()
});

static PROCESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:how to apply|application (?:process|procedure|form)|submit (?:your|an) application|apply (?:online|via|through|at))[:\s][^\n]{0,120}",
    )
    .unwrap()
});

/// Monetary amount phrases, deduplicated and capped, joined with `; `.
pub fn extract_funding_amounts(text: &str) -> String {
    let matches = AMOUNT_RE
        .find_iter(text)
        .map(|m| m.as_str().trim().trim_end_matches([',', '.']).to_string())
        .filter(|s| s.chars().any(|c| c.is_ascii_digit()));
    join_capped(matches)
}

/// Deadline phrases, absolute dates and ongoing keywords, deduplicated and
/// capped, joined with `; `.
pub fn extract_deadlines(text: &str) -> String {
    let phrases = DEADLINE_PHRASE_RE
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string());

    // Split on ';' only: '.' is a date separator in the dd.mm.yyyy family.
    let dates = text
        .lines()
        .flat_map(|line| {
            line.split(';')
                .filter(|frag| deadline::contains_date(frag))
                .filter_map(deadline::parse_first_date)
        })
        .map(|d| d.format("%Y-%m-%d").to_string());

    let ongoing = ONGOING_PHRASE_RE
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string());

    join_capped(phrases.chain(dates).chain(ongoing))
}

/// First email address in the text, or empty.
pub fn extract_contact_email(text: &str) -> String {
    EMAIL_RE
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// First phone number in the text, or empty.
pub fn extract_contact_phone(text: &str) -> String {
    PHONE_RE
        .find(text)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Application-process phrases, deduplicated and capped, joined with `; `.
pub fn extract_application_process(text: &str) -> String {
    let matches = PROCESS_RE
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string());
    join_capped(matches)
}

/// Sector tags against the fixed vocabulary, comma-joined, lowercase.
pub fn extract_sectors(text: &str) -> String {
    sectors::match_sectors(text).join(", ")
}

/// Dedupe case-insensitively preserving first-seen order, cap at
/// [`MAX_FIELD_MATCHES`], join with `; `.
fn join_capped(items: impl Iterator<Item = String>) -> String {
    let mut seen: Vec<String> = Vec::new();
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let key = item.to_lowercase();
        if item.is_empty() || seen.contains(&key) {
            continue;
        }
        seen.push(key);
        out.push(item);
        if out.len() == MAX_FIELD_MATCHES {
            break;
        }
    }
    out.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_prefixed_amounts() {
        let text = "Grants of R50,000 to R1.2 million are available, or up to $25k abroad.";
        let out = extract_funding_amounts(text);
        assert!(out.contains("R50,000"));
        assert!(out.contains("R1.2 million"));
        assert!(out.contains("$25k"));
    }

    #[test]
    fn magnitude_suffixed_amounts() {
        let out = extract_funding_amounts("funding of 5 million for qualifying firms");
        assert_eq!(out, "5 million");
    }

    #[test]
    fn amounts_are_deduped_and_capped() {
        let text = "R100 R100 R200 R300 R400 R500 R600 R700";
        let out = extract_funding_amounts(text);
        let parts: Vec<&str> = out.split("; ").collect();
        assert_eq!(parts.len(), MAX_FIELD_MATCHES);
        assert_eq!(parts[0], "R100");
        assert_eq!(parts[1], "R200");
    }

    #[test]
    fn no_amounts_is_empty() {
        assert_eq!(extract_funding_amounts("no figures mentioned here"), "");
    }

    #[test]
    fn deadline_phrases_carry_context() {
        let text = "Closing date: 31 March 2026 at noon sharp\nOther text";
        let out = extract_deadlines(text);
        assert!(out.contains("Closing date: 31 March 2026 at noon sharp"));
    }

    #[test]
    fn bare_dates_are_captured() {
        let out = extract_deadlines("Submissions accepted until 2026-09-30 only");
        assert!(out.contains("2026-09-30"));
    }

    #[test]
    fn dotted_dates_are_captured() {
        let out = extract_deadlines("Submissions accepted until 31.12.2026 only");
        assert!(out.contains("2026-12-31"));
    }

    #[test]
    fn ongoing_keywords_are_captured() {
        let out = extract_deadlines("Applications are reviewed on a rolling basis");
        assert!(out.to_lowercase().contains("rolling basis"));
    }

    #[test]
    fn first_contact_wins() {
        let text = "Email grants@agency.org.za or info@agency.org.za, call +27 11 555 0199.";
        assert_eq!(extract_contact_email(text), "grants@agency.org.za");
        assert_eq!(extract_contact_phone(text), "+27 11 555 0199");
    }

    #[test]
    fn missing_contacts_are_empty() {
        assert_eq!(extract_contact_email("nothing here"), "");
        assert_eq!(extract_contact_phone("nothing here"), "");
    }

    #[test]
    fn process_phrases() {
        let text = "How to apply: complete the online form and attach your business plan";
        let out = extract_application_process(text);
        assert!(out.starts_with("How to apply"));
        assert!(out.contains("online form"));
    }

    #[test]
    fn sector_tags_are_comma_joined() {
        let out = extract_sectors("supporting Tourism and Manufacturing ventures");
        assert_eq!(out, "tourism, manufacturing");
    }
}
