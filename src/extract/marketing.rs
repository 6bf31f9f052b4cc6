//! Marketing-content filter and footer boilerplate stripper.
//!
//! Funding sites pad program pages with testimonials, calls to action and
//! legal footer text. Both filters run before any text reaches a
//! human-facing field.

use std::sync::LazyLock;

use regex::Regex;

/// Eligibility text shorter than this after stripping is discarded.
pub const ELIGIBILITY_MIN_CHARS: usize = 30;

/// Eligibility text that overlapped footer/legal boilerplate is discarded
/// below this length; deliberately stricter than [`ELIGIBILITY_MIN_CHARS`].
pub const FOOTER_ELIGIBILITY_MIN_CHARS: usize = 100;

static MARKETING_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)success stor(?:y|ies)[^.]*\.?",
        r"(?i)(?:read|view|see) (?:our|more) [a-z ]*(?:stories|case studies|testimonials)[^.]*\.?",
        r"(?i)testimonials?[^.]*\.?",
        r"(?i)what our (?:clients|members|beneficiaries) say[^.]*\.?",
        r"(?i)pay homage[^.]*\.?",
        r"(?i)sign up (?:for|to) [^.]*\.?",
        r"(?i)subscribe to (?:our|the) [^.]*\.?",
        r"(?i)join our [a-z ]*(?:newsletter|community|mailing list)[^.]*\.?",
        r"(?i)follow us on [^.]*\.?",
        r"(?i)click here to [^.]*\.?",
        r"(?i)don'?t miss (?:out|this)[^.]*\.?",
        r"(?i)apply now[!.]?",
        r"(?i)get in touch today[^.]*\.?",
        r"(?i)share this (?:page|article|post)[^.]*\.?",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static FOOTER_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)copyright\s*(?:\u{a9})?\s*\d{4}[^.]*\.?",
        r"(?i)\u{a9}\s*\d{4}[^.]*\.?",
        r"(?i)all rights reserved\.?",
        r"(?i)privacy policy[^.]*\.?",
        r"(?i)terms (?:of (?:use|service)|and conditions)[^.]*\.?",
        r"(?i)cookie (?:policy|settings|preferences)[^.]*\.?",
        r"(?i)this (?:web)?site uses cookies[^.]*\.?",
        r"(?i)powered by [a-z0-9 .]+",
        r"(?i)back to top\.?",
        r"(?i)skip to (?:main )?content\.?",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Remove promotional and testimonial spans.
pub fn strip_marketing(text: &str) -> String {
    let mut out = text.to_string();
    for re in MARKETING_RES.iter() {
        out = re.replace_all(&out, " ").into_owned();
    }
    squeeze(&out)
}

/// True when the text contains a promotional span at all; the eligibility
/// section walk uses this as a stop marker.
pub fn is_marketing(text: &str) -> bool {
    MARKETING_RES.iter().any(|re| re.is_match(text))
}

/// True when the text looks like footer/legal boilerplate.
pub fn is_boilerplate(text: &str) -> bool {
    FOOTER_RES.iter().any(|re| re.is_match(text))
}

/// Remove footer/legal spans.
pub fn strip_boilerplate(text: &str) -> String {
    let mut out = text.to_string();
    for re in FOOTER_RES.iter() {
        out = re.replace_all(&out, " ").into_owned();
    }
    squeeze(&out)
}

/// Clean an eligibility section. Marketing and footer spans are removed;
/// text that overlapped boilerplate and falls under
/// [`FOOTER_ELIGIBILITY_MIN_CHARS`] is treated as footer residue and
/// cleared, as is anything under [`ELIGIBILITY_MIN_CHARS`].
pub fn clean_eligibility(text: &str) -> String {
    let had_boilerplate = is_boilerplate(text);
    let cleaned = strip_boilerplate(&strip_marketing(text));

    if had_boilerplate && cleaned.chars().count() < FOOTER_ELIGIBILITY_MIN_CHARS {
        return String::new();
    }
    if cleaned.chars().count() < ELIGIBILITY_MIN_CHARS {
        return String::new();
    }
    cleaned
}

fn squeeze(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = true;
    for c in text.chars() {
        if c == ' ' {
            if !last_space {
                out.push(c);
            }
            last_space = true;
        } else {
            out.push(c);
            last_space = c == '\n';
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_promotional_spans() {
        let text = "Grants up to R500k. Success stories from our alumni inspire us. Apply now!";
        let out = strip_marketing(text);
        assert!(out.contains("Grants up to R500k."));
        assert!(!out.to_lowercase().contains("success stories"));
        assert!(!out.to_lowercase().contains("apply now"));
    }

    #[test]
    fn detects_promotional_spans() {
        assert!(is_marketing("Read our success stories"));
        assert!(is_marketing("Subscribe to our newsletter today"));
        assert!(!is_marketing("Funding for textile manufacturers"));
    }

    #[test]
    fn detects_boilerplate() {
        assert!(is_boilerplate("Copyright 2024 All rights reserved."));
        assert!(is_boilerplate("See our privacy policy for details"));
        assert!(!is_boilerplate("Open to registered SMEs in the textile sector"));
    }

    #[test]
    fn short_boilerplate_overlap_is_cleared() {
        // Under the 100-char footer threshold once boilerplate is present.
        let out = clean_eligibility("Open to SMEs. Copyright 2024 All rights reserved.");
        assert_eq!(out, "");
    }

    #[test]
    fn long_eligibility_survives_boilerplate_stripping() {
        let text = "Open to small and medium enterprises registered in South Africa with an \
                    annual turnover below R50 million and at least two years of trading history. \
                    Copyright 2024 All rights reserved.";
        let out = clean_eligibility(text);
        assert!(out.starts_with("Open to small and medium enterprises"));
        assert!(!out.to_lowercase().contains("copyright"));
        assert!(out.chars().count() >= FOOTER_ELIGIBILITY_MIN_CHARS);
    }

    #[test]
    fn short_clean_eligibility_is_cleared() {
        assert_eq!(clean_eligibility("Open to SMEs."), "");
    }

    #[test]
    fn long_clean_eligibility_is_kept_verbatim() {
        let text = "Open to co-operatives and SMEs with valid tax clearance operating anywhere in the country.";
        assert_eq!(clean_eligibility(text), text);
    }
}
