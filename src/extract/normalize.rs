//! Text normalizer.
//!
//! Turns raw extracted page text into clean prose before any field
//! extractor runs. Pure functions, no I/O; empty input yields empty output.

use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]{1,300}>").unwrap());

static SCRIPT_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript)[^>]*>.*?</(script|style|noscript)>").unwrap()
});

static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#\d{1,6}|#x[0-9a-fA-F]{1,5}|[a-zA-Z]{2,10});").unwrap());

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\r\f]+").unwrap());

static BLANK_LINES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Normalize raw page text: drop markup remnants, decode common HTML
/// entities, strip control and zero-width characters, collapse runs of
/// whitespace.
pub fn clean_text(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    let text = SCRIPT_BLOCK_RE.replace_all(raw, " ");
    let text = TAG_RE.replace_all(&text, " ");
    let text = decode_entities(&text);

    let text: String = text
        .chars()
        .filter(|c| !is_noise_char(*c))
        .collect();

    let text = WHITESPACE_RE.replace_all(&text, " ");
    let text = BLANK_LINES_RE.replace_all(&text, "\n\n");

    text.trim().to_string()
}

fn is_noise_char(c: char) -> bool {
    matches!(c, '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{feff}')
        || (c.is_control() && c != '\n' && c != '\t')
}

/// Decode the entities that actually show up in scraped funding pages.
/// Unknown entities are dropped rather than passed through, so they can
/// never leak into a human-facing field.
fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let body = &caps[1];
            if let Some(num) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                return u32::from_str_radix(num, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_default();
            }
            if let Some(num) = body.strip_prefix('#') {
                return num
                    .parse::<u32>()
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_default();
            }
            match body {
                "amp" => "&".to_string(),
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "quot" => "\"".to_string(),
                "apos" => "'".to_string(),
                "nbsp" => " ".to_string(),
                "ndash" => "\u{2013}".to_string(),
                "mdash" => "\u{2014}".to_string(),
                "rsquo" => "\u{2019}".to_string(),
                "lsquo" => "\u{2018}".to_string(),
                "rdquo" => "\u{201d}".to_string(),
                "ldquo" => "\u{201c}".to_string(),
                "hellip" => "\u{2026}".to_string(),
                "copy" => "\u{a9}".to_string(),
                "reg" => "\u{ae}".to_string(),
                "trade" => "\u{2122}".to_string(),
                _ => String::new(),
            }
        })
        .into_owned()
}

/// Truncate text to end on a sentence boundary within `max_chars`.
/// Falls back to a hard cut at the last word boundary when no sentence
/// terminator exists in the budget.
pub fn trim_to_sentence(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let clipped: String = text.chars().take(max_chars).collect();
    if let Some(pos) = clipped.rfind(['.', '!', '?']) {
        return clipped[..=pos].trim().to_string();
    }
    match clipped.rfind(' ') {
        Some(pos) => clipped[..pos].trim().to_string(),
        None => clipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text("   \n\t  "), "");
    }

    #[test]
    fn strips_markup_and_entities() {
        let raw = "<p>Funding &amp; support for <b>SMEs</b>&nbsp;in Gauteng</p>";
        assert_eq!(clean_text(raw), "Funding & support for SMEs in Gauteng");
    }

    #[test]
    fn drops_script_blocks_entirely() {
        let raw = "Apply today <script>window.track('x')</script> before March";
        assert_eq!(clean_text(raw), "Apply today before March");
    }

    #[test]
    fn decodes_numeric_entities() {
        assert_eq!(clean_text("R50&#8211;R100"), "R50\u{2013}R100");
        assert_eq!(clean_text("caf&#xe9;"), "caf\u{e9}");
    }

    #[test]
    fn unknown_entities_are_dropped() {
        assert_eq!(clean_text("a&zzzz;b"), "ab");
    }

    #[test]
    fn removes_zero_width_characters() {
        assert_eq!(clean_text("Fund\u{200b}ing"), "Funding");
    }

    #[test]
    fn trim_to_sentence_prefers_terminator() {
        let text = "First sentence. Second sentence runs much longer than the budget allows here.";
        assert_eq!(trim_to_sentence(text, 30), "First sentence.");
    }

    #[test]
    fn trim_to_sentence_falls_back_to_word_boundary() {
        let text = "no terminators anywhere in this stretch of text at all";
        let out = trim_to_sentence(text, 20);
        assert!(out.chars().count() <= 20);
        assert!(!out.ends_with(' '));
        assert!(text.starts_with(&out));
    }

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(trim_to_sentence("Short.", 100), "Short.");
    }
}
