//! Fixed sector vocabulary.
//!
//! Funding sites describe target industries in free text; this is the
//! closed set of tags we recognise. Matching is case-insensitive and the
//! surfaced tag is always the lowercase vocabulary form.

use phf::phf_set;

/// Industry terms recognised by the sector extractor.
pub static SECTOR_VOCABULARY: phf::Set<&'static str> = phf_set! {
    "agriculture",
    "agro-processing",
    "automotive",
    "aquaculture",
    "biotechnology",
    "chemicals",
    "construction",
    "creative industries",
    "education",
    "energy",
    "engineering",
    "film",
    "finance",
    "fintech",
    "forestry",
    "franchising",
    "healthcare",
    "hospitality",
    "ict",
    "manufacturing",
    "media",
    "mining",
    "pharmaceuticals",
    "renewable energy",
    "retail",
    "software",
    "technology",
    "telecommunications",
    "textiles",
    "tourism",
    "transport",
    "waste management",
    "water",
};

/// Scan normalized text for vocabulary terms. Tags come back lowercased,
/// deduplicated, in vocabulary-hit order of first appearance.
pub fn match_sectors(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut found: Vec<(usize, String)> = Vec::new();

    for term in SECTOR_VOCABULARY.iter() {
        if let Some(pos) = find_word(&lower, term) {
            found.push((pos, (*term).to_string()));
        }
    }

    found.sort_by_key(|(pos, _)| *pos);
    found.into_iter().map(|(_, term)| term).collect()
}

/// Word-bounded search so "ict" does not match inside "strict".
fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    let mut start = 0;
    while let Some(rel) = haystack[start..].find(needle) {
        let pos = start + rel;
        let before_ok = pos == 0
            || !haystack[..pos]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric());
        let end = pos + needle.len();
        let after_ok = end >= haystack.len()
            || !haystack[end..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric());
        if before_ok && after_ok {
            return Some(pos);
        }
        start = pos + needle.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_are_lowercased_and_ordered() {
        let text = "Open to Tourism and AGRICULTURE businesses, including agriculture co-ops";
        assert_eq!(match_sectors(text), vec!["tourism", "agriculture"]);
    }

    #[test]
    fn word_boundaries_are_respected() {
        assert!(match_sectors("strict rules apply").is_empty());
        assert_eq!(match_sectors("ICT startups welcome"), vec!["ict"]);
    }

    #[test]
    fn multi_word_terms_match() {
        assert_eq!(
            match_sectors("grants for renewable energy projects"),
            vec!["renewable energy", "energy"]
        );
    }

    #[test]
    fn no_hits_is_empty() {
        assert!(match_sectors("completely unrelated text").is_empty());
    }
}
