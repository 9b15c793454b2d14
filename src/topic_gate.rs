// ============================================================================
// File: src/topic_gate.rs
// Keyword-based topic gate
// ============================================================================

/// Keywords used when the configuration does not supply its own list.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "Islam", "Quran", "Hadith", "Sunnah", "Prophet", "Allah", "Muslim", "Fiqh", "Seerah",
    "Sharia", "Hadees",
];

/// Decides whether a query belongs to the supported domain.
///
/// Matching is a case-insensitive substring test with no word boundaries,
/// so a keyword buried inside an unrelated word still counts as a match
/// ("muslims" matches "muslim", but so does "prophetic" or "allahabad").
#[derive(Debug, Clone)]
pub struct TopicGate {
    keywords: Vec<String>,
}

impl TopicGate {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn is_in_domain(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.keywords.iter().any(|keyword| query.contains(keyword.as_str()))
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl Default for TopicGate {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS)
    }
}
