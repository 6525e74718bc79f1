//! Last-resort citation figures for the site's own papers, used when no
//! provider could confirm a title.

/// Known counts keyed by lowercase title substring. Declaration order is the tie-break.
const KNOWN_CITATIONS: &[(&str, u64)] = &[
    ("crisis response through social cues analysis", 0),
    ("exploring media consumption and mental health", 4),
];

pub trait FallbackLookup: Send + Sync {
    /// Best-effort count for `title`, 0 when nothing is known.
    fn lookup(&self, title: &str) -> u64;
}

#[derive(Debug, Clone)]
pub struct StaticFallbackTable {
    entries: Vec<(String, u64)>,
}

impl StaticFallbackTable {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(key, count)| (key.as_ref().to_lowercase(), count))
                .collect(),
        }
    }

    pub fn known() -> Self {
        Self::new(KNOWN_CITATIONS.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for StaticFallbackTable {
    fn default() -> Self {
        Self::known()
    }
}

impl FallbackLookup for StaticFallbackTable {
    fn lookup(&self, title: &str) -> u64 {
        let title = title.to_lowercase();
        self.entries
            .iter()
            .find(|(key, _)| title.contains(key.as_str()))
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}
