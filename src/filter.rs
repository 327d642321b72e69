//! Literal suffix matching over walked entries.

use crate::models::Entry;

/// Selects files whose base name ends with a fixed suffix.
///
/// The suffix is compared byte for byte. It is not a glob or a regex, and
/// matching is case-sensitive.
#[derive(Debug, Clone)]
pub struct SuffixFilter {
    suffix: String,
}

impl SuffixFilter {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        entry.is_file() && entry.name.ends_with(&self.suffix)
    }
}
