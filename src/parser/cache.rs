//! Read-only cache of parse results keyed by cleaned output.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::types::Message;

/// Parse results for known outputs, fixed at construction.
#[derive(Debug, Clone)]
pub struct ParseCache {
    entries: HashMap<String, Vec<Message>>,
}

impl ParseCache {
    /// Cache holding only the empty-output entry.
    #[must_use]
    pub fn seeded() -> Self {
        Self::with_entries([(String::new(), Vec::new())])
    }

    /// Cache with explicit entries.
    #[must_use]
    pub fn with_entries(entries: impl IntoIterator<Item = (String, Vec<Message>)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Process-wide cache shared by every parser.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<ParseCache>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(Self::seeded())))
    }

    /// Copy of the cached messages for `cleaned`.
    #[must_use]
    pub fn get(&self, cleaned: &str) -> Option<Vec<Message>> {
        self.entries.get(cleaned).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ParseCache {
    fn default() -> Self {
        Self::seeded()
    }
}
