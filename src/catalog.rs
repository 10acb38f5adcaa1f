//! Static template catalog: short identifier → remote generator page URL.

use std::collections::HashMap;

use crate::{Error, Result};

/// Immutable mapping from template id to the remote page implementing that
/// visual effect.
///
/// Content is fixed at construction time; adding or removing templates is a
/// configuration change, not a runtime operation. Lookups are pure and the
/// catalog is shared read-only across concurrent requests.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    entries: HashMap<String, String>,
}

impl TemplateCatalog {
    /// The built-in catalog of five generator pages.
    pub fn builtin() -> Self {
        Self::from_entries([
            ("1", "https://textpro.me/create-glitch-text-effect-online-1028.html"),
            ("2", "https://textpro.me/create-neon-light-text-effect-online-882.html"),
            ("3", "https://textpro.me/create-3d-gradient-text-effect-online-1005.html"),
            ("4", "https://textpro.me/create-blackpink-logo-style-online-1001.html"),
            ("5", "https://textpro.me/create-multicolor-3d-text-effect-online-975.html"),
        ])
    }

    /// Build a catalog from arbitrary entries. Used by deployments and tests
    /// that point the engine at a different origin.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(id, url)| (id.into(), url.into()))
            .collect();
        Self { entries }
    }

    /// Resolve a template id to its remote URL.
    pub fn resolve(&self, id: &str) -> Result<&str> {
        self.entries
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| Error::UnknownTemplate(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
