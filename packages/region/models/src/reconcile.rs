//! Statistics-source to boundary-source region name mapping.

use std::collections::BTreeMap;

use crate::normalize_region_name;

/// Statistics-source names whose boundary counterpart is spelled
/// differently.
const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("Banadir", "Banadir Regional Admin"),
    ("Hiraan", "Hirshabelle"),
    ("Awdal", "Somaliland"),
    ("Galgaduud", "Galmudug"),
    ("Mudug", "Mudug (Split Region)"),
    ("Bari", "Puntland"),
    ("Gedo", "Jubaland"),
    ("Bakool", "Southwest State"),
];

/// Maps statistics-source region names to canonical boundary names.
///
/// Lookups are by normalized name, so `"  banadir"` and `"Banadir"` map
/// alike. Names without an entry pass through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameReconciliationMap {
    aliases: BTreeMap<String, String>,
}

impl Default for NameReconciliationMap {
    fn default() -> Self {
        Self::from_pairs(DEFAULT_ALIASES.iter().copied())
    }
}

impl NameReconciliationMap {
    /// Builds a map from `(source, canonical)` pairs.
    pub fn from_pairs<S: AsRef<str>, C: Into<String>>(pairs: impl IntoIterator<Item = (S, C)>) -> Self {
        Self {
            aliases: pairs
                .into_iter()
                .map(|(source, canonical)| (normalize_region_name(source.as_ref()), canonical.into()))
                .collect(),
        }
    }

    /// Canonical name for `name`, if it has an alias.
    #[must_use]
    pub fn alias(&self, name: &str) -> Option<&str> {
        self.aliases
            .get(&normalize_region_name(name))
            .map(String::as_str)
    }

    /// Canonical name for `name`: its alias if one exists, otherwise the
    /// trimmed input.
    #[must_use]
    pub fn reconcile(&self, name: &str) -> String {
        self.alias(name)
            .map_or_else(|| name.trim().to_string(), ToString::to_string)
    }

    /// Number of aliases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Returns `true` if the map has no aliases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
