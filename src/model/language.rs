//! Language maps and extensions

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Extension values keyed by IRI, in document order
pub type Extensions = IndexMap<String, serde_json::Value>;

/// A mapping from locale tag (e.g. `en-US`) to display text.
///
/// Iteration follows insertion order, which makes "first entry" fallbacks
/// during locale resolution deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageMap(IndexMap<String, String>);

impl LanguageMap {
    /// Create an empty language map
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Builder method: add an entry
    pub fn with(mut self, locale: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(locale, text);
        self
    }

    /// Insert an entry, keeping the original position if the tag already exists
    pub fn insert(&mut self, locale: impl Into<String>, text: impl Into<String>) {
        self.0.insert(locale.into(), text.into());
    }

    /// Exact (case-sensitive) lookup by locale tag
    pub fn get(&self, locale: &str) -> Option<&str> {
        self.0.get(locale).map(String::as_str)
    }

    /// Iterate over `(locale, text)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Locale tags in insertion order
    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// The first text in insertion order
    pub fn first_text(&self) -> Option<&str> {
        self.0.values().next().map(String::as_str)
    }

    /// Whether any locale carries exactly this text
    pub fn contains_text(&self, text: &str) -> bool {
        self.0.values().any(|v| v == text)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolve to a single string using the process-wide locale settings.
    ///
    /// See [`crate::locale`] for the fallback order.
    pub fn resolve(&self, locale: Option<&str>) -> String {
        crate::locale::LocaleResolver::global().resolve(Some(self), locale)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LanguageMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_preserved() {
        let map: LanguageMap = serde_json::from_str(
            r#"{"fr-FR": "Bonjour", "en-US": "Hello", "de-DE": "Hallo"}"#,
        )
        .unwrap();

        let locales: Vec<_> = map.locales().collect();
        assert_eq!(locales, vec!["fr-FR", "en-US", "de-DE"]);
        assert_eq!(map.first_text(), Some("Bonjour"));
    }

    #[test]
    fn test_round_trip_is_transparent() {
        let map = LanguageMap::new().with("en-US", "completed").with("es", "completó");
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json, serde_json::json!({"en-US": "completed", "es": "completó"}));

        let back: LanguageMap = serde_json::from_value(json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_contains_text() {
        let map = LanguageMap::new().with("en-US", "Hello").with("fr-FR", "Bonjour");
        assert!(map.contains_text("Bonjour"));
        assert!(!map.contains_text("bonjour"));
    }
}
