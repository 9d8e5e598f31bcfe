//! Locale Resolution
//!
//! Picks one string out of a language map for a requested locale. First match
//! wins:
//!
//! 1. Exact tag (`en-US`)
//! 2. Variant of the base language: the bare tag (`en`), then a regional
//!    preference list for `en`/`fr`, otherwise the first `base-*` tag
//! 3. Steps 1-2 again with the configured default locale, if it differs
//! 4. The first entry of the map
//! 5. The literal `"undefined"` for an empty or missing map
//!
//! The requested locale, when not given explicitly, comes from the configured
//! default locale and then from the environment (`LC_ALL`, `LC_MESSAGES`,
//! `LANG`). The environment is read only when it is needed, and it never
//! takes part in step 3.

use crate::model::LanguageMap;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::RwLock;

/// Returned when nothing can be resolved
pub const UNDEFINED: &str = "undefined";

static DEFAULT_LOCALE: RwLock<Option<String>> = RwLock::new(None);

/// Set the process-wide default locale (normally once, at startup)
pub fn set_default_locale(locale: impl Into<String>) {
    let locale = locale.into();
    tracing::debug!(%locale, "Default locale set");
    if let Ok(mut guard) = DEFAULT_LOCALE.write() {
        *guard = Some(locale);
    }
}

/// Forget the configured default locale
pub fn clear_default_locale() {
    if let Ok(mut guard) = DEFAULT_LOCALE.write() {
        *guard = None;
    }
}

/// The configured default locale, if any
pub fn configured_default_locale() -> Option<String> {
    DEFAULT_LOCALE.read().ok().and_then(|guard| guard.clone())
}

/// The locale of the process environment, normalized to a BCP 47-ish tag
/// (`en_US.UTF-8` → `en-US`). The first non-empty variable decides, so
/// `LC_ALL=C` means no locale even when `LANG` is set.
pub fn environment_locale() -> Option<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|raw| !raw.trim().is_empty())
        .and_then(|raw| normalize_locale(&raw))
}

fn normalize_locale(raw: &str) -> Option<String> {
    let tag = raw.split(['.', '@']).next()?.trim();
    if tag.is_empty() || tag == "C" || tag == "POSIX" {
        return None;
    }
    Some(tag.replace('_', "-"))
}

/// Resolves language maps against a default locale
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleResolver {
    default_locale: Option<String>,
    /// Fall back to the environment locale when no locale is requested
    use_environment: bool,
}

impl LocaleResolver {
    /// A resolver with an explicit default locale
    pub fn with_default(locale: impl Into<String>) -> Self {
        Self {
            default_locale: Some(locale.into()),
            use_environment: false,
        }
    }

    /// A resolver that has no default locale
    pub fn without_default() -> Self {
        Self::default()
    }

    /// A resolver using the process-wide settings: the configured default
    /// locale, and the environment locale for unspecified requests
    pub fn global() -> Self {
        Self {
            default_locale: configured_default_locale(),
            use_environment: true,
        }
    }

    /// Builder method: use the environment locale when nothing is requested
    pub fn with_environment(mut self) -> Self {
        self.use_environment = true;
        self
    }

    pub fn default_locale(&self) -> Option<&str> {
        self.default_locale.as_deref()
    }

    /// The locale a lookup starts from: explicit, else the default locale,
    /// else (when enabled) the environment locale
    pub fn requested_locale<'a>(&'a self, locale: Option<&'a str>) -> Option<Cow<'a, str>> {
        locale
            .or(self.default_locale.as_deref())
            .map(Cow::Borrowed)
            .or_else(|| {
                self.use_environment
                    .then(environment_locale)
                    .flatten()
                    .map(Cow::Owned)
            })
    }

    /// Resolve a language map to a single string. Never fails.
    pub fn resolve(&self, map: Option<&LanguageMap>, locale: Option<&str>) -> String {
        let map = match map {
            Some(map) if !map.is_empty() => map,
            _ => return UNDEFINED.to_string(),
        };

        let requested = self.requested_locale(locale);
        let requested = requested.as_deref();

        if let Some(requested) = requested {
            if let Some(text) = lookup(map, requested) {
                return text.to_string();
            }
        }

        if let Some(default) = self.default_locale.as_deref() {
            if requested != Some(default) {
                if let Some(text) = lookup(map, default) {
                    return text.to_string();
                }
            }
        }

        map.first_text().unwrap_or(UNDEFINED).to_string()
    }

    /// Resolve a raw JSON value that should be a language map.
    ///
    /// Non-object values resolve to `"undefined"`; non-string entries are skipped.
    pub fn resolve_json(&self, value: &Value, locale: Option<&str>) -> String {
        match value.as_object() {
            Some(object) => {
                let map: LanguageMap = object
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|text| (k.as_str(), text)))
                    .collect();
                self.resolve(Some(&map), locale)
            }
            None => UNDEFINED.to_string(),
        }
    }
}

fn lookup<'a>(map: &'a LanguageMap, locale: &str) -> Option<&'a str> {
    map.get(locale).or_else(|| variant(map, base_language(locale)))
}

fn base_language(locale: &str) -> &str {
    locale.split(['-', '_']).next().unwrap_or(locale)
}

fn variant<'a>(map: &'a LanguageMap, base: &str) -> Option<&'a str> {
    if let Some(text) = map.get(base) {
        return Some(text);
    }

    match regional_preferences(base) {
        Some(preferred) => preferred.iter().find_map(|tag| map.get(tag)),
        None => {
            let prefix = format!("{}-", base);
            map.iter()
                .find(|(tag, _)| tag.starts_with(&prefix))
                .map(|(_, text)| text)
        }
    }
}

fn regional_preferences(base: &str) -> Option<&'static [&'static str]> {
    match base {
        "en" => Some(&["en-CA", "en-US", "en-GB"]),
        "fr" => Some(&["fr-CA", "fr-FR"]),
        _ => None,
    }
}
