//! Verb shorthand resolution
//!
//! Queries may name verbs by a short name (`completed`) instead of the full
//! IRI. A [`VerbResolver`] turns the shorthand into the IRI that is compared
//! against `verb.id`. The default resolver leaves shorthands untouched.

use std::collections::HashMap;
use std::fmt::Debug;

/// Maps a verb shorthand to its full IRI
pub trait VerbResolver: Debug + Send + Sync {
    fn resolve(&self, verb: &str) -> String;
}

/// Uses the shorthand as the IRI
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityVerbs;

impl VerbResolver for IdentityVerbs {
    fn resolve(&self, verb: &str) -> String {
        verb.to_string()
    }
}

const ADL_PREFIX: &str = "http://adlnet.gov/expapi/verbs/";

const ADL_VERBS: &[&str] = &[
    "abandoned",
    "answered",
    "asked",
    "attempted",
    "attended",
    "commented",
    "completed",
    "exited",
    "experienced",
    "failed",
    "imported",
    "initialized",
    "interacted",
    "launched",
    "mastered",
    "passed",
    "preferred",
    "progressed",
    "registered",
    "responded",
    "resumed",
    "satisfied",
    "scored",
    "shared",
    "suspended",
    "terminated",
    "voided",
    "waived",
];

/// The ADL verb vocabulary; unknown names pass through unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct AdlVerbs;

impl VerbResolver for AdlVerbs {
    fn resolve(&self, verb: &str) -> String {
        if ADL_VERBS.contains(&verb) {
            format!("{}{}", ADL_PREFIX, verb)
        } else {
            verb.to_string()
        }
    }
}

/// A user-supplied table, e.g. the verbs of one xAPI profile, with a
/// fallback resolver for names it does not know
#[derive(Debug)]
pub struct ProfileVerbs {
    verbs: HashMap<String, String>,
    fallback: Box<dyn VerbResolver>,
}

impl ProfileVerbs {
    pub fn new() -> Self {
        Self {
            verbs: HashMap::new(),
            fallback: Box::new(IdentityVerbs),
        }
    }

    /// Builder method: map `name` to `iri`
    pub fn with(mut self, name: impl Into<String>, iri: impl Into<String>) -> Self {
        self.verbs.insert(name.into(), iri.into());
        self
    }

    /// Builder method: resolver for names missing from the table
    pub fn fallback(mut self, fallback: impl VerbResolver + 'static) -> Self {
        self.fallback = Box::new(fallback);
        self
    }
}

impl Default for ProfileVerbs {
    fn default() -> Self {
        Self::new()
    }
}

impl VerbResolver for ProfileVerbs {
    fn resolve(&self, verb: &str) -> String {
        match self.verbs.get(verb) {
            Some(iri) => iri.clone(),
            None => self.fallback.resolve(verb),
        }
    }
}
