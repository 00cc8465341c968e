//! Feature ontology: free-text phrases to canonical feature keys.
//!
//! The table is loaded once from the catalog's ontology JSON object
//! (`{"seat warmers": "heated_front_seats", ...}`). Lookup keys are stored
//! lower-cased and trimmed so matching is case-insensitive.
//!
//! # Fallback
//!
//! In permissive mode (the default) a phrase absent from the table becomes
//! its own key after lower-casing and trimming. In strict mode such a phrase
//! is rejected with [`AdvisorError::UnknownFeature`]. Either way a phrase
//! that already *is* a canonical key (a value in the table, matched
//! case-insensitively) maps to that key, so normalizing normalized output is
//! a no-op. Table values are kept as written apart from trimming, since they
//! must compare equal to catalog feature keys.

use std::collections::{BTreeSet, HashMap};

use crate::error::{AdvisorError, AdvisorResult};

/// How to treat phrases the table does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    #[default]
    Permissive,
    Strict,
}

#[derive(Debug, Clone, Default)]
pub struct Ontology {
    phrases: HashMap<String, String>,
    /// Lower-cased canonical key to the key as written.
    canonical: HashMap<String, String>,
    policy: FallbackPolicy,
}

impl Ontology {
    pub fn new(table: HashMap<String, String>, policy: FallbackPolicy) -> Self {
        let mut phrases = HashMap::with_capacity(table.len());
        let mut canonical = HashMap::new();
        for (phrase, key) in table {
            let key = key.trim().to_string();
            if key.is_empty() {
                continue;
            }
            canonical.insert(key.to_lowercase(), key.clone());
            phrases.insert(phrase.trim().to_lowercase(), key);
        }
        Self {
            phrases,
            canonical,
            policy,
        }
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// Map a single phrase. `Ok(None)` means the phrase was blank.
    pub fn canonicalize(&self, phrase: &str) -> AdvisorResult<Option<String>> {
        let cleaned = phrase.trim().to_lowercase();
        if cleaned.is_empty() {
            return Ok(None);
        }
        if let Some(key) = self.phrases.get(&cleaned) {
            return Ok(Some(key.clone()));
        }
        if let Some(key) = self.canonical.get(&cleaned) {
            return Ok(Some(key.clone()));
        }
        match self.policy {
            FallbackPolicy::Permissive => Ok(Some(cleaned)),
            FallbackPolicy::Strict => Err(AdvisorError::UnknownFeature(phrase.trim().to_string())),
        }
    }

    /// Canonicalize, deduplicate and sort a list of phrases.
    pub fn normalize<S: AsRef<str>>(&self, phrases: &[S]) -> AdvisorResult<Vec<String>> {
        let mut keys = BTreeSet::new();
        for phrase in phrases {
            if let Some(key) = self.canonicalize(phrase.as_ref())? {
                keys.insert(key);
            }
        }
        Ok(keys.into_iter().collect())
    }
}
