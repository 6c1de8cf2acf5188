//! Exception taxonomy: canonical exception ids mapped to client error text

use std::collections::BTreeMap;

use replay_vectors::ExceptionId;

/// How a client's rejection text relates to an expected exception
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The text contains a registered pattern
    Matched,
    /// Patterns exist but none occurs in the text
    Mismatch {
        /// Every pattern that was tried
        pattern: String,
    },
    /// No pattern is registered for the id
    Unmapped,
}

/// Read-only table from exception ids to the text a client includes when it
/// rejects a block for that reason.
///
/// Several ids may share one pattern. Matching is substring containment: a
/// client is free to wrap the registered text in its own context.
#[derive(Debug, Clone, Default)]
pub struct ExceptionTaxonomy {
    entries: BTreeMap<ExceptionId, String>,
}

impl ExceptionTaxonomy {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pattern, replacing an earlier one for the same id
    pub fn insert(&mut self, id: ExceptionId, pattern: impl Into<String>) {
        self.entries.insert(id, pattern.into());
    }

    /// Pattern registered for exactly this id.
    ///
    /// A compound id is found under either order of its halves.
    pub fn pattern(&self, id: &ExceptionId) -> Option<&str> {
        if let Some(pattern) = self.entries.get(id) {
            return Some(pattern);
        }
        let (a, b) = id.halves()?;
        self.entries
            .get(&ExceptionId::any_of(b, a))
            .map(String::as_str)
    }

    /// Patterns to try for `id`, in order: the id's own entry, then for a
    /// compound id each half's entry
    fn candidates(&self, id: &ExceptionId) -> Vec<&str> {
        let mut patterns: Vec<&str> = self.pattern(id).into_iter().collect();
        if let Some((a, b)) = id.halves() {
            for half in [a, b] {
                if let Some(p) = self.entries.get(&ExceptionId::single(half)) {
                    if !patterns.contains(&p.as_str()) {
                        patterns.push(p);
                    }
                }
            }
        }
        patterns
    }

    /// Compare a client's rejection text with the expected exception
    pub fn classify(&self, id: &ExceptionId, raw: &str) -> MatchOutcome {
        let candidates = self.candidates(id);
        if candidates.is_empty() {
            return MatchOutcome::Unmapped;
        }
        if candidates.iter().any(|p| raw.contains(p)) {
            return MatchOutcome::Matched;
        }
        MatchOutcome::Mismatch {
            pattern: candidates.join("' or '"),
        }
    }

    /// True when the text satisfies the expected exception
    pub fn matches(&self, id: &ExceptionId, raw: &str) -> bool {
        self.classify(id, raw) == MatchOutcome::Matched
    }

    /// Number of registered ids
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in id order
    pub fn iter(&self) -> impl Iterator<Item = (&ExceptionId, &str)> {
        self.entries.iter().map(|(id, p)| (id, p.as_str()))
    }
}

impl FromIterator<(ExceptionId, String)> for ExceptionTaxonomy {
    fn from_iter<I: IntoIterator<Item = (ExceptionId, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
