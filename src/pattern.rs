//! Compiled filter patterns with full-match, first-match-wins semantics.

use regex::{Regex, RegexBuilder};

use crate::diagnostics::{Diagnostic, Diagnostics};

pub const MATCH_ALL: &str = "^.*$";

#[derive(Debug, Clone)]
pub struct FilterSet {
    patterns: Vec<Regex>,
    /// Set when the match-all pattern stands in for an empty filter list.
    match_all: bool,
}

impl FilterSet {
    /// Compiles every filter, dropping the ones that fail. The result may be empty.
    pub fn compile<S: AsRef<str>>(
        filters: &[S],
        ignore_case: bool,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let mut patterns = Vec::with_capacity(filters.len());
        for filter in filters {
            let filter = filter.as_ref();
            match build(filter, ignore_case) {
                Ok(re) => patterns.push(re),
                Err(err) => diagnostics.record(Diagnostic::InvalidPattern {
                    pattern: filter.to_string(),
                    message: err.to_string(),
                }),
            }
        }
        Self {
            patterns,
            match_all: false,
        }
    }

    /// Like [`FilterSet::compile`], but an empty result becomes the match-all set.
    pub fn compile_or_match_all<S: AsRef<str>>(
        filters: &[S],
        ignore_case: bool,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let set = Self::compile(filters, ignore_case, diagnostics);
        if set.is_empty() {
            return Self::match_all();
        }
        set
    }

    /// The set holding only [`MATCH_ALL`].
    pub fn match_all() -> Self {
        Self {
            patterns: Vec::new(),
            match_all: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.match_all && self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        if self.match_all { 1 } else { self.patterns.len() }
    }

    /// Index of the first pattern that matches the whole of `name`.
    pub fn first_match(&self, name: &str) -> Option<usize> {
        if self.match_all {
            return Some(0);
        }
        self.patterns.iter().position(|re| re.is_match(name))
    }

    pub fn matches(&self, name: &str) -> bool {
        self.first_match(name).is_some()
    }
}

fn build(pattern: &str, ignore_case: bool) -> Result<Regex, regex::Error> {
    // Validate the pattern as written before wrapping it; `a)|(b` must stay invalid.
    Regex::new(pattern)?;
    RegexBuilder::new(&format!("^(?:{pattern})$"))
        .case_insensitive(ignore_case)
        .build()
}
