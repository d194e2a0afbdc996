//! Exclusion rules: paths whose subtrees never contribute to a delta.

use crate::path::{key_path, ROOT};
use regex::Regex;
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors from building exclusion rules.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid exclusion pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Literal paths plus regular expressions matched against full path strings.
#[derive(Debug, Clone, Default)]
pub struct ExclusionRules {
    paths: BTreeSet<String>,
    patterns: Vec<Regex>,
}

impl ExclusionRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from literal paths only.
    ///
    /// A rule that does not start with `root` names a key at the root, so
    /// `content-length` is shorthand for `root['content-length']`.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = Self::new();
        for path in paths {
            rules.add_path(path.as_ref());
        }
        rules
    }

    pub fn add_path(&mut self, path: &str) {
        self.paths.insert(normalize_literal(path));
    }

    pub fn add_pattern(&mut self, pattern: &str) -> Result<(), RuleError> {
        let regex = Regex::new(pattern).map_err(|source| RuleError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.patterns.push(regex);
        Ok(())
    }

    pub fn with_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in paths {
            self.add_path(path.as_ref());
        }
        self
    }

    pub fn with_patterns<I, S>(mut self, patterns: I) -> Result<Self, RuleError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in patterns {
            self.add_pattern(pattern.as_ref())?;
        }
        Ok(self)
    }

    /// Whether `path` (and therefore its whole subtree) is excluded.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.paths.contains(path) || self.patterns.iter().any(|re| re.is_match(path))
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.patterns.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Regex::as_str)
    }
}

fn normalize_literal(rule: &str) -> String {
    if rule.starts_with(ROOT) {
        rule.to_string()
    } else {
        key_path(ROOT, rule)
    }
}
