//! Recursive, path-tracked structural diff.
//!
//! At every node, in order:
//! 1. an excluded path stops the walk for the whole subtree
//! 2. absent/null on exactly one side records `added` or `removed`
//! 3. differing kinds record `type_changed`
//! 4. maps recurse per key over the union of keys; one-sided keys are
//!    `added`/`removed` at the child path
//! 5. lists recurse per index up to the shorter length; the tail of the longer
//!    side is `added`/`removed` per index (reordering shows up as per-index
//!    changes)
//! 6. unequal scalars of the same kind record `value_changed`

use crate::delta::{Delta, TypeChange, ValueChange};
use crate::path::{index_path, key_path, ROOT};
use crate::rules::ExclusionRules;
use std::collections::{BTreeMap, BTreeSet};
use tc_common::value::numbers_equal;
use tc_common::TreeValue;
use tracing::trace;

/// Knobs for a single diff run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// Compare strings case-insensitively (used for header values).
    pub ignore_string_case: bool,
}

impl DiffOptions {
    pub fn case_insensitive() -> Self {
        Self {
            ignore_string_case: true,
        }
    }
}

/// Diff `old` against `new` with default options.
pub fn diff(old: &TreeValue, new: &TreeValue, rules: &ExclusionRules) -> Delta {
    diff_with(old, new, rules, DiffOptions::default())
}

/// Diff `old` against `new`.
pub fn diff_with(
    old: &TreeValue,
    new: &TreeValue,
    rules: &ExclusionRules,
    options: DiffOptions,
) -> Delta {
    let mut walker = Walker {
        rules,
        options,
        delta: Delta::default(),
    };
    walker.visit(ROOT, old, new);
    walker.delta
}

struct Walker<'a> {
    rules: &'a ExclusionRules,
    options: DiffOptions,
    delta: Delta,
}

impl Walker<'_> {
    fn visit(&mut self, path: &str, old: &TreeValue, new: &TreeValue) {
        if self.excluded(path) {
            return;
        }

        match (old.is_nullish(), new.is_nullish()) {
            (true, true) => return,
            (true, false) => {
                self.delta.added.insert(path.to_string(), new.clone());
                return;
            }
            (false, true) => {
                self.delta.removed.insert(path.to_string(), old.clone());
                return;
            }
            (false, false) => {}
        }

        if old.kind() != new.kind() {
            self.delta.type_changed.insert(
                path.to_string(),
                TypeChange {
                    old_type: old.kind(),
                    new_type: new.kind(),
                    old_value: old.clone(),
                    new_value: new.clone(),
                },
            );
            return;
        }

        match (old, new) {
            (TreeValue::Map(a), TreeValue::Map(b)) => self.visit_map(path, a, b),
            (TreeValue::List(a), TreeValue::List(b)) => self.visit_list(path, a, b),
            _ => {
                if !self.scalars_equal(old, new) {
                    self.delta.value_changed.insert(
                        path.to_string(),
                        ValueChange {
                            old_value: old.clone(),
                            new_value: new.clone(),
                        },
                    );
                }
            }
        }
    }

    fn visit_map(
        &mut self,
        path: &str,
        old: &BTreeMap<String, TreeValue>,
        new: &BTreeMap<String, TreeValue>,
    ) {
        let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
        for key in keys {
            let child = key_path(path, key);
            match (old.get(key), new.get(key)) {
                (Some(a), Some(b)) => self.visit(&child, a, b),
                (Some(a), None) => self.record_removed(child, a),
                (None, Some(b)) => self.record_added(child, b),
                (None, None) => {}
            }
        }
    }

    fn visit_list(&mut self, path: &str, old: &[TreeValue], new: &[TreeValue]) {
        let common = old.len().min(new.len());
        for (index, (a, b)) in old.iter().zip(new.iter()).enumerate() {
            self.visit(&index_path(path, index), a, b);
        }
        for (index, a) in old.iter().enumerate().skip(common) {
            self.record_removed(index_path(path, index), a);
        }
        for (index, b) in new.iter().enumerate().skip(common) {
            self.record_added(index_path(path, index), b);
        }
    }

    fn record_added(&mut self, path: String, value: &TreeValue) {
        if !self.excluded(&path) {
            self.delta.added.insert(path, value.clone());
        }
    }

    fn record_removed(&mut self, path: String, value: &TreeValue) {
        if !self.excluded(&path) {
            self.delta.removed.insert(path, value.clone());
        }
    }

    fn excluded(&self, path: &str) -> bool {
        let excluded = self.rules.is_excluded(path);
        if excluded {
            trace!(path, "skipping excluded subtree");
        }
        excluded
    }

    fn scalars_equal(&self, old: &TreeValue, new: &TreeValue) -> bool {
        match (old, new) {
            (TreeValue::String(a), TreeValue::String(b)) if self.options.ignore_string_case => {
                a.to_lowercase() == b.to_lowercase()
            }
            (TreeValue::Number(a), TreeValue::Number(b)) => numbers_equal(a, b),
            _ => old == new,
        }
    }
}
