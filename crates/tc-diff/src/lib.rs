//! Structural diff for Traffic Comparator.
//!
//! Computes a path-addressed [`Delta`] between two [`TreeValue`]s while
//! honoring [`ExclusionRules`]. The algorithm is a deterministic recursive
//! walk: identical inputs always produce identical path strings.
//!
//! ```
//! use serde_json::json;
//! use tc_common::TreeValue;
//! use tc_diff::{diff, ExclusionRules};
//!
//! let a = TreeValue::from(json!({"hello": "world", "took": 3}));
//! let b = TreeValue::from(json!({"hello": "earth", "took": 9}));
//! let rules = ExclusionRules::from_paths(["took"]);
//!
//! let delta = diff(&a, &b, &rules);
//! assert!(delta.value_changed.contains_key("root['hello']"));
//! assert!(!delta.value_changed.contains_key("root['took']"));
//! ```
//!
//! [`TreeValue`]: tc_common::TreeValue

pub mod delta;
pub mod differ;
pub mod path;
pub mod rules;

pub use delta::{Delta, TypeChange, ValueChange};
pub use differ::{diff, diff_with, DiffOptions};
pub use path::ROOT;
pub use rules::{ExclusionRules, RuleError};
