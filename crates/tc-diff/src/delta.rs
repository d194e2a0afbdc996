//! The delta record produced by the differ.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tc_common::{TreeValue, ValueKind};

/// Old/new values of a scalar that changed in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueChange {
    pub old_value: TreeValue,
    pub new_value: TreeValue,
}

/// A node whose runtime kind differs between the two sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeChange {
    pub old_type: ValueKind,
    pub new_type: ValueKind,
    pub old_value: TreeValue,
    pub new_value: TreeValue,
}

/// Differences between two tree values, keyed by change kind, then by path.
///
/// Empty kinds are omitted when serialized, so an empty delta is `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    #[serde(default, alias = "values_changed", skip_serializing_if = "BTreeMap::is_empty")]
    pub value_changed: BTreeMap<String, ValueChange>,

    #[serde(default, alias = "type_changes", skip_serializing_if = "BTreeMap::is_empty")]
    pub type_changed: BTreeMap<String, TypeChange>,

    /// Present only on the new (shadow) side.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub added: BTreeMap<String, TreeValue>,

    /// Present only on the old (primary) side.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub removed: BTreeMap<String, TreeValue>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.value_changed.is_empty()
            && self.type_changed.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
    }

    /// Total number of changed paths.
    pub fn len(&self) -> usize {
        self.value_changed.len() + self.type_changed.len() + self.added.len() + self.removed.len()
    }

    /// Every changed path, in sorted order.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self
            .value_changed
            .keys()
            .chain(self.type_changed.keys())
            .chain(self.added.keys())
            .chain(self.removed.keys())
            .map(String::as_str)
            .collect();
        paths.sort_unstable();
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_delta_serializes_to_empty_object() {
        assert_eq!(serde_json::to_string(&Delta::default()).unwrap(), "{}");
    }

    #[test]
    fn value_change_wire_shape() {
        let mut delta = Delta::default();
        delta.value_changed.insert(
            "root".to_string(),
            ValueChange {
                old_value: TreeValue::from(200_i64),
                new_value: TreeValue::from(201_i64),
            },
        );
        let json = serde_json::to_value(&delta).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"value_changed": {"root": {"old_value": 200, "new_value": 201}}})
        );
        assert_eq!(delta.len(), 1);
        assert_eq!(delta.paths(), vec!["root"]);
    }
}
