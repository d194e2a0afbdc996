//! Path strings addressing nodes inside a tree value.
//!
//! `root` names the whole value; map children append `['key']` and list
//! children append `[index]`, e.g. `root['hits'][0]['_source']`.

/// Sentinel path of the root node.
pub const ROOT: &str = "root";

/// Path of a map entry under `parent`.
///
/// Keys containing a single quote are wrapped in double quotes instead.
pub fn key_path(parent: &str, key: &str) -> String {
    if key.contains('\'') {
        format!("{parent}[\"{key}\"]")
    } else {
        format!("{parent}['{key}']")
    }
}

/// Path of a list element under `parent`.
pub fn index_path(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}
