//! Version stamp for exported report documents.

/// Written as `schema_version` at the top of every report export.
///
/// The major part changes when export fields are removed or change type;
/// the minor part when fields are added.
pub const SCHEMA_VERSION: &str = "1.0.0";
