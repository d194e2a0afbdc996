//! Traffic Comparator common types, IDs, and errors.
//!
//! This crate provides foundational types shared across the comparator crates:
//! - Tree values for normalized headers and bodies
//! - Request/response records and the pairs that carry them
//! - Pair and run identity types
//! - Common error types and the export schema version

pub mod error;
pub mod id;
pub mod record;
pub mod schema;
pub mod value;

pub use error::{Error, Result};
pub use id::{PairId, RunId};
pub use record::{MatchedPair, Pair, PairRecord, Request, Response};
pub use schema::SCHEMA_VERSION;
pub use value::{TreeValue, ValueKind};
