//! Comparison of a primary and a shadow response.
//!
//! A [`Comparison`] runs the structural differ three times (status code,
//! headers, body) when it is built and keeps the three deltas. The wire form
//! carries the deltas, so decoding trusts them instead of recomputing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tc_common::{MatchedPair, Request, Response};
use tc_config::ComparisonSettings;
use tc_diff::{diff, diff_with, Delta, DiffOptions, ExclusionRules, RuleError};
use thiserror::Error;
use tracing::debug;

/// Headers that always differ between clusters.
pub const DEFAULT_HEADER_EXCLUSIONS: &[&str] = &[
    "content-length",
    "access-control-allow-origin",
    "connection",
    "date",
    "location",
];

/// Body fields that identify the cluster rather than the answer.
pub const DEFAULT_BODY_EXCLUSIONS: &[&str] = &[
    "root['cluster_name']",
    "root['cluster_uuid']",
    "root['name']",
    "root['took']",
    "root['tagline']",
    "root['version']",
    "root['_id']",
    "root['_shards']",
    "root['_seq_no']",
];

/// Exclusions and options applied when building comparisons.
#[derive(Debug, Clone)]
pub struct ComparisonRules {
    pub headers: ExclusionRules,
    pub body: ExclusionRules,
    pub header_options: DiffOptions,
}

impl Default for ComparisonRules {
    fn default() -> Self {
        Self {
            headers: ExclusionRules::from_paths(DEFAULT_HEADER_EXCLUSIONS.iter().copied()),
            body: ExclusionRules::from_paths(DEFAULT_BODY_EXCLUSIONS.iter().copied()),
            header_options: DiffOptions::case_insensitive(),
        }
    }
}

impl ComparisonRules {
    /// Rules with no exclusions and exact header comparison.
    pub fn strict() -> Self {
        Self {
            headers: ExclusionRules::new(),
            body: ExclusionRules::new(),
            header_options: DiffOptions::default(),
        }
    }

    /// Build rules from configuration, on top of the defaults unless disabled.
    pub fn from_settings(settings: &ComparisonSettings) -> Result<Self, RuleError> {
        let mut rules = if settings.use_default_exclusions {
            Self::default()
        } else {
            Self::strict()
        };

        // Response header keys are lowercased, so bare header names are too.
        for header in &settings.header_exclusions {
            if header.starts_with(tc_diff::ROOT) {
                rules.headers.add_path(header);
            } else {
                rules.headers.add_path(&header.to_ascii_lowercase());
            }
        }
        for path in &settings.body_exclusions {
            rules.body.add_path(path);
        }
        for pattern in &settings.body_exclusion_patterns {
            rules.body.add_pattern(pattern)?;
        }
        rules.header_options = DiffOptions {
            ignore_string_case: settings.case_insensitive_headers,
        };
        Ok(rules)
    }
}

/// Errors decoding a comparison wire record.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("comparison record is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("comparison record must be a JSON object")]
    NotAnObject,

    #[error("comparison record is missing the '{0}' field")]
    MissingField(&'static str),

    #[error("comparison field '{field}' is malformed: {source}")]
    InvalidField {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl From<DecodeError> for tc_common::Error {
    fn from(err: DecodeError) -> Self {
        tc_common::Error::Decode(err.to_string())
    }
}

/// The result of comparing one primary response with one shadow response.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    primary_response: Response,
    shadow_response: Response,
    original_request: Option<Arc<Request>>,
    status_code_diff: Delta,
    headers_diff: Delta,
    body_diff: Delta,
}

/// Serialized shape of a [`Comparison`].
///
/// An absent request is written as `{}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub primary_response: Response,
    pub shadow_response: Response,
    pub original_request: Request,
    #[serde(rename = "_status_code_diff")]
    pub status_code_diff: Delta,
    #[serde(rename = "_headers_diff")]
    pub headers_diff: Delta,
    #[serde(rename = "_body_diff")]
    pub body_diff: Delta,
}

impl Comparison {
    /// Compare two responses, computing all three deltas now.
    pub fn new(
        primary_response: Response,
        shadow_response: Response,
        original_request: Option<Arc<Request>>,
        rules: &ComparisonRules,
    ) -> Self {
        let status_code_diff = diff(
            &primary_response.status_value(),
            &shadow_response.status_value(),
            &ExclusionRules::new(),
        );
        let headers_diff = diff_with(
            primary_response.headers(),
            shadow_response.headers(),
            &rules.headers,
            rules.header_options,
        );
        let body_diff = diff(primary_response.body(), shadow_response.body(), &rules.body);

        let comparison = Self {
            primary_response,
            shadow_response,
            original_request,
            status_code_diff,
            headers_diff,
            body_diff,
        };
        debug!(
            identical = comparison.is_identical(),
            uri = comparison.original_request().and_then(Request::uri),
            "comparison computed"
        );
        comparison
    }

    /// Compare an externally matched pair, keeping the primary's request.
    pub fn from_matched(pair: MatchedPair, rules: &ComparisonRules) -> Self {
        let (request, primary) = pair.primary.into_parts();
        let (_, shadow) = pair.shadow.into_parts();
        let request = (!request.is_empty()).then_some(request);
        Self::new(primary, shadow, request, rules)
    }

    pub fn primary_response(&self) -> &Response {
        &self.primary_response
    }

    pub fn shadow_response(&self) -> &Response {
        &self.shadow_response
    }

    pub fn original_request(&self) -> Option<&Request> {
        self.original_request.as_deref()
    }

    pub fn status_code_diff(&self) -> &Delta {
        &self.status_code_diff
    }

    pub fn headers_diff(&self) -> &Delta {
        &self.headers_diff
    }

    pub fn body_diff(&self) -> &Delta {
        &self.body_diff
    }

    /// True iff status, headers and body deltas are all empty.
    pub fn is_identical(&self) -> bool {
        self.status_code_diff.is_empty() && self.headers_diff.is_empty() && self.body_diff.is_empty()
    }

    /// True iff both sides carry the same status code (or both lack one).
    pub fn statuses_match(&self) -> bool {
        self.primary_response.status() == self.shadow_response.status()
    }

    pub fn to_wire(&self) -> ComparisonRecord {
        ComparisonRecord {
            primary_response: self.primary_response.clone(),
            shadow_response: self.shadow_response.clone(),
            original_request: self
                .original_request
                .as_deref()
                .cloned()
                .unwrap_or_default(),
            status_code_diff: self.status_code_diff.clone(),
            headers_diff: self.headers_diff.clone(),
            body_diff: self.body_diff.clone(),
        }
    }

    /// Render the wire record as a single line of JSON (no trailing newline).
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_wire())
    }

    /// Rebuild a comparison from its wire form, trusting the stored deltas.
    pub fn from_wire(line: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(line).map_err(DecodeError::InvalidJson)?;
        let Value::Object(mut fields) = value else {
            return Err(DecodeError::NotAnObject);
        };

        let primary_response: Response = required(&mut fields, "primary_response")?;
        let shadow_response: Response = required(&mut fields, "shadow_response")?;
        let original_request: Request = optional(&mut fields, "original_request")?;
        let status_code_diff: Delta = required(&mut fields, "_status_code_diff")?;
        let headers_diff: Delta = required(&mut fields, "_headers_diff")?;
        let body_diff: Delta = required(&mut fields, "_body_diff")?;

        Ok(Self {
            primary_response,
            shadow_response,
            original_request: (!original_request.is_empty()).then(|| Arc::new(original_request)),
            status_code_diff,
            headers_diff,
            body_diff,
        })
    }
}

impl From<ComparisonRecord> for Comparison {
    fn from(record: ComparisonRecord) -> Self {
        let request = record.original_request;
        Self {
            primary_response: record.primary_response,
            shadow_response: record.shadow_response,
            original_request: (!request.is_empty()).then(|| Arc::new(request)),
            status_code_diff: record.status_code_diff,
            headers_diff: record.headers_diff,
            body_diff: record.body_diff,
        }
    }
}

fn required<T: serde::de::DeserializeOwned>(
    fields: &mut Map<String, Value>,
    field: &'static str,
) -> Result<T, DecodeError> {
    let value = fields.remove(field).ok_or(DecodeError::MissingField(field))?;
    serde_json::from_value(value).map_err(|source| DecodeError::InvalidField { field, source })
}

fn optional<T: serde::de::DeserializeOwned + Default>(
    fields: &mut Map<String, Value>,
    field: &'static str,
) -> Result<T, DecodeError> {
    match fields.remove(field) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => {
            serde_json::from_value(value).map_err(|source| DecodeError::InvalidField { field, source })
        }
    }
}
