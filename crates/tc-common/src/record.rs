//! Request/response records and the pairs that carry them.
//!
//! Records are built once by a loader and never mutated afterwards. A single
//! captured request usually produced both the primary and the shadow
//! response, so pairs hold their request behind an `Arc` and share it.

use crate::id::PairId;
use crate::value::TreeValue;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A normalized HTTP request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Epoch seconds; absent for capture formats that lack it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<i64>,

    #[serde(default, alias = "http_method", skip_serializing_if = "Option::is_none")]
    method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    uri: Option<String>,

    /// A header map, or the opaque header string when it could not be parsed.
    #[serde(default, skip_serializing_if = "TreeValue::is_absent")]
    headers: TreeValue,

    /// A map, a list of maps for bulk payloads, a scalar, or absent.
    #[serde(default, skip_serializing_if = "TreeValue::is_absent")]
    body: TreeValue,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_headers(mut self, headers: impl Into<TreeValue>) -> Self {
        self.headers = headers.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<TreeValue>) -> Self {
        self.body = body.into();
        self
    }

    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn headers(&self) -> &TreeValue {
        &self.headers
    }

    pub fn body(&self) -> &TreeValue {
        &self.body
    }

    /// Two requests are equivalent when method, URI, headers and body match.
    /// Timestamps are ignored: each cluster sees the request at its own time.
    pub fn equivalent_to(&self, other: &Request) -> bool {
        self.method == other.method
            && self.uri == other.uri
            && self.headers == other.headers
            && self.body == other.body
    }

    /// True when no field was captured at all.
    pub fn is_empty(&self) -> bool {
        self.timestamp.is_none()
            && self.method.is_none()
            && self.uri.is_none()
            && self.headers.is_absent()
            && self.body.is_absent()
    }
}

/// A normalized HTTP response.
///
/// Header keys are lowercased at construction so header comparison is
/// case-insensitive by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ResponseFields")]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,

    #[serde(skip_serializing_if = "TreeValue::is_absent")]
    headers: TreeValue,

    #[serde(skip_serializing_if = "TreeValue::is_absent")]
    body: TreeValue,

    /// Milliseconds between request and response. Stored signed so that
    /// bogus non-positive captures can be recognised and excluded.
    #[serde(skip_serializing_if = "Option::is_none")]
    latency: Option<i64>,
}

/// Deserialization shape for [`Response`]; folds header keys on the way in.
#[derive(Deserialize)]
struct ResponseFields {
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default, alias = "statuscode")]
    status: Option<u16>,
    #[serde(default)]
    headers: TreeValue,
    #[serde(default)]
    body: TreeValue,
    #[serde(default)]
    latency: Option<i64>,
}

impl From<ResponseFields> for Response {
    fn from(fields: ResponseFields) -> Self {
        let mut response = Response::new(fields.status, fields.headers, fields.body);
        response.timestamp = fields.timestamp;
        response.latency = fields.latency;
        response
    }
}

impl Response {
    pub fn new(status: Option<u16>, headers: impl Into<TreeValue>, body: impl Into<TreeValue>) -> Self {
        Self {
            timestamp: None,
            status,
            headers: headers.into().with_lowercase_keys(),
            body: body.into(),
            latency: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_latency(mut self, latency_ms: i64) -> Self {
        self.latency = Some(latency_ms);
        self
    }

    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// The status code as a tree value, for diffing.
    pub fn status_value(&self) -> TreeValue {
        TreeValue::from(self.status.map(i64::from))
    }

    pub fn headers(&self) -> &TreeValue {
        &self.headers
    }

    pub fn body(&self) -> &TreeValue {
        &self.body
    }

    pub fn latency(&self) -> Option<i64> {
        self.latency
    }
}

/// One request with the response a single cluster produced for it.
///
/// `correlation` is the id of the pair in the *other* cluster's stream that
/// represents the same logical request, once correlation has found it.
#[derive(Debug, Clone, PartialEq)]
pub struct Pair {
    request: Arc<Request>,
    response: Response,
    correlation: Option<PairId>,
}

impl Pair {
    pub fn new(request: Arc<Request>, response: Response) -> Self {
        Self {
            request,
            response,
            correlation: None,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Shared handle to the request, for attaching to comparisons.
    pub fn request_handle(&self) -> &Arc<Request> {
        &self.request
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn latency(&self) -> Option<i64> {
        self.response.latency()
    }

    pub fn correlation(&self) -> Option<PairId> {
        self.correlation
    }

    pub fn is_correlated(&self) -> bool {
        self.correlation.is_some()
    }

    /// Link this pair to its counterpart in the other stream.
    pub fn correlate_with(&mut self, other: PairId) {
        self.correlation = Some(other);
    }

    pub fn into_parts(self) -> (Arc<Request>, Response) {
        (self.request, self.response)
    }
}

/// Serialized shape of a [`Pair`]: `{request, response}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairRecord {
    #[serde(default)]
    pub request: Request,
    pub response: Response,
}

impl From<PairRecord> for Pair {
    fn from(record: PairRecord) -> Self {
        Pair::new(Arc::new(record.request), record.response)
    }
}

/// A primary/shadow pair whose correlation was established upstream.
///
/// Each side is the sole member of its own one-element stream, so both
/// correlation links point at index 0.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedPair {
    pub primary: Pair,
    pub shadow: Pair,
}

impl MatchedPair {
    pub fn new(mut primary: Pair, mut shadow: Pair) -> Self {
        primary.correlate_with(PairId(0));
        shadow.correlate_with(PairId(0));
        Self { primary, shadow }
    }

    /// Build from a capture triple: one request, two responses.
    pub fn from_triple(request: Request, primary: Response, shadow: Response) -> Self {
        let request = Arc::new(request);
        Self::new(
            Pair::new(Arc::clone(&request), primary),
            Pair::new(request, shadow),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> Request {
        Request::new()
            .with_timestamp(1_675_811_048)
            .with_uri("/index1/_doc/1")
            .with_body(TreeValue::from(json!({"hello": "world"})))
    }

    #[test]
    fn identical_requests_are_equivalent() {
        assert!(request().equivalent_to(&request()));
    }

    #[test]
    fn timestamp_does_not_break_equivalence() {
        let later = request().with_timestamp(1_675_811_063);
        assert!(request().equivalent_to(&later));
        assert!(later.equivalent_to(&request()));
    }

    #[test]
    fn method_uri_and_headers_break_equivalence() {
        let get = request().with_method("GET");
        let post = request().with_method("POST");
        assert!(!get.equivalent_to(&post));

        let other_uri = request().with_uri("/index1/_doc/2");
        assert!(!request().equivalent_to(&other_uri));

        let a = request().with_headers("accept: */*#0D#0Acontent-type: application/json");
        let b = request().with_headers("content-type: text/html");
        assert!(!a.equivalent_to(&b));
        assert!(!b.equivalent_to(&a));
    }

    #[test]
    fn response_headers_are_case_folded() {
        let response = Response::new(
            Some(200),
            TreeValue::string_map([("Content-Type", "application/json")]),
            TreeValue::Absent,
        );
        let headers = response.headers().as_map().unwrap();
        assert!(headers.contains_key("content-type"));
        assert!(!headers.contains_key("Content-Type"));
    }

    #[test]
    fn response_deserialization_folds_headers_and_accepts_aliases() {
        let response: Response = serde_json::from_value(json!({
            "statuscode": 404,
            "headers": {"Content-Length": "12"},
            "latency": 14
        }))
        .unwrap();
        assert_eq!(response.status(), Some(404));
        assert_eq!(response.latency(), Some(14));
        assert!(response.headers().as_map().unwrap().contains_key("content-length"));
        assert!(response.body().is_absent());
    }

    #[test]
    fn empty_request_serializes_to_empty_object() {
        let text = serde_json::to_string(&Request::new()).unwrap();
        assert_eq!(text, "{}");
        assert!(Request::new().is_empty());
    }

    #[test]
    fn triple_shares_one_request() {
        let matched = MatchedPair::from_triple(
            request(),
            Response::new(Some(200), TreeValue::Absent, TreeValue::Absent),
            Response::new(Some(201), TreeValue::Absent, TreeValue::Absent),
        );
        assert!(Arc::ptr_eq(
            matched.primary.request_handle(),
            matched.shadow.request_handle()
        ));
        assert_eq!(matched.primary.correlation(), Some(PairId(0)));
        assert_eq!(matched.shadow.correlation(), Some(PairId(0)));
    }
}
