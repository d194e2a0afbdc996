//! Decoding JSON-lines captures into pairs.
//!
//! Batch streams hold one `{request, response}` pair per line. Matched-pair
//! streams hold either `{primary, shadow}` (each a pair) or a capture triple
//! `{request, primaryResponse, shadowResponse}`. Blank lines are ignored;
//! undecodable lines are reported with their 1-based line number.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tc_common::{MatchedPair, Pair, PairRecord, Request, Response};
use thiserror::Error;
use tracing::{info, warn};

/// A single input line that could not be turned into a record.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("line {line} is not valid JSON: {source}")]
    InvalidJson {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line} is missing '{field}'")]
    MissingField { line: usize, field: &'static str },

    #[error("line {line} has a malformed '{field}': {source}")]
    InvalidField {
        line: usize,
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line} is not a JSON object")]
    NotAnObject { line: usize },

    #[error("line {line} is not valid UTF-8: {source}")]
    InvalidUtf8 {
        line: usize,
        #[source]
        source: std::str::Utf8Error,
    },
}

impl RecordError {
    pub fn line(&self) -> usize {
        match self {
            RecordError::InvalidJson { line, .. }
            | RecordError::MissingField { line, .. }
            | RecordError::InvalidField { line, .. }
            | RecordError::NotAnObject { line }
            | RecordError::InvalidUtf8 { line, .. } => *line,
        }
    }
}

impl From<RecordError> for tc_common::Error {
    fn from(err: RecordError) -> Self {
        tc_common::Error::MalformedRecord {
            line: err.line(),
            reason: err.to_string(),
        }
    }
}

/// Numbered input lines, read as raw bytes so that one badly encoded line
/// is reported on its own instead of ending the read.
///
/// Yields `(line number, text)`; line terminators (`\n` or `\r\n`) are
/// stripped. Only I/O failures surface as the outer error.
#[derive(Debug)]
pub struct InputLines<R> {
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
}

impl<R: BufRead> InputLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for InputLines<R> {
    type Item = io::Result<(usize, Result<String, RecordError>)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                self.line_no += 1;
                let mut bytes = self.buf.as_slice();
                if let Some(rest) = bytes.strip_suffix(b"\n") {
                    bytes = rest.strip_suffix(b"\r").unwrap_or(rest);
                }
                let line = std::str::from_utf8(bytes)
                    .map(str::to_owned)
                    .map_err(|source| RecordError::InvalidUtf8 {
                        line: self.line_no,
                        source,
                    });
                Some(Ok((self.line_no, line)))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

fn object(line: &str, line_no: usize) -> Result<Map<String, Value>, RecordError> {
    match serde_json::from_str(line) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(RecordError::NotAnObject { line: line_no }),
        Err(source) => Err(RecordError::InvalidJson {
            line: line_no,
            source,
        }),
    }
}

fn take<T: DeserializeOwned>(
    fields: &mut Map<String, Value>,
    field: &'static str,
    line: usize,
) -> Result<T, RecordError> {
    let value = fields
        .remove(field)
        .ok_or(RecordError::MissingField { line, field })?;
    serde_json::from_value(value).map_err(|source| RecordError::InvalidField {
        line,
        field,
        source,
    })
}

/// Decode a `{request, response}` line.
pub fn decode_pair(line: &str, line_no: usize) -> Result<Pair, RecordError> {
    let mut fields = object(line, line_no)?;
    let response: Response = take(&mut fields, "response", line_no)?;
    let request: Request = match fields.remove("request") {
        None | Some(Value::Null) => Request::default(),
        Some(value) => serde_json::from_value(value).map_err(|source| RecordError::InvalidField {
            line: line_no,
            field: "request",
            source,
        })?,
    };
    Ok(PairRecord { request, response }.into())
}

/// Decode a matched-pair line in either accepted shape.
pub fn decode_matched_pair(line: &str, line_no: usize) -> Result<MatchedPair, RecordError> {
    let mut fields = object(line, line_no)?;
    if fields.contains_key("primary") || fields.contains_key("shadow") {
        let primary: PairRecord = take(&mut fields, "primary", line_no)?;
        let shadow: PairRecord = take(&mut fields, "shadow", line_no)?;
        return Ok(MatchedPair::new(primary.into(), shadow.into()));
    }
    let request: Request = take(&mut fields, "request", line_no)?;
    let primary: Response = take(&mut fields, "primaryResponse", line_no)?;
    let shadow: Response = take(&mut fields, "shadowResponse", line_no)?;
    Ok(MatchedPair::from_triple(request, primary, shadow))
}

/// Read every pair from a batch stream, skipping and logging bad lines.
///
/// Only I/O failures abort the read.
pub fn read_pairs<R: BufRead>(reader: R) -> io::Result<(Vec<Pair>, usize)> {
    let mut pairs = Vec::new();
    let mut skipped = 0;
    for item in InputLines::new(reader) {
        let (line_no, line) = item?;
        if line.as_deref().is_ok_and(|l| l.trim().is_empty()) {
            continue;
        }
        match line.and_then(|l| decode_pair(&l, line_no)) {
            Ok(pair) => pairs.push(pair),
            Err(err) => {
                skipped += 1;
                warn!(line = err.line(), error = %err, "skipping malformed record");
            }
        }
    }
    Ok((pairs, skipped))
}

/// Load a batch stream file.
pub fn load_pairs(path: &Path) -> tc_common::Result<Vec<Pair>> {
    let file = File::open(path)?;
    let (pairs, skipped) = read_pairs(BufReader::new(file))?;
    info!(
        path = %path.display(),
        loaded = pairs.len(),
        skipped,
        "loaded capture"
    );
    Ok(pairs)
}
