use crate::errors::{DecodeError, DecodeReason};
use crate::value_objects::record::RowDecode;
use std::marker::PhantomData;

pub fn parse_i64(field: &'static str, raw: &str) -> Result<i64, DecodeError> {
    raw.trim().parse::<i64>().map_err(|_| DecodeError {
        field,
        reason: DecodeReason::InvalidInteger(raw.to_string()),
    })
}

pub fn parse_f64(field: &'static str, raw: &str) -> Result<f64, DecodeError> {
    let value = raw.trim().parse::<f64>().map_err(|_| DecodeError {
        field,
        reason: DecodeReason::InvalidFloat(raw.to_string()),
    })?;
    if !value.is_finite() {
        return Err(DecodeError {
            field,
            reason: DecodeReason::InvalidFloat(raw.to_string()),
        });
    }
    Ok(value)
}

/// Accepts the same spellings as the exchange tooling: `1 t T TRUE true True`
/// and `0 f F FALSE false False`.
pub fn parse_bool(field: &'static str, raw: &str) -> Result<bool, DecodeError> {
    match raw.trim() {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(DecodeError {
            field,
            reason: DecodeReason::InvalidBool(raw.to_string()),
        }),
    }
}

/// Header detection: a first row that does not decode as a record is a header.
///
/// A malformed first data row is indistinguishable from a header under this
/// rule; it is skipped the same way.
pub fn is_header_row<T: RowDecode>(fields: &[&str]) -> bool {
    T::decode_row(fields).is_err()
}

/// Per-file row decoder that applies header detection to the first row only.
pub struct RowStream<T> {
    rows_seen: usize,
    header_error: Option<DecodeError>,
    _record: PhantomData<T>,
}

impl<T: RowDecode> Default for RowStream<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RowDecode> RowStream<T> {
    pub fn new() -> Self {
        Self {
            rows_seen: 0,
            header_error: None,
            _record: PhantomData,
        }
    }

    /// Returns `Ok(None)` for a skipped header row.
    pub fn push(&mut self, fields: &[&str]) -> Result<Option<T>, DecodeError> {
        self.rows_seen += 1;
        if self.rows_seen == 1 && is_header_row::<T>(fields) {
            self.header_error = T::decode_row(fields).err();
            return Ok(None);
        }
        T::decode_row(fields).map(Some)
    }

    pub fn header_skipped(&self) -> bool {
        self.header_error.is_some()
    }

    /// A file made of a single undecodable row is an error rather than an
    /// empty file with a header.
    pub fn finish(self) -> Result<usize, DecodeError> {
        if self.rows_seen == 1 {
            if let Some(err) = self.header_error {
                return Err(err);
            }
        }
        Ok(self.rows_seen)
    }
}

/// Decodes newline-separated comma rows. Blank lines are ignored.
pub fn decode_text<T: RowDecode>(text: &str) -> Result<Vec<T>, DecodeError> {
    let mut stream = RowStream::<T>::new();
    let mut records = Vec::new();
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if let Some(record) = stream.push(&fields)? {
            records.push(record);
        }
    }
    stream.finish()?;
    Ok(records)
}
