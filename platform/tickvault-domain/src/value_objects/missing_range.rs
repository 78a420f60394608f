use serde::{Deserialize, Serialize};

/// Inclusive gap in record ids, bracketed by the timestamps of the last good
/// record before it and the first good record after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingRange {
    pub start_id: i64,
    pub end_id: i64,
    pub start_time: i64,
    pub end_time: i64,
}

impl MissingRange {
    pub fn len(&self) -> i64 {
        self.end_id - self.start_id + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 0
    }

    pub fn contains(&self, id: i64) -> bool {
        id >= self.start_id && id <= self.end_id
    }
}
