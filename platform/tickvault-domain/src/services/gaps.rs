use crate::value_objects::missing_range::MissingRange;
use crate::value_objects::record::TradeRecord;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IdEdge {
    pub id: i64,
    pub time: i64,
}

impl IdEdge {
    pub fn of<T: TradeRecord>(record: &T) -> Self {
        Self {
            id: record.id(),
            time: record.time(),
        }
    }
}

/// Result of walking one file's record ids in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IdSequenceReport {
    pub records: usize,
    pub missing: Vec<MissingRange>,
    pub duplicates: usize,
    pub out_of_order: usize,
    pub first: Option<IdEdge>,
    pub last: Option<IdEdge>,
}

impl IdSequenceReport {
    pub fn missing_ids(&self) -> i64 {
        self.missing.iter().map(MissingRange::len).sum()
    }
}

/// Descriptor for the ids strictly between two known-good records, if any.
pub fn gap_between(previous: IdEdge, next: IdEdge) -> Option<MissingRange> {
    if next.id <= previous.id + 1 {
        return None;
    }
    Some(MissingRange {
        start_id: previous.id + 1,
        end_id: next.id - 1,
        start_time: previous.time,
        end_time: next.time,
    })
}

/// Emits one descriptor per forward jump of more than one id. Repeated and
/// decreasing ids are counted, not reported as gaps.
pub fn scan_id_sequence<T: TradeRecord>(records: &[T]) -> IdSequenceReport {
    let mut report = IdSequenceReport {
        records: records.len(),
        first: records.first().map(IdEdge::of),
        last: records.last().map(IdEdge::of),
        ..IdSequenceReport::default()
    };
    for pair in records.windows(2) {
        let (previous, next) = (IdEdge::of(&pair[0]), IdEdge::of(&pair[1]));
        if next.id == previous.id {
            report.duplicates += 1;
        } else if next.id < previous.id {
            report.out_of_order += 1;
        } else if let Some(range) = gap_between(previous, next) {
            report.missing.push(range);
        }
    }
    report
}

/// Boundary descriptors between consecutive files, skipping empty files.
pub fn boundary_gaps(reports: &[IdSequenceReport]) -> Vec<MissingRange> {
    let edges: Vec<(IdEdge, IdEdge)> = reports
        .iter()
        .filter_map(|report| Some((report.first?, report.last?)))
        .collect();
    edges
        .windows(2)
        .filter_map(|pair| gap_between(pair[0].1, pair[1].0))
        .collect()
}

/// Flattens per-task descriptor lists into one list ordered by `start_id`.
pub fn merge_missing_ranges(
    batches: impl IntoIterator<Item = Vec<MissingRange>>,
) -> Vec<MissingRange> {
    let mut merged: Vec<MissingRange> = batches.into_iter().flatten().collect();
    merged.sort_by_key(|range| (range.start_id, range.end_id));
    merged
}
