use crate::errors::{Discontinuity, PipelineError};
use crate::services::pool::run_bounded;
use crate::value_objects::record::TradeRecord;

/// Splits `records` into at most `parallelism` contiguous, non-empty groups.
pub fn partition<T>(records: &[T], parallelism: usize) -> Vec<&[T]> {
    if records.is_empty() {
        return Vec::new();
    }
    let groups = parallelism.max(1);
    let size = records.len().div_ceil(groups).max(1);
    records.chunks(size).collect()
}

fn check_link<T: TradeRecord>(previous: &T, next: &T) -> Result<(), Discontinuity> {
    if previous.last_trade_id() + 1 != next.first_trade_id() {
        return Err(Discontinuity::between(
            previous.last_trade_id(),
            next.first_trade_id(),
        ));
    }
    Ok(())
}

fn verify_group<T: TradeRecord>(group: &[T]) -> Result<(), Discontinuity> {
    for pair in group.windows(2) {
        check_link(&pair[0], &pair[1])?;
    }
    Ok(())
}

/// Checks that every record's `first_trade_id` follows the previous record's
/// `last_trade_id` by exactly one.
///
/// Group boundaries are checked first on the calling thread, then every group
/// is scanned on its own worker. Records must already be in file order with
/// placeholder rows removed.
pub fn verify_continuity<T: TradeRecord>(
    records: &[T],
    parallelism: usize,
) -> Result<(), PipelineError> {
    let groups = partition(records, parallelism);
    for pair in groups.windows(2) {
        let (Some(previous), Some(next)) = (pair[0].last(), pair[1].first()) else {
            continue;
        };
        check_link(previous, next)?;
    }
    run_bounded(&groups, groups.len(), |_, group| {
        verify_group(group).map_err(PipelineError::from)
    })?;
    Ok(())
}

/// Cached first/last trade ids of one verified file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpan {
    pub name: String,
    pub first_trade_id: i64,
    pub last_trade_id: i64,
}

impl FileSpan {
    /// `None` for a file with no usable records.
    pub fn of<T: TradeRecord>(name: impl Into<String>, records: &[T]) -> Option<Self> {
        let first = records.first()?;
        let last = records.last()?;
        Some(Self {
            name: name.into(),
            first_trade_id: first.first_trade_id(),
            last_trade_id: last.last_trade_id(),
        })
    }
}

/// Sequential file-to-file boundary check over spans in file-name order.
pub fn verify_file_boundaries(spans: &[FileSpan]) -> Result<(), PipelineError> {
    for pair in spans.windows(2) {
        let (previous, next) = (&pair[0], &pair[1]);
        if previous.last_trade_id + 1 != next.first_trade_id {
            let gap = Discontinuity::between(previous.last_trade_id, next.first_trade_id)
                .with_context(format!("boundary {} -> {}", previous.name, next.name));
            return Err(gap.into());
        }
    }
    Ok(())
}
