use crate::errors::PipelineError;
use crate::repositories::trade_history::{PageRequest, TradeHistorySource};
use crate::value_objects::market::Market;
use crate::value_objects::missing_range::MissingRange;
use crate::value_objects::record::TradeRecord;
use chrono::{DateTime, NaiveDate};
use std::collections::BTreeMap;

pub const DEFAULT_PAGE_LIMIT: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillQuery {
    pub symbol: String,
    pub market: Market,
    pub page_limit: usize,
}

impl BackfillQuery {
    pub fn new(symbol: impl Into<String>, market: Market) -> Self {
        Self {
            symbol: symbol.into(),
            market,
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// Pages through `source` from `range.start_id` and returns every record with
/// an id inside the range, sorted and deduplicated by id.
///
/// Stops on an empty page or once a page reaches `range.end_id`. Any page
/// failure discards what was fetched for this range.
pub fn fetch_missing_range<T, S>(
    source: &S,
    query: &BackfillQuery,
    range: &MissingRange,
) -> Result<Vec<T>, PipelineError>
where
    T: TradeRecord,
    S: TradeHistorySource<T> + ?Sized,
{
    if query.page_limit == 0 {
        return Err(PipelineError::Config("page limit must be positive".to_string()));
    }
    let mut records: Vec<T> = Vec::new();
    let mut from_id = range.start_id;
    while from_id <= range.end_id {
        let page = source.fetch_page(&PageRequest {
            symbol: &query.symbol,
            market: query.market,
            from_id,
            limit: query.page_limit,
        })?;
        let Some(last_id) = page.last().map(T::id) else {
            break;
        };
        records.extend(page.into_iter().filter(|record| record.id() <= range.end_id));
        if last_id >= range.end_id {
            break;
        }
        if last_id < from_id {
            return Err(PipelineError::Transport(format!(
                "trade history page starting at {from_id} ended at {last_id}"
            )));
        }
        from_id = last_id + 1;
    }
    records.sort_by_key(T::id);
    records.dedup_by_key(|record| record.id());
    Ok(records)
}

pub fn utc_day(time_ms: i64) -> Result<NaiveDate, PipelineError> {
    DateTime::from_timestamp_millis(time_ms)
        .map(|ts| ts.date_naive())
        .ok_or_else(|| PipelineError::Invariant(format!("timestamp {time_ms} out of range")))
}

/// Groups records by the UTC calendar day of their own timestamp.
pub fn bucket_by_utc_day<T: TradeRecord>(
    records: Vec<T>,
) -> Result<BTreeMap<NaiveDate, Vec<T>>, PipelineError> {
    let mut days: BTreeMap<NaiveDate, Vec<T>> = BTreeMap::new();
    for record in records {
        days.entry(utc_day(record.time())?).or_default().push(record);
    }
    Ok(days)
}

/// Union of two record sets sorted by id; on duplicate ids the `primary` copy wins.
pub fn merge_by_id<T: TradeRecord>(primary: Vec<T>, secondary: Vec<T>) -> Vec<T> {
    let mut merged = primary;
    merged.extend(secondary);
    merged.sort_by_key(T::id);
    merged.dedup_by_key(|record| record.id());
    merged
}
