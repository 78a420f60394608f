use crate::errors::PipelineError;
use crate::value_objects::market::Market;
use crate::value_objects::record::TradeRecord;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest<'a> {
    pub symbol: &'a str,
    pub market: Market,
    pub from_id: i64,
    pub limit: usize,
}

/// Remote trade history, paged by record id ascending.
///
/// A page may hold anywhere from zero to `limit` records. Retries are the
/// implementation's concern.
pub trait TradeHistorySource<T> {
    fn fetch_page(&self, request: &PageRequest<'_>) -> Result<Vec<T>, PipelineError>;
}

/// Serves pages from a fixed record set and remembers every requested cursor.
pub struct InMemoryTradeHistory<T> {
    records: Vec<T>,
    max_page: usize,
    requests: Mutex<Vec<i64>>,
}

impl<T: TradeRecord> InMemoryTradeHistory<T> {
    pub fn new(mut records: Vec<T>, max_page: usize) -> Self {
        records.sort_by_key(|record| record.id());
        Self {
            records,
            max_page: max_page.max(1),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requested_from_ids(&self) -> Vec<i64> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl<T: TradeRecord> TradeHistorySource<T> for InMemoryTradeHistory<T> {
    fn fetch_page(&self, request: &PageRequest<'_>) -> Result<Vec<T>, PipelineError> {
        match self.requests.lock() {
            Ok(mut requests) => requests.push(request.from_id),
            Err(poisoned) => poisoned.into_inner().push(request.from_id),
        }
        let start = self
            .records
            .partition_point(|record| record.id() < request.from_id);
        let take = request.limit.min(self.max_page);
        Ok(self.records[start..].iter().take(take).cloned().collect())
    }
}
