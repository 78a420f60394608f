use crate::errors::DecodeError;
use crate::value_objects::market::TradeKind;

/// Positional decoding of one tokenized CSV row.
pub trait RowDecode: Sized {
    fn decode_row(fields: &[&str]) -> Result<Self, DecodeError>;
}

/// Re-encoding to the same positional layout `RowDecode` reads.
pub trait RowEncode {
    fn encode_row(&self) -> String;
}

/// Common view over individual and aggregated trades.
///
/// `id` is the pagination and gap-scan cursor. `first_trade_id`/`last_trade_id`
/// are the inclusive range of underlying exchange trades the record covers and
/// drive continuity checks; for an individual trade all three are equal.
pub trait TradeRecord: RowDecode + RowEncode + Clone + Send + Sync + 'static {
    const KIND: TradeKind;

    fn id(&self) -> i64;
    fn first_trade_id(&self) -> i64;
    fn last_trade_id(&self) -> i64;
    fn time(&self) -> i64;
    fn price(&self) -> f64;
    fn qty(&self) -> f64;
    fn is_buyer_maker(&self) -> bool;

    /// Number of exchange trades folded into this record.
    fn trade_count(&self) -> i64 {
        self.last_trade_id() - self.first_trade_id() + 1
    }

    /// Placeholder rows carry sentinel ids and are excluded from continuity work.
    fn is_placeholder(&self) -> bool {
        false
    }
}
