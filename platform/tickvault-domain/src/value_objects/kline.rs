use crate::errors::DecodeError;
use crate::services::decode::{parse_f64, parse_i64};
use crate::value_objects::record::{RowDecode, RowEncode};
use serde::{Deserialize, Serialize};

/// One OHLCV bucket. `close_time` is inclusive: `open_time + interval - 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    pub open_time: i64,
    pub close_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub quote_volume: f64,
    pub trades: i64,
    pub taker_buy_base_volume: f64,
    pub taker_buy_quote_volume: f64,
}

impl Kline {
    /// A zero-volume candle with every price set to `price`.
    pub fn flat(open_time: i64, interval_ms: i64, price: f64) -> Self {
        Self {
            open_time,
            close_time: open_time + interval_ms - 1,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 0.0,
            quote_volume: 0.0,
            trades: 0,
            taker_buy_base_volume: 0.0,
            taker_buy_quote_volume: 0.0,
        }
    }

    pub fn interval_ms(&self) -> i64 {
        self.close_time + 1 - self.open_time
    }

    pub fn is_flat(&self) -> bool {
        self.trades == 0 && self.volume == 0.0
    }
}

impl RowDecode for Kline {
    fn decode_row(fields: &[&str]) -> Result<Self, DecodeError> {
        if fields.len() != 12 {
            return Err(DecodeError::field_count("12", fields.len()));
        }
        Ok(Self {
            open_time: parse_i64("open_time", fields[0])?,
            open: parse_f64("open", fields[1])?,
            high: parse_f64("high", fields[2])?,
            low: parse_f64("low", fields[3])?,
            close: parse_f64("close", fields[4])?,
            volume: parse_f64("volume", fields[5])?,
            close_time: parse_i64("close_time", fields[6])?,
            quote_volume: parse_f64("quote_volume", fields[7])?,
            trades: parse_i64("trades", fields[8])?,
            taker_buy_base_volume: parse_f64("taker_buy_base_volume", fields[9])?,
            taker_buy_quote_volume: parse_f64("taker_buy_quote_volume", fields[10])?,
        })
    }
}

impl RowEncode for Kline {
    fn encode_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{},{},0",
            self.open_time,
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
            self.close_time,
            self.quote_volume,
            self.trades,
            self.taker_buy_base_volume,
            self.taker_buy_quote_volume
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Kline;
    use crate::value_objects::record::{RowDecode, RowEncode};

    #[test]
    fn decodes_exchange_kline_row() {
        let raw = "1609459200000,28923.63,28961.66,28913.12,28961.66,27.457032,1609459259999,794382.41,1292,16.777195,485390.81,0";
        let fields: Vec<&str> = raw.split(',').collect();
        let kline = Kline::decode_row(&fields).expect("kline");
        assert_eq!(kline.interval_ms(), 60_000);
        assert_eq!(kline.trades, 1292);
        assert_eq!(kline.encode_row(), raw);
    }

    #[test]
    fn flat_candle_has_no_volume() {
        let kline = Kline::flat(0, 60_000, 10.5);
        assert!(kline.is_flat());
        assert_eq!(kline.close_time, 59_999);
        assert_eq!(kline.low, 10.5);
    }
}
