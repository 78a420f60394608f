use crate::errors::DecodeError;
use crate::services::decode::{parse_bool, parse_f64, parse_i64};
use crate::value_objects::market::TradeKind;
use crate::value_objects::record::{RowDecode, RowEncode, TradeRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotTrade {
    pub id: i64,
    pub price: f64,
    pub qty: f64,
    pub quote_qty: f64,
    pub time: i64,
    pub is_buyer_maker: bool,
    pub is_best_match: bool,
}

impl RowDecode for SpotTrade {
    fn decode_row(fields: &[&str]) -> Result<Self, DecodeError> {
        if fields.len() != 7 {
            return Err(DecodeError::field_count("7", fields.len()));
        }
        Ok(Self {
            id: parse_i64("trade_id", fields[0])?,
            price: parse_f64("price", fields[1])?,
            qty: parse_f64("qty", fields[2])?,
            quote_qty: parse_f64("quote_qty", fields[3])?,
            time: parse_i64("time", fields[4])?,
            is_buyer_maker: parse_bool("is_buyer_maker", fields[5])?,
            is_best_match: parse_bool("is_best_match", fields[6])?,
        })
    }
}

impl RowEncode for SpotTrade {
    fn encode_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{}",
            self.id,
            self.price,
            self.qty,
            self.quote_qty,
            self.time,
            self.is_buyer_maker,
            self.is_best_match
        )
    }
}

impl TradeRecord for SpotTrade {
    const KIND: TradeKind = TradeKind::Trades;

    fn id(&self) -> i64 {
        self.id
    }

    fn first_trade_id(&self) -> i64 {
        self.id
    }

    fn last_trade_id(&self) -> i64 {
        self.id
    }

    fn time(&self) -> i64 {
        self.time
    }

    fn price(&self) -> f64 {
        self.price
    }

    fn qty(&self) -> f64 {
        self.qty
    }

    fn is_buyer_maker(&self) -> bool {
        self.is_buyer_maker
    }
}

#[cfg(test)]
mod tests {
    use super::SpotTrade;
    use crate::value_objects::record::{RowDecode, RowEncode, TradeRecord};

    #[test]
    fn decodes_and_reencodes_trade_row() {
        let raw = "12345,42000.5,0.001,42.0005,1609459200000,false,true";
        let fields: Vec<&str> = raw.split(',').collect();
        let trade = SpotTrade::decode_row(&fields).expect("trade");
        assert_eq!(trade.first_trade_id(), 12345);
        assert_eq!(trade.last_trade_id(), 12345);
        assert_eq!(trade.trade_count(), 1);
        assert!(!trade.is_placeholder());
        assert_eq!(trade.encode_row(), raw);
    }

    #[test]
    fn rejects_aggregated_layout() {
        let err = SpotTrade::decode_row(&["1", "1", "1", "1", "1", "1", "true", "true"]).unwrap_err();
        assert_eq!(err.to_string(), "expected 7 fields, got 8");
    }
}
