use crate::errors::DecodeError;
use crate::services::decode::{parse_bool, parse_f64, parse_i64};
use crate::value_objects::market::TradeKind;
use crate::value_objects::record::{RowDecode, RowEncode, TradeRecord};
use serde::{Deserialize, Serialize};

pub const SENTINEL_TRADE_ID: i64 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggTrade {
    pub id: i64,
    pub price: f64,
    pub qty: f64,
    pub first_trade_id: i64,
    pub last_trade_id: i64,
    pub time: i64,
    pub is_buyer_maker: bool,
    /// Only present in archives that carry the eighth column.
    pub is_best_match: Option<bool>,
}

impl RowDecode for AggTrade {
    fn decode_row(fields: &[&str]) -> Result<Self, DecodeError> {
        if fields.len() != 7 && fields.len() != 8 {
            return Err(DecodeError::field_count("7 or 8", fields.len()));
        }
        let is_best_match = match fields.get(7) {
            Some(raw) => Some(parse_bool("is_best_match", raw)?),
            None => None,
        };
        Ok(Self {
            id: parse_i64("agg_trade_id", fields[0])?,
            price: parse_f64("price", fields[1])?,
            qty: parse_f64("qty", fields[2])?,
            first_trade_id: parse_i64("first_trade_id", fields[3])?,
            last_trade_id: parse_i64("last_trade_id", fields[4])?,
            time: parse_i64("time", fields[5])?,
            is_buyer_maker: parse_bool("is_buyer_maker", fields[6])?,
            is_best_match,
        })
    }
}

impl RowEncode for AggTrade {
    fn encode_row(&self) -> String {
        let mut row = format!(
            "{},{},{},{},{},{},{}",
            self.id,
            self.price,
            self.qty,
            self.first_trade_id,
            self.last_trade_id,
            self.time,
            self.is_buyer_maker
        );
        if let Some(best) = self.is_best_match {
            row.push(',');
            row.push_str(if best { "true" } else { "false" });
        }
        row
    }
}

impl TradeRecord for AggTrade {
    const KIND: TradeKind = TradeKind::AggTrades;

    fn id(&self) -> i64 {
        self.id
    }

    fn first_trade_id(&self) -> i64 {
        self.first_trade_id
    }

    fn last_trade_id(&self) -> i64 {
        self.last_trade_id
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

    fn is_placeholder(&self) -> bool {
        self.first_trade_id == SENTINEL_TRADE_ID || self.last_trade_id == SENTINEL_TRADE_ID
    }
}
