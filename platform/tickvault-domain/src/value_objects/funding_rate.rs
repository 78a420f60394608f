use crate::errors::DecodeError;
use crate::services::decode::{parse_f64, parse_i64};
use crate::value_objects::record::{RowDecode, RowEncode};
use serde::{Deserialize, Serialize};

/// One row of a futures `fundingRate` monthly archive:
/// `calc_time,funding_interval_hours,last_funding_rate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingRate {
    pub funding_time: i64,
    pub interval_hours: i64,
    pub funding_rate: f64,
}

impl RowDecode for FundingRate {
    fn decode_row(fields: &[&str]) -> Result<Self, DecodeError> {
        if fields.len() != 3 {
            return Err(DecodeError::field_count("3", fields.len()));
        }
        Ok(Self {
            funding_time: parse_i64("calc_time", fields[0])?,
            interval_hours: parse_i64("funding_interval_hours", fields[1])?,
            funding_rate: parse_f64("last_funding_rate", fields[2])?,
        })
    }
}

impl RowEncode for FundingRate {
    fn encode_row(&self) -> String {
        format!("{},{},{}", self.funding_time, self.interval_hours, self.funding_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::FundingRate;
    use crate::errors::DecodeReason;
    use crate::services::decode::RowStream;
    use crate::value_objects::record::{RowDecode, RowEncode};

    #[test]
    fn archive_header_is_skipped() {
        let mut stream = RowStream::<FundingRate>::new();
        let header = stream
            .push(&["calc_time", "funding_interval_hours", "last_funding_rate"])
            .expect("header");
        assert!(header.is_none());
        let row = stream
            .push(&["1698796800000", "8", "0.00010000"])
            .expect("row")
            .expect("record");
        assert_eq!(row.funding_time, 1_698_796_800_000);
        assert_eq!(row.interval_hours, 8);
        assert_eq!(row.funding_rate, 0.0001);
        assert_eq!(row.encode_row(), "1698796800000,8,0.0001");
    }

    #[test]
    fn negative_rates_decode_and_short_rows_do_not() {
        let row = FundingRate::decode_row(&["1", "4", "-0.00031"]).expect("row");
        assert!(row.funding_rate < 0.0);

        let err = FundingRate::decode_row(&["1", "8"]).unwrap_err();
        assert!(matches!(err.reason, DecodeReason::WrongFieldCount { got: 2, .. }));
        let err = FundingRate::decode_row(&["1", "8", "n/a"]).unwrap_err();
        assert_eq!(err.field, "last_funding_rate");
    }
}
