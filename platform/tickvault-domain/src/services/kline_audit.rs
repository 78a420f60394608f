use crate::errors::PipelineError;
use crate::value_objects::interval::Interval;
use crate::value_objects::kline::Kline;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KlineAudit {
    pub interval_ms: i64,
    pub klines: usize,
    pub missing_open_times: Vec<i64>,
    pub bad_close_times: Vec<i64>,
    pub out_of_order: usize,
}

impl KlineAudit {
    pub fn is_ok(&self) -> bool {
        self.missing_open_times.is_empty()
            && self.bad_close_times.is_empty()
            && self.out_of_order == 0
    }
}

/// Checks a kline series (e.g. a downloaded kline archive) for missing buckets.
///
/// Without an explicit interval the width of the first kline is used.
pub fn audit_klines(
    klines: &[Kline],
    interval: Option<Interval>,
) -> Result<KlineAudit, PipelineError> {
    let Some(first) = klines.first() else {
        return Err(PipelineError::Config("no klines to audit".to_string()));
    };
    let interval = match interval {
        Some(interval) => interval,
        None => Interval::from_millis(first.interval_ms())?,
    };
    let step = interval.millis();

    let mut audit = KlineAudit {
        interval_ms: step,
        klines: klines.len(),
        missing_open_times: Vec::new(),
        bad_close_times: Vec::new(),
        out_of_order: 0,
    };
    for kline in klines {
        if kline.interval_ms() != step {
            audit.bad_close_times.push(kline.open_time);
        }
    }
    for pair in klines.windows(2) {
        let expected = pair[0].open_time + step;
        if pair[1].open_time < expected {
            audit.out_of_order += 1;
            continue;
        }
        let mut open_time = expected;
        while open_time < pair[1].open_time {
            audit.missing_open_times.push(open_time);
            open_time += step;
        }
    }
    Ok(audit)
}
