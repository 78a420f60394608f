use crate::errors::PipelineError;
use crate::services::klines::add_rounded;
use crate::value_objects::interval::Interval;
use crate::value_objects::kline::Kline;

/// Folds two candles of the same bucket, `earlier` coming from the earlier file.
fn combine(earlier: Kline, later: Kline) -> Kline {
    if later.is_flat() {
        return earlier;
    }
    if earlier.is_flat() {
        return later;
    }
    Kline {
        open_time: earlier.open_time,
        close_time: earlier.close_time,
        open: earlier.open,
        high: earlier.high.max(later.high),
        low: earlier.low.min(later.low),
        close: later.close,
        volume: add_rounded(earlier.volume, later.volume),
        quote_volume: add_rounded(earlier.quote_volume, later.quote_volume),
        trades: earlier.trades + later.trades,
        taker_buy_base_volume: add_rounded(
            earlier.taker_buy_base_volume,
            later.taker_buy_base_volume,
        ),
        taker_buy_quote_volume: add_rounded(
            earlier.taker_buy_quote_volume,
            later.taker_buy_quote_volume,
        ),
    }
}

pub fn verify_kline_contiguity(series: &[Kline]) -> Result<(), PipelineError> {
    for (idx, pair) in series.windows(2).enumerate() {
        if pair[1].open_time != pair[0].close_time + 1 {
            return Err(PipelineError::Invariant(format!(
                "candle {} opens at {} but candle {} closes at {}",
                idx + 1,
                pair[1].open_time,
                idx,
                pair[0].close_time
            )));
        }
    }
    Ok(())
}

/// Merges per-file candle slices into one dense series from the first to the
/// last observed open time, filling empty buckets with flat candles.
///
/// Slices are expected in file order; candles sharing a bucket are folded in
/// that order. The interval must tile a UTC day so that slices anchored at
/// different midnights share one grid.
pub fn merge_kline_series(
    slices: Vec<Vec<Kline>>,
    interval: Interval,
) -> Result<Vec<Kline>, PipelineError> {
    let step = interval.ensure_candle_width()?.millis();
    let mut all: Vec<Kline> = slices.into_iter().flatten().collect();
    all.sort_by_key(|kline| kline.open_time);
    let (Some(first_open), Some(last_open)) = (
        all.first().map(|k| k.open_time),
        all.last().map(|k| k.open_time),
    ) else {
        return Ok(Vec::new());
    };

    let slots = usize::try_from((last_open - first_open) / step + 1).map_err(|err| {
        PipelineError::Invariant(format!("candle span does not fit in memory: {err}"))
    })?;
    let mut dense: Vec<Option<Kline>> = vec![None; slots];
    for kline in all {
        if kline.interval_ms() != step {
            return Err(PipelineError::Invariant(format!(
                "candle at {} spans {}ms, expected {step}ms",
                kline.open_time,
                kline.interval_ms()
            )));
        }
        let offset = kline.open_time - first_open;
        if offset % step != 0 {
            return Err(PipelineError::Invariant(format!(
                "candle at {} is off the {step}ms grid starting at {first_open}",
                kline.open_time
            )));
        }
        let slot = &mut dense[(offset / step) as usize];
        *slot = Some(match slot.take() {
            Some(existing) => combine(existing, kline),
            None => kline,
        });
    }

    let mut series: Vec<Kline> = Vec::with_capacity(slots);
    for (idx, slot) in dense.into_iter().enumerate() {
        let kline = match slot {
            Some(kline) => kline,
            None => {
                let previous_close = series.last().map(|k| k.close).ok_or_else(|| {
                    PipelineError::Invariant("first candle slot is empty".to_string())
                })?;
                Kline::flat(first_open + idx as i64 * step, step, previous_close)
            }
        };
        series.push(kline);
    }

    verify_kline_contiguity(&series)?;
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::{merge_kline_series, verify_kline_contiguity};
    use crate::errors::PipelineError;
    use crate::value_objects::interval::Interval;
    use crate::value_objects::kline::Kline;

    const MIN: i64 = 60_000;

    fn traded(open_time: i64, open: f64, close: f64, volume: f64) -> Kline {
        Kline {
            open_time,
            close_time: open_time + MIN - 1,
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            volume,
            quote_volume: volume * close,
            trades: 1,
            taker_buy_base_volume: 0.0,
            taker_buy_quote_volume: 0.0,
        }
    }

    fn minute() -> Interval {
        Interval::parse("1m").expect("interval")
    }

    #[test]
    fn gap_between_files_is_filled_from_previous_close() {
        let day_one = vec![traded(0, 10.0, 11.0, 1.0), traded(MIN, 11.0, 12.0, 1.0)];
        let day_two = vec![traded(5 * MIN, 13.0, 14.0, 2.0)];
        let series = merge_kline_series(vec![day_two, day_one], minute()).expect("merge");
        assert_eq!(series.len(), 6);
        for flat in &series[2..5] {
            assert!(flat.is_flat());
            assert_eq!(flat.close, 12.0);
        }
        assert_eq!(series[5].open, 13.0);
        verify_kline_contiguity(&series).expect("contiguous");
    }

    #[test]
    fn shared_bucket_is_folded_in_file_order() {
        let earlier = vec![traded(0, 10.0, 9.0, 1.5)];
        let later = vec![traded(0, 9.5, 12.0, 2.25)];
        let series = merge_kline_series(vec![earlier, later], minute()).expect("merge");
        assert_eq!(series.len(), 1);
        let k = &series[0];
        assert_eq!((k.open, k.high, k.low, k.close), (10.0, 12.0, 9.0, 12.0));
        assert_eq!(k.volume, 3.75);
        assert_eq!(k.trades, 2);
    }

    #[test]
    fn flat_candle_does_not_override_traded_one() {
        let earlier = vec![traded(0, 10.0, 11.0, 1.0)];
        let later = vec![Kline::flat(0, MIN, 3.0)];
        let series = merge_kline_series(vec![earlier, later], minute()).expect("merge");
        assert_eq!(series[0].close, 11.0);
    }

    #[test]
    fn off_grid_candle_is_an_invariant_violation() {
        let slices = vec![vec![traded(0, 1.0, 1.0, 1.0)], vec![traded(MIN + 7, 1.0, 1.0, 1.0)]];
        assert!(matches!(
            merge_kline_series(slices, minute()),
            Err(PipelineError::Invariant(_))
        ));
    }

    #[test]
    fn contiguity_check_reports_broken_pair() {
        let broken = vec![traded(0, 1.0, 1.0, 1.0), traded(2 * MIN, 1.0, 1.0, 1.0)];
        let err = verify_kline_contiguity(&broken).unwrap_err();
        assert!(matches!(err, PipelineError::Invariant(_)));
    }

    #[test]
    fn per_day_slices_share_one_grid_for_multi_hour_intervals() {
        use crate::services::klines::aggregate_klines;
        use crate::value_objects::agg_trade::AggTrade;

        const DAY: i64 = 86_400_000;
        let day_start = 1_704_067_200_000;
        let trade = |id: i64, time: i64| AggTrade {
            id,
            price: 10.0 + id as f64,
            qty: 1.0,
            first_trade_id: id,
            last_trade_id: id,
            time,
            is_buyer_maker: false,
            is_best_match: None,
        };
        let four_hours = Interval::parse("4h").expect("interval");
        let day_one = aggregate_klines(&[trade(1, day_start + 1_000)], four_hours).expect("day one");
        let day_two =
            aggregate_klines(&[trade(2, day_start + DAY + 1_000)], four_hours).expect("day two");

        let series = merge_kline_series(vec![day_one, day_two], four_hours).expect("merge");
        assert_eq!(series.len(), 7);
        assert_eq!(series[6].open_time, day_start + DAY);
        assert!(series[1..6].iter().all(Kline::is_flat));
        verify_kline_contiguity(&series).expect("contiguous");
    }

    #[test]
    fn widths_that_do_not_tile_a_day_are_a_config_error() {
        for label in ["7m", "5h"] {
            let interval = Interval::parse(label).expect("interval");
            assert!(matches!(
                merge_kline_series(vec![vec![traded(0, 1.0, 1.0, 1.0)]], interval),
                Err(PipelineError::Config(_))
            ));
        }
    }

    #[test]
    fn empty_input_merges_to_empty() {
        assert!(merge_kline_series(Vec::new(), minute()).expect("merge").is_empty());
    }
}
