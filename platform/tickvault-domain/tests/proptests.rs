use proptest::prelude::*;
use tickvault_domain::services::continuity::verify_continuity;
use tickvault_domain::services::gaps::scan_id_sequence;
use tickvault_domain::services::klines::aggregate_klines;
use tickvault_domain::services::merge::{merge_kline_series, verify_kline_contiguity};
use tickvault_domain::value_objects::agg_trade::AggTrade;
use tickvault_domain::value_objects::interval::Interval;

const T0: i64 = 1_609_459_200_000;
const DAY_MS: i64 = 86_400_000;

/// Candle widths that tile a UTC day, from one minute up to twelve hours.
fn day_tiling_interval() -> impl Strategy<Value = Interval> {
    prop::sample::select(vec![
        60_000i64, 180_000, 300_000, 900_000, 1_800_000, 3_600_000, 7_200_000,
        14_400_000, 21_600_000, 28_800_000, 43_200_000,
    ])
    .prop_map(|millis| Interval::from_millis(millis).expect("interval"))
}

/// Contiguous aggregated trades: each covers `widths[i]` underlying trades.
fn contiguous_aggs(widths: &[i64], time_steps: &[i64]) -> Vec<AggTrade> {
    let mut next_trade_id = 1_000;
    let mut time = T0;
    widths
        .iter()
        .zip(time_steps.iter().cycle())
        .enumerate()
        .map(|(idx, (width, step))| {
            time += step;
            let trade = AggTrade {
                id: idx as i64 + 1,
                price: 100.0 + (idx % 7) as f64,
                qty: 1.0,
                first_trade_id: next_trade_id,
                last_trade_id: next_trade_id + width - 1,
                time,
                is_buyer_maker: idx % 2 == 0,
                is_best_match: Some(true),
            };
            next_trade_id += width;
            trade
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn contiguous_sequences_verify_at_every_parallelism(
        widths in prop::collection::vec(1i64..5, 1..200),
    ) {
        let records = contiguous_aggs(&widths, &[10]);
        for parallelism in 1..=16 {
            prop_assert!(verify_continuity(&records, parallelism).is_ok());
        }
    }

    #[test]
    fn injected_gap_is_reported_exactly(
        len in 2usize..200,
        at in 1usize..200,
        gap in 1i64..500,
    ) {
        let at = at % (len - 1) + 1;
        let mut records = contiguous_aggs(&vec![1; len], &[10]);
        for record in records.iter_mut().skip(at) {
            record.id += gap;
        }
        let report = scan_id_sequence(&records);
        prop_assert_eq!(report.missing.len(), 1);
        let range = report.missing[0];
        prop_assert_eq!(range.end_id - range.start_id + 1, gap);
        prop_assert_eq!(range.start_time, records[at - 1].time);
        prop_assert_eq!(range.end_time, records[at].time);
    }

    #[test]
    fn candle_volume_matches_trade_volume(
        qtys in prop::collection::vec(1u32..1_000_000, 1..300),
        steps in prop::collection::vec(0i64..90_000, 1..20),
        interval in day_tiling_interval(),
    ) {
        let mut trades = contiguous_aggs(&vec![1; qtys.len()], &steps);
        let mut expected = 0.0;
        for (trade, qty) in trades.iter_mut().zip(&qtys) {
            // Four decimal places keeps every partial sum exact at eight.
            trade.qty = f64::from(*qty) / 10_000.0;
            expected += trade.qty;
        }
        let klines = aggregate_klines(&trades, interval).expect("klines");
        let total: f64 = klines.iter().map(|k| k.volume).sum();
        prop_assert!((total - expected).abs() <= 1e-8 * qtys.len() as f64);
        prop_assert!(verify_kline_contiguity(&klines).is_ok());
    }

    #[test]
    fn merged_series_is_contiguous(
        day_offsets in prop::collection::vec(0i64..5, 1..6),
        steps in prop::collection::vec(1i64..30_000_000, 1..10),
        interval in day_tiling_interval(),
    ) {
        let mut slices = Vec::new();
        for day in day_offsets {
            // Large steps let a slice run past its own midnight.
            let mut trades = contiguous_aggs(&[1, 1, 1, 1], &steps);
            for trade in trades.iter_mut() {
                trade.time += day * DAY_MS;
            }
            slices.push(aggregate_klines(&trades, interval).expect("klines"));
        }
        let series = merge_kline_series(slices, interval).expect("merge");
        prop_assert!(verify_kline_contiguity(&series).is_ok());
        for pair in series.windows(2) {
            prop_assert_eq!(pair[1].open_time, pair[0].close_time + 1);
        }
        for kline in &series {
            prop_assert_eq!((kline.open_time - T0) % interval.millis(), 0);
        }
    }
}
