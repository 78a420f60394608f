use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tickvault_application::backfill::{backfill_dir, BackfillParams};
use tickvault_application::export::{kline_output_path, write_klines, ExportFormat};
use tickvault_application::gap_scan::scan_dir_gaps;
use tickvault_application::klines::dir_to_klines;
use tickvault_application::tidy::{tidy_dir, TidyParams};
use tickvault_application::verification::verify_dir;
use tickvault_domain::errors::PipelineError;
use tickvault_domain::repositories::trade_history::InMemoryTradeHistory;
use tickvault_domain::services::backfill::BackfillQuery;
use tickvault_domain::services::merge::verify_kline_contiguity;
use tickvault_domain::value_objects::agg_trade::AggTrade;
use tickvault_domain::value_objects::interval::Interval;
use tickvault_domain::value_objects::market::Market;
use tickvault_domain::value_objects::record::RowEncode;

const DAY1: i64 = 1_704_067_200_000;

fn unique_tmp_path(name: &str) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    std::env::temp_dir().join(format!("tickvault_{name}_{}_{}", std::process::id(), now))
}

/// Two days of aggregated trades, one every 7 minutes, each covering two trades.
fn history() -> Vec<AggTrade> {
    (0..400)
        .map(|idx| AggTrade {
            id: 10_000 + idx,
            price: 100.0 + (idx % 13) as f64 * 0.25,
            qty: 0.125 * ((idx % 5) + 1) as f64,
            first_trade_id: 50_000 + idx * 2,
            last_trade_id: 50_000 + idx * 2 + 1,
            time: DAY1 + idx * 7 * 60_000,
            is_buyer_maker: idx % 3 == 0,
            is_best_match: Some(true),
        })
        .collect()
}

fn write_day(dir: &std::path::Path, name: &str, records: &[AggTrade]) {
    let header = "agg_trade_id,price,quantity,first_trade_id,last_trade_id,transact_time,is_buyer_maker,is_best_match";
    let mut text = String::from(header);
    for record in records {
        text.push('\n');
        text.push_str(&record.encode_row());
    }
    fs::write(dir.join(name), text).expect("write raw day");
}

#[test]
fn backfill_tidy_and_aggregate_repairs_a_holed_archive() {
    let root = unique_tmp_path("pipeline");
    let raw = root.join("raw");
    let missing = root.join("missing");
    let tidy = root.join("tidy");
    fs::create_dir_all(&raw).expect("raw dir");

    let all = history();
    let split = all
        .iter()
        .position(|t| t.time >= DAY1 + 86_400_000)
        .expect("second day");
    let holed = |records: &[AggTrade]| -> Vec<AggTrade> {
        records
            .iter()
            .filter(|t| !(t.id % 37 == 0 || (10_150..10_160).contains(&t.id)))
            .cloned()
            .collect()
    };
    write_day(&raw, "BTCUSDT-aggTrades-2024-01-01.csv", &holed(&all[..split]));
    write_day(&raw, "BTCUSDT-aggTrades-2024-01-02.csv", &holed(&all[split..]));

    assert!(matches!(
        verify_dir::<AggTrade>(&raw, 4),
        Err(PipelineError::Discontinuity(_))
    ));
    let scan = scan_dir_gaps::<AggTrade>(&raw, None, 4).expect("scan");
    assert!(!scan.missing.is_empty());
    assert!(scan.missing.windows(2).all(|w| w[0].start_id < w[1].start_id));

    let source = InMemoryTradeHistory::new(all.clone(), 50);
    let report = backfill_dir(
        &BackfillParams {
            raw_dir: &raw,
            missing_dir: &missing,
            since: None,
            parallelism: 4,
            query: BackfillQuery::new("BTCUSDT", Market::Spot),
        },
        &source,
    )
    .expect("backfill");
    assert_eq!(report.fetched as i64, scan.missing_ids());

    let params = TidyParams {
        raw_dir: &raw,
        missing_dir: &missing,
        tidy_dir: &tidy,
        parallelism: 3,
        check_tidy_file_exists: true,
    };
    let first = tidy_dir::<AggTrade>(&params).expect("tidy");
    assert_eq!(first.merged, 2);

    let verified = verify_dir::<AggTrade>(&tidy, 4).expect("tidy is continuous");
    assert_eq!(verified.records, all.len());

    let interval = Interval::parse("5m").expect("interval");
    let run = dir_to_klines::<AggTrade>(&tidy, interval, 4).expect("klines");
    verify_kline_contiguity(&run.klines).expect("contiguous");
    let volume: f64 = run.klines.iter().map(|k| k.volume).sum();
    let expected: f64 = all.iter().map(|t| t.qty).sum();
    assert!((volume - expected).abs() < 1e-8);
    let trades: i64 = run.klines.iter().map(|k| k.trades).sum();
    assert_eq!(trades, all.len() as i64 * 2);

    let out = kline_output_path(&root.join("out"), "BTCUSDT", interval, ExportFormat::Csv);
    write_klines(&out, &run.klines, ExportFormat::Csv).expect("export");
    assert_eq!(
        fs::read_to_string(&out).expect("read").lines().count(),
        run.klines.len()
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn second_tidy_run_leaves_outputs_untouched() {
    let root = unique_tmp_path("tidy_idempotent");
    let raw = root.join("raw");
    let missing = root.join("missing");
    let tidy = root.join("tidy");
    fs::create_dir_all(&raw).expect("raw dir");
    fs::create_dir_all(&missing).expect("missing dir");

    let all = history();
    write_day(&raw, "BTCUSDT-aggTrades-2024-01-01.csv", &all[..10]);
    write_day(&missing, "BTCUSDT-aggTrades-2024-01-01.csv", &all[10..12]);

    let params = TidyParams {
        raw_dir: &raw,
        missing_dir: &missing,
        tidy_dir: &tidy,
        parallelism: 2,
        check_tidy_file_exists: true,
    };
    tidy_dir::<AggTrade>(&params).expect("first run");
    let path = tidy.join("BTCUSDT-aggTrades-2024-01-01.csv");
    let before = fs::read_to_string(&path).expect("read");
    let modified = fs::metadata(&path).and_then(|m| m.modified()).expect("mtime");

    let second = tidy_dir::<AggTrade>(&params).expect("second run");
    assert_eq!(second.skipped, 1);
    assert_eq!(second.merged + second.copied + second.backfill_only, 0);
    assert_eq!(fs::read_to_string(&path).expect("read"), before);
    assert_eq!(
        fs::metadata(&path).and_then(|m| m.modified()).expect("mtime"),
        modified
    );

    let _ = fs::remove_dir_all(&root);
}
