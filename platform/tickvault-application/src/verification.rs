use crate::files::{list_day_files, read_trades, DayFile};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tickvault_domain::errors::PipelineError;
use tickvault_domain::services::continuity::{verify_continuity, verify_file_boundaries, FileSpan};
use tickvault_domain::services::pool::run_bounded;
use tickvault_domain::value_objects::record::TradeRecord;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VerifyReport {
    pub files: usize,
    pub empty_files: usize,
    pub records: usize,
    pub first_trade_id: Option<i64>,
    pub last_trade_id: Option<i64>,
}

/// Verifies trade-id continuity inside every day file of `dir` and across
/// file boundaries in file-name order.
///
/// Files are checked on the worker pool; boundaries are checked afterwards
/// from the cached first/last ids. Files with no usable
/// records do not take part in the boundary check.
pub fn verify_dir<T: TradeRecord>(
    dir: &Path,
    parallelism: usize,
) -> Result<VerifyReport, PipelineError> {
    verify_dir_with::<T, _, _>(dir, parallelism, |_, _| Ok(())).map(|(report, _)| report)
}

/// [`verify_dir`] that also hands each file's decoded records to `per_file`
/// once its in-file check passed, so callers needing the records decode every
/// file only once.
///
/// `per_file` results come back in file order. They are only returned when
/// the boundary check passes as well.
pub(crate) fn verify_dir_with<T, R, F>(
    dir: &Path,
    parallelism: usize,
    per_file: F,
) -> Result<(VerifyReport, Vec<R>), PipelineError>
where
    T: TradeRecord,
    R: Send,
    F: Fn(&DayFile, &[T]) -> Result<R, PipelineError> + Sync,
{
    let span = tracing::info_span!(
        "verify_dir",
        dir = %dir.display(),
        kind = %T::KIND,
        parallelism
    );
    let _enter = span.enter();
    let start = Instant::now();

    let result = verify_dir_inner::<T, R, F>(dir, parallelism, per_file);
    let result_label = if result.is_ok() { "ok" } else { "err" };
    metrics::histogram!("tickvault.verify.dir_ms", "result" => result_label)
        .record(start.elapsed().as_millis() as f64);
    match &result {
        Ok((report, _)) => tracing::info!(
            files = report.files,
            records = report.records,
            first_trade_id = ?report.first_trade_id,
            last_trade_id = ?report.last_trade_id,
            "directory is continuous"
        ),
        Err(err) => tracing::error!(error = %err, "directory verification failed"),
    }
    result
}

fn verify_dir_inner<T, R, F>(
    dir: &Path,
    parallelism: usize,
    per_file: F,
) -> Result<(VerifyReport, Vec<R>), PipelineError>
where
    T: TradeRecord,
    R: Send,
    F: Fn(&DayFile, &[T]) -> Result<R, PipelineError> + Sync,
{
    let files = list_day_files(dir, T::KIND)?;
    // Spare workers go to partitions inside each file.
    let partitions = (parallelism / files.len().max(1)).max(1);
    let checked = run_bounded(&files, parallelism, |_, file| {
        let records = read_trades::<T>(&file.path)?;
        verify_continuity(&records, partitions).map_err(|err| err.at(file.name.clone()))?;
        metrics::counter!("tickvault.verify.files_total").increment(1);
        tracing::debug!(file = %file.name, records = records.len(), "file is continuous");
        let output = per_file(file, &records)?;
        Ok((records.len(), FileSpan::of(file.name.clone(), &records), output))
    })?;

    let mut report = VerifyReport {
        files: files.len(),
        ..VerifyReport::default()
    };
    let mut spans = Vec::with_capacity(checked.len());
    let mut outputs = Vec::with_capacity(checked.len());
    for (records, span, output) in checked {
        report.records += records;
        match span {
            Some(span) => spans.push(span),
            None => report.empty_files += 1,
        }
        outputs.push(output);
    }
    verify_file_boundaries(&spans)?;
    report.first_trade_id = spans.first().map(|span| span.first_trade_id);
    report.last_trade_id = spans.last().map(|span| span.last_trade_id);
    Ok((report, outputs))
}

#[cfg(test)]
mod tests {
    use super::{verify_dir, verify_dir_with};
    use crate::test_support::unique_tmp_dir;
    use std::fs;
    use tickvault_domain::errors::PipelineError;
    use tickvault_domain::value_objects::agg_trade::AggTrade;
    use tickvault_domain::value_objects::spot_trade::SpotTrade;

    fn agg_rows(ids: std::ops::Range<i64>) -> String {
        ids.map(|id| format!("{id},10.0,1.0,{},{},{},true", id * 2, id * 2 + 1, 1_000 + id))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn continuous_directory_passes() {
        let dir = unique_tmp_dir("verify_ok");
        fs::write(dir.join("X-aggTrades-2024-01-01.csv"), agg_rows(0..10)).expect("write");
        fs::write(dir.join("X-aggTrades-2024-01-02.csv"), "").expect("write");
        fs::write(dir.join("X-aggTrades-2024-01-03.csv"), agg_rows(10..25)).expect("write");

        let report = verify_dir::<AggTrade>(&dir, 3).expect("verify");
        assert_eq!(report.files, 3);
        assert_eq!(report.empty_files, 1);
        assert_eq!(report.records, 25);
        assert_eq!(report.first_trade_id, Some(0));
        assert_eq!(report.last_trade_id, Some(49));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn boundary_gap_fails_directory() {
        let dir = unique_tmp_dir("verify_gap");
        fs::write(dir.join("X-aggTrades-2024-01-01.csv"), agg_rows(0..10)).expect("write");
        fs::write(dir.join("X-aggTrades-2024-01-02.csv"), agg_rows(12..20)).expect("write");

        let err = verify_dir::<AggTrade>(&dir, 2).unwrap_err();
        match err {
            PipelineError::Discontinuity(gap) => {
                assert_eq!((gap.gap_start_id, gap.gap_end_id), (20, 23));
                assert!(gap.context.unwrap_or_default().contains("2024-01-02"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn single_file_trade_gap_names_the_file() {
        let dir = unique_tmp_dir("verify_trades");
        fs::write(
            dir.join("X-trades-2024-01-01.csv"),
            "1,10,1,10,1000,true,true\n2,10,1,10,1001,true,true\n4,10,1,10,1002,true,true",
        )
        .expect("write");
        let err = verify_dir::<SpotTrade>(&dir, 1).unwrap_err();
        assert!(err.to_string().contains("X-trades-2024-01-01.csv"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn undated_csv_files_are_ignored() {
        let dir = unique_tmp_dir("verify_stray");
        fs::write(dir.join("X-aggTrades-2024-01-01.csv"), agg_rows(0..10)).expect("write");
        fs::write(dir.join("notes.csv"), "garbage").expect("write");

        let report = verify_dir::<AggTrade>(&dir, 2).expect("verify");
        assert_eq!(report.files, 1);
        assert_eq!(report.records, 10);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn per_file_results_come_back_in_file_order() {
        let dir = unique_tmp_dir("verify_with");
        fs::write(dir.join("X-aggTrades-2024-01-02.csv"), agg_rows(10..15)).expect("write");
        fs::write(dir.join("X-aggTrades-2024-01-01.csv"), agg_rows(0..10)).expect("write");

        let (report, firsts) = verify_dir_with::<AggTrade, _, _>(&dir, 2, |file, records| {
            Ok((file.name.clone(), records.first().map(|r| r.id)))
        })
        .expect("verify");
        assert_eq!(report.records, 15);
        assert_eq!(
            firsts,
            vec![
                ("X-aggTrades-2024-01-01.csv".to_string(), Some(0)),
                ("X-aggTrades-2024-01-02.csv".to_string(), Some(10)),
            ]
        );

        fs::write(dir.join("X-aggTrades-2024-01-03.csv"), agg_rows(40..45)).expect("write");
        let err = verify_dir_with::<AggTrade, _, _>(&dir, 2, |_, records| Ok(records.len()))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Discontinuity(_)));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_directory_is_continuous() {
        let dir = unique_tmp_dir("verify_empty");
        let report = verify_dir::<AggTrade>(&dir, 4).expect("verify");
        assert_eq!(report.files, 0);
        let _ = fs::remove_dir_all(&dir);
    }
}
