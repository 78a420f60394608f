use std::path::Path;
use tickvault_application::files::read_rows;
use tickvault_domain::services::kline_audit::audit_klines;
use tickvault_domain::value_objects::interval::Interval;
use tickvault_domain::value_objects::kline::Kline;

pub(super) fn run_audit_klines(file: &Path, interval: Option<&str>) -> Result<(), String> {
    let interval = interval
        .map(Interval::parse)
        .transpose()
        .map_err(|err| err.to_string())?;
    let klines: Vec<Kline> = read_rows(file).map_err(|err| err.to_string())?;
    let audit = audit_klines(&klines, interval).map_err(|err| err.to_string())?;
    super::common::print_json(&audit)?;
    if !audit.is_ok() {
        return Err(format!(
            "kline audit of {} found {} missing buckets, {} bad close times, {} out of order",
            file.display(),
            audit.missing_open_times.len(),
            audit.bad_close_times.len(),
            audit.out_of_order
        ));
    }
    Ok(())
}
