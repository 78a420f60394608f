use clap::ValueEnum;
use std::io::IsTerminal;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Env var holding a full `EnvFilter` directive; overrides `--log-level`.
pub const LOG_ENV: &str = "TICKVAULT_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy)]
enum MetricKind {
    Counter,
    Histogram,
}

const METRICS: &[(MetricKind, &str, &str)] = &[
    (MetricKind::Counter, "tickvault.files.calls_total", "CSV reads, writes and copies"),
    (MetricKind::Histogram, "tickvault.files.op_ms", "CSV file operation latency"),
    (MetricKind::Counter, "tickvault.verify.files_total", "Day files found continuous"),
    (MetricKind::Histogram, "tickvault.verify.dir_ms", "Directory verification latency"),
    (MetricKind::Counter, "tickvault.gaps.ranges_total", "Missing id ranges found"),
    (MetricKind::Histogram, "tickvault.gaps.scan_ms", "Gap scan latency"),
    (MetricKind::Counter, "tickvault.backfill.ranges_total", "Ranges fetched or skipped"),
    (MetricKind::Counter, "tickvault.backfill.records_total", "Records fetched from REST"),
    (MetricKind::Histogram, "tickvault.backfill.range_ms", "Per-range backfill latency"),
    (MetricKind::Counter, "tickvault.tidy.files_total", "Day files written by tidy"),
    (MetricKind::Histogram, "tickvault.tidy.file_ms", "Per-file tidy latency"),
    (MetricKind::Counter, "tickvault.klines.candles_total", "Candles emitted"),
    (MetricKind::Counter, "tickvault.klines.flat_total", "Flat candles filled into gaps"),
    (MetricKind::Histogram, "tickvault.klines.aggregate_ms", "Candle aggregation latency"),
    (MetricKind::Counter, "tickvault.export.files_total", "CSV files converted to JSON"),
    (MetricKind::Counter, "tickvault.infra.binance.requests_total", "REST requests sent"),
    (MetricKind::Counter, "tickvault.infra.binance.retries_total", "REST requests retried"),
    (MetricKind::Counter, "tickvault.infra.binance.errors_total", "REST requests failed"),
    (MetricKind::Counter, "tickvault.infra.archive.downloads_total", "Archive downloads"),
    (MetricKind::Counter, "tickvault.infra.archive.retries_total", "Archive download retries"),
    (MetricKind::Histogram, "tickvault.infra.archive.download_ms", "Archive download latency"),
];

/// The filter directive in effect: `TICKVAULT_LOG` when set and non-blank,
/// otherwise the CLI level.
fn filter_directive(cli_level: &str, env_value: Option<&str>) -> String {
    match env_value.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => cli_level.to_string(),
    }
}

/// Installs the global subscriber. Logs always go to stderr because stdout
/// carries the JSON reports.
pub fn init_tracing(log_level: &str, log_format: LogFormat) -> Result<(), String> {
    let env_value = std::env::var(LOG_ENV).ok();
    let directive = filter_directive(log_level, env_value.as_deref());
    let env_filter = tracing_subscriber::EnvFilter::try_new(&directive)
        .map_err(|err| format!("invalid log filter {directive:?}: {err}"))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    let result = match log_format {
        LogFormat::Pretty => builder
            .with_ansi(std::io::stderr().is_terminal())
            .try_init(),
        LogFormat::Json => builder.with_ansi(false).json().try_init(),
    };
    result.map_err(|err| format!("failed to install log subscriber: {err}"))
}

/// Accepts `host:port`, or a bare port bound on loopback.
pub fn parse_metrics_addr(raw: &str) -> Result<SocketAddr, String> {
    let raw = raw.trim();
    if let Ok(port) = raw.parse::<u16>() {
        return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port));
    }
    raw.parse()
        .map_err(|err| format!("invalid --metrics-addr {raw:?} (expected host:port or port): {err}"))
}

fn describe_metrics() {
    for &(kind, name, help) in METRICS {
        match kind {
            MetricKind::Counter => metrics::describe_counter!(name, help),
            MetricKind::Histogram => {
                metrics::describe_histogram!(name, metrics::Unit::Milliseconds, help)
            }
        }
    }
}

#[cfg(feature = "prometheus")]
pub fn init_metrics(metrics_addr: Option<&str>) -> Result<Option<SocketAddr>, String> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let Some(raw) = metrics_addr else {
        return Ok(None);
    };
    let addr = parse_metrics_addr(raw)?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|err| format!("failed to serve metrics on {addr}: {err}"))?;
    describe_metrics();

    tracing::info!(metrics_addr = %addr, metrics = METRICS.len(), "serving prometheus metrics");
    Ok(Some(addr))
}

#[cfg(not(feature = "prometheus"))]
pub fn init_metrics(metrics_addr: Option<&str>) -> Result<Option<SocketAddr>, String> {
    match metrics_addr {
        Some(raw) => {
            parse_metrics_addr(raw)?;
            Err("--metrics-addr needs tickvault-cli built with feature `prometheus`".to_string())
        }
        None => {
            describe_metrics();
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{filter_directive, parse_metrics_addr, MetricKind, METRICS};
    use std::collections::HashSet;
    use std::net::SocketAddr;

    #[test]
    fn env_directive_wins_unless_blank() {
        assert_eq!(filter_directive("info", None), "info");
        assert_eq!(filter_directive("info", Some("  ")), "info");
        assert_eq!(
            filter_directive("info", Some("tickvault_application=debug")),
            "tickvault_application=debug"
        );
    }

    #[test]
    fn bare_port_binds_loopback() {
        assert_eq!(
            parse_metrics_addr("9184").expect("port"),
            "127.0.0.1:9184".parse::<SocketAddr>().expect("addr")
        );
        assert_eq!(
            parse_metrics_addr("0.0.0.0:9000").expect("addr").port(),
            9000
        );
        let err = parse_metrics_addr("localhost").unwrap_err();
        assert!(err.contains("--metrics-addr"));
    }

    #[test]
    fn described_metrics_are_unique_and_namespaced() {
        let mut seen = HashSet::new();
        for &(kind, name, _) in METRICS {
            assert!(name.starts_with("tickvault."), "{name}");
            assert!(seen.insert(name), "{name} listed twice");
            match kind {
                MetricKind::Counter => assert!(name.ends_with("_total"), "{name}"),
                MetricKind::Histogram => assert!(name.ends_with("_ms"), "{name}"),
            }
        }
    }
}
