use crate::errors::PipelineError;
use serde::Serialize;

pub const SECOND_MS: i64 = 1_000;
pub const MINUTE_MS: i64 = 60 * SECOND_MS;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;
pub const WEEK_MS: i64 = 7 * DAY_MS;

/// Fixed candle width in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Interval {
    millis: i64,
}

impl Interval {
    pub fn from_millis(millis: i64) -> Result<Self, PipelineError> {
        if millis <= 0 {
            return Err(PipelineError::Config(format!(
                "interval must be positive, got {millis}ms"
            )));
        }
        Ok(Self { millis })
    }

    /// Accepts exchange labels (`1s`, `1m`, `4h`, `1d`, `1w`, ...) and
    /// `<n><unit>` with units `s m h d w` or their long forms.
    pub fn parse(value: &str) -> Result<Self, PipelineError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::Config("empty interval".to_string()));
        }
        let lowered = trimmed.to_lowercase();
        if trimmed == "1M" || lowered.ends_with("mo") || lowered.ends_with("month") {
            return Err(PipelineError::Config(format!(
                "calendar-month interval {trimmed} has no fixed width"
            )));
        }
        let (number_part, unit_ms) = if let Some(stripped) = lowered.strip_suffix("min") {
            (stripped, MINUTE_MS)
        } else if let Some(stripped) = lowered.strip_suffix("hour") {
            (stripped, HOUR_MS)
        } else if let Some(stripped) = lowered.strip_suffix("day") {
            (stripped, DAY_MS)
        } else if let Some(stripped) = lowered.strip_suffix("week") {
            (stripped, WEEK_MS)
        } else if let Some(stripped) = lowered.strip_suffix("ms") {
            (stripped, 1)
        } else {
            let (number_part, unit) = lowered.split_at(lowered.len().saturating_sub(1));
            let unit_ms = match unit {
                "s" => SECOND_MS,
                "m" => MINUTE_MS,
                "h" => HOUR_MS,
                "d" => DAY_MS,
                "w" => WEEK_MS,
                _ => {
                    return Err(PipelineError::Config(format!(
                        "unsupported interval unit in {value:?}"
                    )))
                }
            };
            (number_part, unit_ms)
        };
        let count: i64 = number_part
            .parse()
            .map_err(|_| PipelineError::Config(format!("invalid interval: {value:?}")))?;
        Self::from_millis(count.saturating_mul(unit_ms))
    }

    pub fn millis(&self) -> i64 {
        self.millis
    }

    pub fn is_sub_daily(&self) -> bool {
        self.millis < DAY_MS
    }

    /// True when whole buckets tile a UTC day, so every midnight is a bucket edge.
    pub fn divides_day(&self) -> bool {
        DAY_MS % self.millis == 0
    }

    /// Candle widths must be shorter than a day and tile it exactly; any other
    /// width would give each day file its own grid.
    pub fn ensure_candle_width(self) -> Result<Self, PipelineError> {
        if !self.is_sub_daily() {
            return Err(PipelineError::Config(format!(
                "candle interval must be shorter than one day, got {self}"
            )));
        }
        if !self.divides_day() {
            return Err(PipelineError::Config(format!(
                "candle interval must divide one day evenly, got {self}"
            )));
        }
        Ok(self)
    }

    /// Shortest exchange-style label, used in output file names.
    pub fn label(&self) -> String {
        for (unit_ms, suffix) in [
            (WEEK_MS, "w"),
            (DAY_MS, "d"),
            (HOUR_MS, "h"),
            (MINUTE_MS, "m"),
            (SECOND_MS, "s"),
        ] {
            if self.millis % unit_ms == 0 {
                return format!("{}{suffix}", self.millis / unit_ms);
            }
        }
        format!("{}ms", self.millis)
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::{Interval, DAY_MS, HOUR_MS, MINUTE_MS};
    use crate::errors::PipelineError;

    #[test]
    fn parses_exchange_labels() {
        assert_eq!(Interval::parse("1m").unwrap().millis(), MINUTE_MS);
        assert_eq!(Interval::parse("15min").unwrap().millis(), 15 * MINUTE_MS);
        assert_eq!(Interval::parse("4h").unwrap().millis(), 4 * HOUR_MS);
        assert_eq!(Interval::parse("1d").unwrap().millis(), DAY_MS);
        assert_eq!(Interval::parse("1s").unwrap().label(), "1s");
        assert_eq!(Interval::parse("90s").unwrap().label(), "90s");
        assert_eq!(Interval::parse("120m").unwrap().label(), "2h");
    }

    #[test]
    fn rejects_month_zero_and_garbage() {
        for raw in ["1mo", "1M", "0m", "", "abc", "5x"] {
            assert!(
                matches!(Interval::parse(raw), Err(PipelineError::Config(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn sub_daily_excludes_one_day() {
        assert!(Interval::parse("12h").unwrap().is_sub_daily());
        assert!(!Interval::parse("1d").unwrap().is_sub_daily());
    }

    #[test]
    fn candle_width_must_tile_a_day() {
        for ok in ["1s", "1m", "7200s", "15m", "4h", "12h"] {
            assert!(Interval::parse(ok).unwrap().ensure_candle_width().is_ok(), "{ok}");
        }
        for bad in ["7m", "11m", "5h", "1d", "1w"] {
            assert!(
                matches!(
                    Interval::parse(bad).unwrap().ensure_candle_width(),
                    Err(PipelineError::Config(_))
                ),
                "{bad} should be rejected"
            );
        }
        assert!(Interval::parse("90s").unwrap().divides_day());
        assert!(!Interval::parse("7m").unwrap().divides_day());
    }
}
