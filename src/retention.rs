//! History-retention background task: periodically deletes chat messages
//! older than the configured window. Runs until the process exits; a
//! failed pass is logged and does not stop future iterations.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info};

use crate::db::Database;
use crate::metrics;

pub async fn run(db: Arc<Database>, every: Duration, window: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let cutoff = Utc::now() - window;
        match db.messages().delete_older_than(cutoff).await {
            Ok(pruned) => {
                metrics::record_retention_run(pruned);
                info!(pruned, cutoff = %cutoff, "retention pass complete");
            }
            Err(e) => {
                error!(error = %e, "retention pass failed");
            }
        }
    }
}

/// Parses an ISO-8601 duration (`PnYnMnDTnHnMnS`, with only the `D`/`H`/`M`/`S`
/// designators Melodious's config actually needs). Fractional seconds are
/// accepted; years/months are not, since they are not calendar-fixed
/// durations.
pub fn parse_iso8601_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let rest = s.strip_prefix('P').ok_or_else(|| format!("duration `{s}` must start with `P`"))?;

    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (rest, None),
    };

    let mut seconds: f64 = 0.0;

    seconds += parse_designator(date_part, 'D')? * 86_400.0;

    if let Some(time_part) = time_part {
        seconds += parse_designator(time_part, 'H')? * 3_600.0;
        seconds += parse_designator(time_part, 'M')? * 60.0;
        seconds += parse_designator(time_part, 'S')?;
    }

    if seconds < 0.0 {
        return Err(format!("duration `{s}` must not be negative"));
    }
    Ok(Duration::from_secs_f64(seconds))
}

/// Extracts the numeric value preceding a single designator letter
/// (`D`, `H`, `M`, `S`) from one ISO-8601 date-or-time segment. Returns 0.0
/// if the designator is absent.
fn parse_designator(segment: &str, designator: char) -> Result<f64, String> {
    let Some(idx) = segment.find(designator) else { return Ok(0.0) };

    let start = segment[..idx]
        .rfind(|c: char| !c.is_ascii_digit() && c != '.')
        .map(|i| i + 1)
        .unwrap_or(0);

    segment[start..idx]
        .parse::<f64>()
        .map_err(|_| format!("invalid numeric value before `{designator}` in `{segment}`"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minutes() {
        assert_eq!(parse_iso8601_duration("PT5M").unwrap(), Duration::from_secs(300));
    }

    #[test]
    fn parses_hours() {
        assert_eq!(parse_iso8601_duration("PT1H").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn parses_days() {
        assert_eq!(parse_iso8601_duration("P1D").unwrap(), Duration::from_secs(86_400));
    }

    #[test]
    fn parses_combined_date_and_time() {
        assert_eq!(
            parse_iso8601_duration("P1DT2H30M").unwrap(),
            Duration::from_secs(86_400 + 2 * 3600 + 30 * 60)
        );
    }

    #[test]
    fn rejects_missing_p_prefix() {
        assert!(parse_iso8601_duration("5M").is_err());
    }

    #[test]
    fn parses_fractional_seconds() {
        assert_eq!(parse_iso8601_duration("PT1.5S").unwrap(), Duration::from_secs_f64(1.5));
    }
}
