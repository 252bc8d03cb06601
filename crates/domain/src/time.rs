//! Timestamps as the object graph exchanges them (epoch milliseconds).

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

/// UTC timestamp used for state `ts`/`lc` values and log records.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Parse a log-file time stamp (`2025-08-23 23:37:53.529`, host local time).
#[must_use]
pub fn parse_log_time(text: &str) -> Option<Timestamp> {
    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.3f").ok()?;
    let local = Local.from_local_datetime(&naive).earliest()?;
    Some(local.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_return_current_utc_time() {
        let before = Utc::now();
        let ts = now();
        let after = Utc::now();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    #[test]
    fn should_parse_log_time_with_millis() {
        assert!(parse_log_time("2025-08-23 23:37:53.529").is_some());
    }

    #[test]
    fn should_reject_garbage_log_time() {
        assert!(parse_log_time("yesterday at noon").is_none());
    }
}
