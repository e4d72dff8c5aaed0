//! Unconfigured-installation expiry policy.

use chrono::{DateTime, Utc};

/// Whether an installation has sat unconfigured for longer than `timeout_ms`.
///
/// Configured installations never expire. Elapsed time equal to the
/// timeout is not yet expired. Callers pass one `now` so the comparison
/// cannot straddle a clock tick.
pub fn is_expired(
    configured: bool,
    initialized_at: DateTime<Utc>,
    timeout_ms: i64,
    now: DateTime<Utc>,
) -> bool {
    if configured {
        return false;
    }
    (now - initialized_at).num_milliseconds() > timeout_ms
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const HOUR_MS: i64 = 3_600_000;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn configured_never_expires() {
        for elapsed_days in [0, 1, 365, 10_000] {
            let now = start() + Duration::days(elapsed_days);
            assert!(!is_expired(true, start(), HOUR_MS, now));
        }
    }

    #[test]
    fn exactly_at_timeout_is_not_expired() {
        let now = start() + Duration::milliseconds(HOUR_MS);
        assert!(!is_expired(false, start(), HOUR_MS, now));
    }

    #[test]
    fn one_millisecond_past_timeout_is_expired() {
        let now = start() + Duration::milliseconds(HOUR_MS + 1);
        assert!(is_expired(false, start(), HOUR_MS, now));
    }

    #[test]
    fn within_window_is_not_expired() {
        let now = start() + Duration::minutes(5);
        assert!(!is_expired(false, start(), HOUR_MS, now));
    }

    #[test]
    fn clock_behind_initialization_is_not_expired() {
        let now = start() - Duration::minutes(5);
        assert!(!is_expired(false, start(), HOUR_MS, now));
    }
}
