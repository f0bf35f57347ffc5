//! # Freshness Rendering
//!
//! Renders a duration in seconds into the human string shown next to each
//! node. The same precedence applies to both "last seen" ages and device
//! uptimes: coarser units swallow finer ones as the duration grows, and at
//! two days or more only the day count remains.

/// Renders seconds as a human-readable duration string.
///
/// Precedence:
/// - under a minute: `"S seconds"`
/// - under an hour: `"M min S sec"`
/// - under a day: `"H hours M min"`
/// - one to two days: `"D days H hours"`
/// - two days or more: `"D days"`
///
/// Negative input (a timestamp slightly in the future, e.g. clock skew on
/// an event-stamped packet) clamps to zero.
pub fn duration_string(total_seconds: i64) -> String {
    let total = total_seconds.max(0);

    let days = total / 86_400;
    let rem = total % 86_400;
    let hours = rem / 3_600;
    let minutes = (rem % 3_600) / 60;
    let seconds = rem % 60;

    if days == 0 && hours == 0 && minutes == 0 {
        format!("{seconds} seconds")
    } else if days == 0 && hours == 0 {
        format!("{minutes} min {seconds} sec")
    } else if days == 0 {
        format!("{hours} hours {minutes} min")
    } else if days < 2 {
        format!("{days} days {hours} hours")
    } else {
        format!("{days} days")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_only_under_a_minute() {
        assert_eq!(duration_string(0), "0 seconds");
        assert_eq!(duration_string(59), "59 seconds");
    }

    #[test]
    fn test_minutes_under_an_hour() {
        assert_eq!(duration_string(60), "1 min 0 sec");
        assert_eq!(duration_string(61), "1 min 1 sec");
        assert_eq!(duration_string(3_599), "59 min 59 sec");
    }

    #[test]
    fn test_hours_under_a_day() {
        assert_eq!(duration_string(3_600), "1 hours 0 min");
        assert_eq!(duration_string(5_400), "1 hours 30 min");
        assert_eq!(duration_string(86_399), "23 hours 59 min");
    }

    #[test]
    fn test_days_with_hours_under_two_days() {
        // 25 hours
        assert_eq!(duration_string(90_000), "1 days 1 hours");
        assert_eq!(duration_string(86_400), "1 days 0 hours");
    }

    #[test]
    fn test_days_only_at_two_days() {
        // 50 hours: the hour component is dropped entirely
        assert_eq!(duration_string(180_000), "2 days");
        assert_eq!(duration_string(1_000_000), "11 days");
    }

    #[test]
    fn test_negative_clamps_to_zero() {
        assert_eq!(duration_string(-30), "0 seconds");
    }
}
