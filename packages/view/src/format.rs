//! Display formatting for the status view.

use chrono::{DateTime, Utc};

/// Renders an uptime in seconds as `"5d 3h 24m 15s"`, leaving out zero
/// parts. Fractions of a second are dropped.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_uptime(seconds: f64) -> String {
    if seconds.is_nan() || seconds < 0.0 {
        return "Invalid uptime".to_string();
    }

    let total = seconds.floor() as u64;
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let secs = total % 60;

    let mut parts = Vec::with_capacity(4);
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{secs}s"));
    }

    parts.join(" ")
}

/// Renders an RFC 3339 timestamp as `"28 Oct 2025, 19:59:39"` (UTC).
#[must_use]
pub fn format_timestamp(iso: &str) -> String {
    DateTime::parse_from_rfc3339(iso.trim()).map_or_else(
        |_| "Invalid timestamp".to_string(),
        |t| {
            t.with_timezone(&Utc)
                .format("%-d %b %Y, %H:%M:%S")
                .to_string()
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_parts() {
        assert_eq!(format_uptime(443_055.0), "5d 3h 4m 15s");
        assert_eq!(format_uptime(3_600.0), "1h");
        assert_eq!(format_uptime(61.9), "1m 1s");
        assert_eq!(format_uptime(86_400.0 + 5.0), "1d 5s");
    }

    #[test]
    fn uptime_edge_cases() {
        assert_eq!(format_uptime(0.0), "0s");
        assert_eq!(format_uptime(0.4), "0s");
        assert_eq!(format_uptime(-1.0), "Invalid uptime");
        assert_eq!(format_uptime(f64::NAN), "Invalid uptime");
    }

    #[test]
    fn timestamps() {
        assert_eq!(
            format_timestamp("2025-10-28T19:59:39.034Z"),
            "28 Oct 2025, 19:59:39"
        );
        assert_eq!(
            format_timestamp("2025-03-01T01:02:03+01:00"),
            "1 Mar 2025, 00:02:03"
        );
        assert_eq!(format_timestamp("yesterday"), "Invalid timestamp");
        assert_eq!(format_timestamp(""), "Invalid timestamp");
    }
}
