//! Centralized formatting for user-facing numbers and durations.
//!
//! Point totals, quest durations and task times all go through this module so
//! that announcements, leaderboards and the validator print them identically.

/// Format a point total with thousands separators.
///
/// - Standard: `12,500`
/// - European: `12.500`
///
/// # Examples
/// ```
/// use questbot_types::formatting::format_points;
/// assert_eq!(format_points(0, false), "0");
/// assert_eq!(format_points(950, false), "950");
/// assert_eq!(format_points(12_500, false), "12,500");
/// assert_eq!(format_points(12_500, true), "12.500");
/// ```
pub fn format_points(n: u64, european: bool) -> String {
    let separator = if european { '.' } else { ',' };
    let digits = n.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(separator);
        }
        result.push(c);
    }
    result
}

/// Format a duration in the same compact unit notation quest files use.
///
/// Zero-valued units are omitted; a zero duration renders as `0s`.
///
/// # Examples
/// ```
/// use questbot_types::formatting::format_duration_compact;
/// assert_eq!(format_duration_compact(9_000), "2h30m");
/// assert_eq!(format_duration_compact(90_061), "1d1h1m1s");
/// assert_eq!(format_duration_compact(45), "45s");
/// assert_eq!(format_duration_compact(0), "0s");
/// ```
pub fn format_duration_compact(secs: u64) -> String {
    if secs == 0 {
        return "0s".to_string();
    }

    const UNITS: [(u64, char); 4] = [(86_400, 'd'), (3_600, 'h'), (60, 'm'), (1, 's')];

    let mut remaining = secs;
    let mut result = String::new();
    for (size, suffix) in UNITS {
        let count = remaining / size;
        if count > 0 {
            result.push_str(&count.to_string());
            result.push(suffix);
            remaining %= size;
        }
    }
    result
}

/// Format elapsed task time as `M:SS`, or `H:MM:SS` past the hour.
///
/// # Examples
/// ```
/// use questbot_types::formatting::format_elapsed;
/// assert_eq!(format_elapsed(0), "0:00");
/// assert_eq!(format_elapsed(125), "2:05");
/// assert_eq!(format_elapsed(3_725), "1:02:05");
/// ```
pub fn format_elapsed(secs: u64) -> String {
    let hours = secs / 3_600;
    let mins = (secs % 3_600) / 60;
    let secs = secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}
