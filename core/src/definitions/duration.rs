//! Parsing of the human-readable values found in quest files.
//!
//! Durations accept unit groups (`2h30m`, `1h 15m 30s`, `90 minutes`),
//! clock notation (`MM:SS`, `H:MM:SS`) or a bare number of seconds.
//! Start dates are ISO-8601 timestamps; a timestamp carrying an offset is
//! converted to local time.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

/// Parse a duration string into whole seconds.
pub fn parse_duration(input: &str) -> Option<u64> {
    let s = input.trim().to_ascii_lowercase();
    if s.is_empty() {
        return None;
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Some(secs);
    }
    if s.contains(':') {
        return parse_clock(&s);
    }

    let mut chars = s.chars().peekable();
    let mut total: u64 = 0;
    let mut seen_group = false;

    loop {
        while chars.next_if(|c| c.is_whitespace() || *c == ',').is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut number = String::new();
        while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
            number.push(c);
        }
        if number.is_empty() {
            return None;
        }

        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let mut unit = String::new();
        while let Some(c) = chars.next_if(|c| c.is_ascii_alphabetic()) {
            unit.push(c);
        }

        let value = number.parse::<u64>().ok()?;
        total = total.checked_add(value.checked_mul(unit_seconds(&unit)?)?)?;
        seen_group = true;
    }

    seen_group.then_some(total)
}

fn unit_seconds(unit: &str) -> Option<u64> {
    match unit {
        "w" | "wk" | "wks" | "week" | "weeks" => Some(604_800),
        "d" | "day" | "days" => Some(86_400),
        "h" | "hr" | "hrs" | "hour" | "hours" => Some(3_600),
        "m" | "min" | "mins" | "minute" | "minutes" => Some(60),
        "s" | "sec" | "secs" | "second" | "seconds" => Some(1),
        _ => None,
    }
}

/// `MM:SS` or `H:MM:SS`.
fn parse_clock(s: &str) -> Option<u64> {
    let parts: Vec<u64> = s
        .split(':')
        .map(|p| p.trim().parse::<u64>().ok())
        .collect::<Option<_>>()?;

    match parts.as_slice() {
        [mins, secs] if *secs < 60 => mins.checked_mul(60)?.checked_add(*secs),
        [hours, mins, secs] if *mins < 60 && *secs < 60 => hours
            .checked_mul(3_600)?
            .checked_add(mins * 60 + secs),
        _ => None,
    }
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601 timestamp into local naive time.
pub fn parse_start_date(input: &str) -> Option<NaiveDateTime> {
    let s = input.trim();

    for format in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Some(ts);
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Local).naive_local());
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_duration_unit_groups() {
        assert_eq!(parse_duration("2h30m"), Some(9_000));
        assert_eq!(parse_duration("90m"), Some(5_400));
        assert_eq!(parse_duration("1h 15m 30s"), Some(4_530));
        assert_eq!(parse_duration("1 hour, 5 minutes"), Some(3_900));
        assert_eq!(parse_duration("1w"), Some(604_800));
        assert_eq!(parse_duration(" 2H "), Some(7_200));
    }

    #[test]
    fn test_parse_duration_plain_and_clock() {
        assert_eq!(parse_duration("45"), Some(45));
        assert_eq!(parse_duration("1:30"), Some(90));
        assert_eq!(parse_duration("1:30:00"), Some(5_400));
    }

    #[test]
    fn test_parse_duration_clock_overflow_is_rejected() {
        assert_eq!(parse_duration("5124095576030432:00:00"), None);
        assert_eq!(parse_duration("307445734561825861:00"), None);
        assert_eq!(parse_duration("18446744073709551615w"), None);
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration("2h30"), None);
        assert_eq!(parse_duration("5 parsecs"), None);
        assert_eq!(parse_duration("1:75"), None);
        assert_eq!(parse_duration("h"), None);
    }

    #[test]
    fn test_parse_start_date_variants() {
        let ts = parse_start_date("2026-10-16T18:30:00").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2026, 10, 16));
        assert_eq!((ts.hour(), ts.minute()), (18, 30));

        assert_eq!(parse_start_date("2026-10-16 18:30"), Some(ts));
        assert_eq!(parse_start_date("2026-10-16T18:30"), Some(ts));

        let midnight = parse_start_date("2026-10-16").unwrap();
        assert_eq!(midnight.hour(), 0);

        assert!(parse_start_date("2026-10-16T18:30:00+03:00").is_some());
        assert!(parse_start_date("tomorrow").is_none());
        assert!(parse_start_date("2026-13-01").is_none());
    }
}
