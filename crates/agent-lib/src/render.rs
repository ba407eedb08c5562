//! Human readable rendering of values in verdict texts

use chrono::DateTime;

const TIMESPAN_UNITS: [(&str, u64); 5] = [
    ("year", 31_536_000),
    ("day", 86_400),
    ("hour", 3_600),
    ("minute", 60),
    ("second", 1),
];

const BYTE_UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];

fn plural(value: u64, unit: &str) -> String {
    if value == 1 {
        format!("{value} {unit}")
    } else {
        format!("{value} {unit}s")
    }
}

/// Render a duration with its two most significant units
///
/// `300.0` renders as `5 minutes 0 seconds`, `45.0` as `45 seconds`.
pub fn timespan(seconds: f64) -> String {
    if seconds < 0.0 {
        return format!("-{}", timespan(-seconds));
    }
    if seconds < 1.0 {
        let millis = (seconds * 1000.0).round() as u64;
        return if millis == 0 {
            plural(0, "second")
        } else {
            plural(millis, "millisecond")
        };
    }

    let total = seconds.round() as u64;
    let index = TIMESPAN_UNITS
        .iter()
        .position(|(_, factor)| total >= *factor)
        .unwrap_or(TIMESPAN_UNITS.len() - 1);

    let (unit, factor) = TIMESPAN_UNITS[index];
    let first = total / factor;
    match TIMESPAN_UNITS.get(index + 1) {
        Some((next_unit, next_factor)) => {
            let second = (total % factor) / next_factor;
            format!("{} {}", plural(first, unit), plural(second, next_unit))
        }
        None => plural(first, unit),
    }
}

/// Render a byte count with binary prefixes, e.g. `1.50 GiB`
pub fn bytes(value: f64) -> String {
    if value.abs() < 1024.0 {
        return format!("{value:.0} B");
    }
    let mut scaled = value / 1024.0;
    let mut unit = BYTE_UNITS[0];
    for next in &BYTE_UNITS[1..] {
        if scaled.abs() < 1024.0 {
            break;
        }
        scaled /= 1024.0;
        unit = next;
    }
    format!("{scaled:.2} {unit}")
}

pub fn percent(value: f64) -> String {
    format!("{value:.2}%")
}

/// CPU cores with three decimals
pub fn cpu(value: f64) -> String {
    format!("{value:.3}")
}

/// UTC date and time of a Unix timestamp, e.g. `2024-03-01 12:00:00`
pub fn datetime(timestamp: f64) -> String {
    let secs = timestamp.floor();
    let nanos = ((timestamp - secs) * 1e9) as u32;
    match DateTime::from_timestamp(secs as i64, nanos) {
        Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("{timestamp}"),
    }
}
