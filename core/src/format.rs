use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::model::EpochSeconds;

pub const MISSING: &str = "---";

pub fn format_duration(seconds: i64) -> String {
    let total = seconds.max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let secs = total % 60;
    let clock = format!("{hours}:{minutes:02}:{secs:02}");
    match days {
        0 => clock,
        1 => format!("1 day, {clock}"),
        _ => format!("{days} days, {clock}"),
    }
}

pub fn format_epoch(epoch: EpochSeconds) -> String {
    format_epoch_in(epoch, &Local)
}

pub fn format_epoch_in<Tz>(epoch: EpochSeconds, zone: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    DateTime::<Utc>::from_timestamp(epoch, 0)
        .map(|utc| {
            utc.with_timezone(zone)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| MISSING.to_string())
}

pub fn nicer_label(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

pub fn format_number(value: f64) -> String {
    format!("{value:.2}")
}

pub fn or_missing<T: Display>(value: Option<T>) -> String {
    value
        .map(|value| value.to_string())
        .unwrap_or_else(|| MISSING.to_string())
}

pub fn number_or_missing(value: Option<f64>) -> String {
    value.map(format_number).unwrap_or_else(|| MISSING.to_string())
}

pub fn format_pair(current: Option<f64>, target: Option<f64>) -> String {
    let side = |value: Option<f64>| {
        value
            .map(|value| format!("{value:.1}"))
            .unwrap_or_else(|| MISSING.to_string())
    };
    format!("{}/{}", side(current), side(target))
}

pub fn format_size(bytes: i64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes.max(0) as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
