use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use regex::Regex;

use crate::domain::{
    SECONDS_PER_DAY, SECONDS_PER_HOUR, SECONDS_PER_MINUTE, SECONDS_PER_MONTH, SECONDS_PER_YEAR,
    TimeFormat, TimeInterval,
};
use crate::error::GlobeError;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^P(?:(\d+)Y)?(?:(\d+)M)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
    )
    .expect("duration pattern is valid")
});

const DURATION_FACTORS: [i64; 6] = [
    SECONDS_PER_YEAR,
    SECONDS_PER_MONTH,
    SECONDS_PER_DAY,
    SECONDS_PER_HOUR,
    SECONDS_PER_MINUTE,
    1,
];

pub const CURRENT_TOKEN: &str = "current";

pub fn parse_time_spec(spec: &str) -> Result<Vec<TimeInterval>, GlobeError> {
    parse_time_spec_at(spec, Utc::now())
}

pub fn parse_time_spec_at(
    spec: &str,
    now: DateTime<Utc>,
) -> Result<Vec<TimeInterval>, GlobeError> {
    let mut intervals = Vec::new();
    for range in spec.split(',') {
        let mut parts = range.trim().splitn(3, '/');
        let start = parse_date_at(parts.next().unwrap_or_default(), now)?;
        let end = parts.next().map(str::trim).filter(|end| !end.is_empty());
        let interval = match end {
            None => TimeInterval::instant(start),
            Some(end) => {
                let text = parts.next().unwrap_or_default();
                let duration = parse_duration(text)?;
                let interval = TimeInterval {
                    start,
                    end: parse_date_at(end, now)?,
                    duration,
                    format: TimeFormat::for_duration(duration),
                };
                if interval.limit().is_none() {
                    return Err(GlobeError::MalformedDuration(text.to_string()));
                }
                interval
            }
        };
        intervals.push(interval);
    }
    Ok(intervals)
}

pub fn parse_duration(text: &str) -> Result<i64, GlobeError> {
    let trimmed = text.trim();
    let malformed = || GlobeError::MalformedDuration(text.to_string());
    let captures = DURATION_RE.captures(trimmed).ok_or_else(malformed)?;

    let mut matched = 0usize;
    let mut total = 0i64;
    for (index, factor) in DURATION_FACTORS.iter().enumerate() {
        let Some(group) = captures.get(index + 1) else {
            continue;
        };
        matched += 1;
        // Fractional seconds are truncated.
        let value = group
            .as_str()
            .split('.')
            .next()
            .unwrap_or_default()
            .parse::<i64>()
            .map_err(|_| malformed())?;
        total = value
            .checked_mul(*factor)
            .and_then(|part| total.checked_add(part))
            .ok_or_else(malformed)?;
    }

    if matched == 0 || TimeDelta::try_seconds(total).is_none() {
        return Err(malformed());
    }
    Ok(total)
}

pub fn parse_date(text: &str) -> Result<DateTime<Utc>, GlobeError> {
    parse_date_at(text, Utc::now())
}

pub fn parse_date_at(text: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, GlobeError> {
    let trimmed = text.trim();
    if trimmed == CURRENT_TOKEN {
        return Ok(now);
    }
    let malformed = || GlobeError::MalformedDate(text.to_string());

    let mut cleaned = trimmed
        .chars()
        .filter(|ch| !ch.is_ascii_punctuation())
        .collect::<String>();
    if cleaned.ends_with(['Z', 'z']) {
        cleaned.pop();
    }
    if cleaned.is_empty() || !cleaned.is_ascii() {
        return Err(malformed());
    }

    let (date_part, time_part) = match cleaned.find('T') {
        Some(pos) => (&cleaned[..pos], &cleaned[pos + 1..]),
        None => (cleaned.as_str(), ""),
    };
    let date = pad_digits(date_part, 8).ok_or_else(malformed)?;
    let time = pad_digits(time_part, 6).ok_or_else(malformed)?;

    let field = |digits: &str, from: usize, to: usize| digits[from..to].parse::<u32>().ok();
    let year = field(&date, 0, 4).ok_or_else(malformed)?;
    let month = field(&date, 4, 6).ok_or_else(malformed)?.max(1);
    let day = field(&date, 6, 8).ok_or_else(malformed)?.max(1);
    let hour = field(&time, 0, 2).ok_or_else(malformed)?;
    let minute = field(&time, 2, 4).ok_or_else(malformed)?;
    let second = field(&time, 4, 6).ok_or_else(malformed)?;

    NaiveDate::from_ymd_opt(year as i32, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .map(|naive| naive.and_utc())
        .ok_or_else(malformed)
}

fn pad_digits(part: &str, width: usize) -> Option<String> {
    if !part.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    let mut padded = part.chars().take(width).collect::<String>();
    while padded.len() < width {
        padded.push('0');
    }
    Some(padded)
}
