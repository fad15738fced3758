use chrono::{DateTime, Duration, DurationRound, TimeDelta, Utc};

use crate::domain::{BucketId, TimeFormat, TimeInterval};
use crate::error::GlobeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    pub index: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub start: DateTime<Utc>,
    pub id: BucketId,
}

#[derive(Debug, Clone)]
pub struct BucketClock {
    intervals: Vec<TimeInterval>,
    duration: i64,
    format: TimeFormat,
    span: (DateTime<Utc>, DateTime<Utc>),
}

impl BucketClock {
    pub fn new(intervals: Vec<TimeInterval>) -> Result<Self, GlobeError> {
        let first = intervals.first().ok_or(GlobeError::EmptyTimeSpec)?;
        let duration = first.duration;
        let format = first.format;
        let earliest = intervals.iter().map(|interval| interval.start).min();
        let latest = intervals
            .iter()
            .map(|interval| interval.limit().unwrap_or(interval.end))
            .max();
        let span = earliest.zip(latest).unwrap_or((first.start, first.end));
        Ok(Self {
            intervals,
            duration,
            format,
            span,
        })
    }

    pub fn intervals(&self) -> &[TimeInterval] {
        &self.intervals
    }

    pub fn duration(&self) -> i64 {
        self.duration
    }

    pub fn format(&self) -> TimeFormat {
        self.format
    }

    pub fn span(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        self.span
    }

    pub fn locate(&self, time: DateTime<Utc>) -> Option<Located> {
        locate(time, &self.intervals)
    }

    pub fn bucket_start(&self, time: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let time = truncate_subsec(time);
        let located = self.locate(time)?;
        Some(snap(time, located.elapsed, self.duration))
    }

    pub fn next_bucket_start(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let after = TimeDelta::try_seconds(self.duration)
            .and_then(|step| start.checked_add_signed(step))?;
        Some(self.bucket_start(after).unwrap_or(after))
    }

    pub fn bucket_id(&self, start: DateTime<Utc>, time_span: bool) -> BucketId {
        let mut text = self.format.render(start);
        if time_span
            && self.duration > 0
            && let Some(next) = self.next_bucket_start(start)
        {
            text.push('/');
            text.push_str(&self.format.render(next));
        }
        BucketId::new(text)
    }

    pub fn resolve(&self, time: DateTime<Utc>, time_span: bool) -> Option<Bucket> {
        let start = self.bucket_start(time)?;
        Some(Bucket {
            start,
            id: self.bucket_id(start, time_span),
        })
    }
}

pub fn locate(time: DateTime<Utc>, intervals: &[TimeInterval]) -> Option<Located> {
    intervals
        .iter()
        .position(|interval| interval.contains(time))
        .map(|index| Located {
            index,
            elapsed: time - intervals[index].start,
        })
}

pub fn snap(time: DateTime<Utc>, elapsed: Duration, duration: i64) -> DateTime<Utc> {
    if duration <= 0 {
        return time;
    }
    TimeDelta::try_seconds(elapsed.num_seconds().rem_euclid(duration))
        .and_then(|offset| time.checked_sub_signed(offset))
        .unwrap_or(time)
}

pub fn truncate_subsec(time: DateTime<Utc>) -> DateTime<Utc> {
    time.duration_trunc(Duration::seconds(1)).unwrap_or(time)
}
