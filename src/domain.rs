use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

pub const SECONDS_PER_MINUTE: i64 = 60;
pub const SECONDS_PER_HOUR: i64 = 3_600;
pub const SECONDS_PER_DAY: i64 = 86_400;
pub const SECONDS_PER_MONTH: i64 = 2_629_744;
pub const SECONDS_PER_YEAR: i64 = 31_556_926;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFormat {
    Day,
    Month,
    Year,
    Minute,
}

impl TimeFormat {
    pub fn pattern(self) -> &'static str {
        match self {
            TimeFormat::Day => "%Y-%m-%d",
            TimeFormat::Month => "%Y-%m",
            TimeFormat::Year => "%Y",
            TimeFormat::Minute => "%Y-%m-%dT%H:%MZ",
        }
    }

    pub fn for_duration(seconds: i64) -> Self {
        if seconds % SECONDS_PER_DAY == 0 {
            TimeFormat::Day
        } else if seconds % SECONDS_PER_MONTH == 0 {
            TimeFormat::Month
        } else if seconds % SECONDS_PER_YEAR == 0 {
            TimeFormat::Year
        } else {
            TimeFormat::Minute
        }
    }

    pub fn render(self, time: DateTime<Utc>) -> String {
        time.format(self.pattern()).to_string()
    }
}

impl fmt::Display for TimeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeFormat::Day => write!(f, "day"),
            TimeFormat::Month => write!(f, "month"),
            TimeFormat::Year => write!(f, "year"),
            TimeFormat::Minute => write!(f, "minute"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration: i64,
    pub format: TimeFormat,
}

impl TimeInterval {
    pub fn instant(at: DateTime<Utc>) -> Self {
        Self {
            start: at,
            end: at,
            duration: 0,
            format: TimeFormat::Minute,
        }
    }

    pub fn limit(&self) -> Option<DateTime<Utc>> {
        TimeDelta::try_seconds(self.duration).and_then(|span| self.end.checked_add_signed(span))
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.limit()
            .is_some_and(|limit| self.start <= time && time <= limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BucketId(String);

impl BucketId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn year(&self) -> &str {
        let end = self.0.find(['-', '/']).unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Self {
        Self {
            width,
            height,
            rgba,
        }
    }

    pub fn transparent() -> Self {
        Self::new(1, 1, vec![0, 0, 0, 0])
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}
