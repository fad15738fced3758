use std::io::{self, Write};

use serde::Serialize;

use crate::cache::CacheStats;
use crate::domain::TimeInterval;
use crate::selector::{FrameState, TextureSlot};
use crate::timeline::TimelineEvent;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntervalsResult {
    pub spec: String,
    pub intervals: Vec<TimeInterval>,
    pub timeline: Vec<TimelineEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataSetEntry {
    pub body: String,
    pub name: String,
    pub copyright: String,
    pub layers: String,
    pub time: Option<String>,
    pub prefetch: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataSetsResult {
    pub data_sets: Vec<DataSetEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameRecord {
    pub time: String,
    pub frame: FrameState,
    pub uploads: Vec<TextureSlot>,
    pub cache: CacheStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayResult {
    pub body: String,
    pub data_set: String,
    pub request: String,
    pub frames: Vec<FrameRecord>,
    pub cache: CacheStats,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_intervals(result: &IntervalsResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_data_sets(result: &DataSetsResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_play(result: &PlayResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
