use serde::Serialize;

use crate::domain::TimeInterval;

pub const TIMELINE_FORMAT: &str = "%Y-%m-%dT%H:%M";
pub const TIMELINE_LABEL: &str = "Valid WMS Time";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEvent {
    pub id: String,
    pub start: String,
    pub end: String,
    pub label: &'static str,
    pub data_set: String,
    pub body: String,
}

pub fn timeline_events(
    intervals: &[TimeInterval],
    data_set: &str,
    body: &str,
) -> Vec<TimelineEvent> {
    intervals
        .iter()
        .map(|interval| {
            let start = interval.start.format(TIMELINE_FORMAT).to_string();
            let mut end = interval.end.format(TIMELINE_FORMAT).to_string();
            if start == end {
                end.clear();
            }
            TimelineEvent {
                id: format!("wms{start}{end}"),
                start,
                end,
                label: TIMELINE_LABEL,
                data_set: data_set.to_string(),
                body: body.to_string(),
            }
        })
        .collect()
}
