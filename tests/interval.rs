use assert_matches::assert_matches;
use chrono::{DateTime, Duration, TimeZone, Utc};

use wms_globe::clock::BucketClock;
use wms_globe::domain::{TimeFormat, TimeInterval};
use wms_globe::error::GlobeError;
use wms_globe::interval::parse_time_spec;

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

#[test]
fn daily_range_scenario() {
    let intervals = parse_time_spec("2020-01-01/2020-01-03/P1D").unwrap();
    assert_eq!(
        intervals,
        vec![TimeInterval {
            start: at(2020, 1, 1, 0, 0),
            end: at(2020, 1, 3, 0, 0),
            duration: 86_400,
            format: TimeFormat::Day,
        }]
    );

    let clock = BucketClock::new(intervals).unwrap();
    let located = clock.locate(at(2020, 1, 2, 12, 0)).unwrap();
    assert_eq!(located.elapsed, Duration::hours(36));
    assert_eq!(clock.bucket_start(at(2020, 1, 2, 12, 0)), Some(at(2020, 1, 2, 0, 0)));
}

#[test]
fn single_instant_scenario() {
    let intervals = parse_time_spec("2020-06-15").unwrap();
    assert_eq!(intervals.len(), 1);
    assert_eq!(intervals[0].duration, 0);
    assert_eq!(intervals[0].format, TimeFormat::Minute);
    assert_eq!(intervals[0].start, intervals[0].end);
}

#[test]
fn malformed_duration_surfaces() {
    let err = parse_time_spec("2020-01-01/2020-01-03/every-day").unwrap_err();
    assert_matches!(err, GlobeError::MalformedDuration(_));
    assert!(err.is_parse());
}

#[test]
fn reformatted_bounds_keep_bucket_boundaries() {
    let specs = [
        "2020-01-01/2020-03-01/P1D",
        "2019-01-01/2021-01-01/P1M",
        "2000-01-01/2010-01-01/P1Y",
        "2020-01-01T00:00/2020-01-03T00:00/PT6H",
        "2020-01-01T00:00/2020-01-01T06:00/PT10M",
    ];
    for spec in specs {
        let clock = BucketClock::new(parse_time_spec(spec).unwrap()).unwrap();
        let interval = clock.intervals()[0].clone();
        let format = interval.format;
        let duration_text = spec.rsplit('/').next().unwrap();
        let rebuilt = format!(
            "{}/{}/{}",
            format.render(interval.start),
            format.render(interval.end),
            duration_text
        );
        let reparsed = BucketClock::new(parse_time_spec(&rebuilt).unwrap()).unwrap();
        assert_eq!(reparsed.intervals()[0].start, interval.start, "{spec}");
        assert_eq!(reparsed.intervals()[0].end, interval.end, "{spec}");

        let probe = Duration::seconds(clock.duration() / 3 + 1);
        let mut time = interval.start;
        while time <= interval.end {
            assert_eq!(reparsed.bucket_start(time), clock.bucket_start(time), "{spec}");
            time += probe;
        }
    }
}

#[test]
fn times_within_a_bucket_share_its_id() {
    let clock = BucketClock::new(parse_time_spec("2020-01-01/2020-01-10/PT6H").unwrap()).unwrap();
    let start = at(2020, 1, 4, 6, 0);
    let id = clock.resolve(start, false).unwrap().id;
    for minutes in [1, 59, 180, 359] {
        let later = start + Duration::minutes(minutes);
        assert_eq!(clock.resolve(later, false).unwrap().id, id);
        assert_eq!(clock.resolve(later, true).unwrap().id, clock.resolve(start, true).unwrap().id);
    }
    assert_ne!(clock.resolve(start + Duration::hours(6), false).unwrap().id, id);
}

#[test]
fn buckets_are_measured_from_interval_start() {
    let clock =
        BucketClock::new(parse_time_spec("2020-01-01T01:30/2020-01-02/PT1H").unwrap()).unwrap();
    assert_eq!(clock.bucket_start(at(2020, 1, 1, 3, 10)), Some(at(2020, 1, 1, 2, 30)));
    assert_eq!(
        clock.resolve(at(2020, 1, 1, 3, 10), false).unwrap().id.as_str(),
        "2020-01-01T02:30Z"
    );
}

#[test]
fn time_span_id_pairs_with_next_bucket() {
    let clock = BucketClock::new(parse_time_spec("2019-01-01/2019-12-01/P1M").unwrap()).unwrap();
    let bucket = clock.resolve(at(2019, 3, 15, 0, 0), true).unwrap();
    assert_eq!(bucket.id.as_str(), "2019-03/2019-04");
}
