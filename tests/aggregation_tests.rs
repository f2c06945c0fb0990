// Grouping and aggregation tests: peaks, packet loss, partitions, day buckets

mod common;

use chrono::{TimeZone, Utc};
use common::{cpu, gpu, ping, ups};
use hwlog::aggregation::{
    AggregateError, DayBucketing, aggregate, bulk, group_by_day, group_by_key, group_by_type,
};
use hwlog::models::*;

#[test]
fn aggregate_empty_group_is_an_error() {
    let empty: Vec<Sample> = vec![];
    assert_eq!(aggregate(&empty).unwrap_err(), AggregateError::Empty);
}

#[test]
fn aggregate_rejects_mixed_kinds_and_keys() {
    let mixed = vec![cpu(1.0, 1.0), ping(2.0, "gw", 1.0)];
    assert!(matches!(
        aggregate(&mixed).unwrap_err(),
        AggregateError::MixedKinds { .. }
    ));
    let two_gpus = vec![gpu(1.0, "GPU-a", 1.0), gpu(2.0, "GPU-b", 1.0)];
    assert!(matches!(
        aggregate(&two_gpus).unwrap_err(),
        AggregateError::MixedKeys { .. }
    ));
}

#[test]
fn aggregate_cpu_span_and_peaks() {
    let group = vec![cpu(100.0, 20.0), cpu(160.0, 80.0), cpu(130.0, 50.0)];
    let AggregateRecord::Cpu(a) = aggregate(&group).unwrap() else {
        panic!("expected cpu aggregate");
    };
    assert_eq!(a.timestamp, 160.0);
    assert_eq!(a.time_span, 60.0);
    assert_eq!(a.peak_utilization, 80.0);
    assert_eq!(a.average_utilization, 50.0);
    assert_eq!(a.peak_memory_used, 4000.0);
    assert_eq!(a.peak_memory_free, 8000.0);
}

#[test]
fn aggregate_single_sample_has_zero_span() {
    let record = aggregate(&[ping(42.0, "gw", 3.0)]).unwrap();
    assert_eq!(record.time_span(), 0.0);
    assert_eq!(record.timestamp(), 42.0);
}

#[test]
fn aggregate_network_packet_loss() {
    let mut group: Vec<Sample> = (0..8).map(|i| ping(i as f64, "gw", 1.0 + i as f64)).collect();
    group.push(ping(8.0, "gw", f64::NAN));
    group.push(ping(9.0, "gw", f64::NAN));
    let AggregateRecord::Network(a) = aggregate(&group).unwrap() else {
        panic!("expected network aggregate");
    };
    assert_eq!(a.num_pings, 10);
    assert_eq!(a.num_hits, 8);
    assert_eq!(a.percent_packet_loss, 25.0);
    assert_eq!(a.peak_ping, 8.0);
    assert_eq!(a.average_ping, 4.5);
    assert_eq!(a.time_span, 9.0);
}

#[test]
fn aggregate_network_all_missed() {
    let group = vec![ping(1.0, "gw", f64::NAN), ping(2.0, "gw", f64::NAN)];
    let AggregateRecord::Network(a) = aggregate(&group).unwrap() else {
        panic!("expected network aggregate");
    };
    assert_eq!(a.num_hits, 0);
    assert_eq!(a.percent_packet_loss, 100.0);
    assert!(a.peak_ping.is_nan());
    assert!(a.average_ping.is_nan());
}

#[test]
fn aggregate_ups_up_percentage() {
    let group = vec![
        ups(1.0, "S1", "ONLINE", 230.0),
        ups(2.0, "S1", "ONLINE", 235.0),
        ups(3.0, "S1", "ONLINE", 228.0),
        ups(4.0, "S1", "ONBATT", 0.0),
    ];
    let AggregateRecord::Ups(a) = aggregate(&group).unwrap() else {
        panic!("expected ups aggregate");
    };
    assert_eq!(a.serial, "S1");
    assert_eq!(a.up_percentage, 75.0);
    assert_eq!(a.peak_line_voltage, 235.0);
}

#[test]
fn group_by_type_then_key() {
    let samples = vec![cpu(1.0, 1.0), gpu(1.0, "A", 1.0), gpu(1.0, "B", 2.0)];
    let by_type = group_by_type(samples);
    assert_eq!(by_type.len(), 2);
    assert_eq!(by_type[&SampleKind::Cpu].len(), 1);

    let gpus = by_type[&SampleKind::Gpu].clone();
    let by_key = group_by_key(gpus);
    assert_eq!(by_key.keys().collect::<Vec<_>>(), vec!["A", "B"]);
    assert_eq!(by_key["A"].len(), 1);
    assert_eq!(by_key["B"].len(), 1);
}

#[test]
fn group_by_key_preserves_order() {
    let samples = vec![ping(3.0, "gw", 1.0), ping(1.0, "gw", 2.0), ping(2.0, "gw", 3.0)];
    let by_key = group_by_key(samples);
    let ts: Vec<f64> = by_key["gw"].iter().map(|s| s.timestamp()).collect();
    assert_eq!(ts, vec![3.0, 1.0, 2.0]);
}

fn ts(y: i32, m: u32, d: u32, h: u32) -> f64 {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap().timestamp() as f64
}

#[test]
fn group_by_day_strict_keeps_days_apart() {
    let now = Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 5).unwrap();
    let samples = vec![
        cpu(ts(2024, 5, 2, 23), 1.0),
        cpu(ts(2024, 5, 1, 12), 2.0),
        cpu(ts(2024, 5, 3, 0), 3.0),
    ];
    let days = group_by_day(samples, &now, DayBucketing::Strict);
    let distances: Vec<i64> = days.iter().map(|(d, _)| *d).collect();
    assert_eq!(distances, vec![2, 1, 0]);
    assert!(days.iter().all(|(_, items)| items.len() == 1));
}

#[test]
fn group_by_day_carry_forward_folds_yesterday() {
    let now = Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 5).unwrap();
    let samples = vec![
        cpu(ts(2024, 5, 2, 23), 1.0),
        cpu(ts(2024, 5, 1, 12), 2.0),
        cpu(ts(2024, 5, 3, 0), 3.0),
    ];
    let days = group_by_day(samples, &now, DayBucketing::CarryForward);
    let shape: Vec<(i64, usize)> = days.iter().map(|(d, v)| (*d, v.len())).collect();
    assert_eq!(shape, vec![(2, 1), (0, 2)]);
}

#[test]
fn bulk_emits_one_record_per_day_type_and_key() {
    let now = Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 5).unwrap();
    let yesterday = ts(2024, 5, 2, 12);
    let samples = vec![
        cpu(yesterday, 10.0),
        cpu(yesterday + 1.0, 20.0),
        gpu(yesterday, "A", 1.0),
        gpu(yesterday, "B", 1.0),
        ping(yesterday, "gw", 1.0),
        ping(yesterday, "1.1.1.1", f64::NAN),
        ups(yesterday, "S1", "ONLINE", 230.0),
        cpu(ts(2024, 5, 1, 12), 30.0),
    ];
    let records = bulk(samples, &now, DayBucketing::Strict);
    assert_eq!(records.len(), 7);
    // Oldest day first.
    assert_eq!(records[0].kind(), SampleKind::Cpu);
    assert_eq!(records[0].timestamp(), ts(2024, 5, 1, 12));
    let kinds: Vec<SampleKind> = records[1..].iter().map(|r| r.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            SampleKind::Cpu,
            SampleKind::Gpu,
            SampleKind::Gpu,
            SampleKind::Network,
            SampleKind::Network,
            SampleKind::Ups,
        ]
    );
}

#[test]
fn bulk_of_nothing_is_nothing() {
    let now = Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 5).unwrap();
    assert!(bulk(vec![], &now, DayBucketing::Strict).is_empty());
}
