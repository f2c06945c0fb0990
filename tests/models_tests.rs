// Line format tests: type tags, round trips, NaN <-> null

mod common;

use common::{cpu, gpu, ping, ups};
use hwlog::aggregation::aggregate;
use hwlog::models::*;

#[test]
fn test_sample_type_tags() {
    let cases = [
        (cpu(1.0, 10.0), "CpuData"),
        (gpu(1.0, "GPU-a", 10.0), "GpuData"),
        (ping(1.0, "1.1.1.1", 3.2), "NetworkData"),
        (ups(1.0, "S1", "ONLINE", 230.0), "UpsData"),
    ];
    for (sample, tag) in cases {
        let value: serde_json::Value = serde_json::from_str(&sample.to_line().unwrap()).unwrap();
        assert_eq!(value["type"], tag);
        assert_eq!(sample.kind().sample_tag(), tag);
    }
}

#[test]
fn test_samples_roundtrip_through_line_format() {
    for sample in [
        cpu(1_714_564_800.25, 12.5),
        gpu(1_714_564_800.5, "GPU-a", 37.0),
        ping(1_714_564_801.0, "www.google.com", 14.7),
        ups(1_714_564_802.0, "3B1234X56789", "ONLINE", 231.0),
    ] {
        let line = sample.to_line().unwrap();
        assert!(!line.contains('\n'));
        assert_eq!(Sample::from_line(&line).unwrap(), sample);
    }
}

#[test]
fn test_aggregates_roundtrip_through_line_format() {
    let groups = [
        vec![cpu(10.0, 5.0), cpu(20.0, 50.0)],
        vec![gpu(10.0, "GPU-a", 5.0), gpu(20.0, "GPU-a", 50.0)],
        vec![ping(10.0, "gw", 1.0), ping(20.0, "gw", 2.0)],
        vec![ups(10.0, "S1", "ONLINE", 230.0), ups(20.0, "S1", "ONBATT", 0.0)],
    ];
    for group in groups {
        let record = aggregate(&group).unwrap();
        let line = record.to_line().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], record.kind().aggregate_tag());
        assert_eq!(AggregateRecord::from_line(&line).unwrap(), record);
    }
}

#[test]
fn test_missed_ping_is_written_as_null_and_read_back_as_nan() {
    let line = ping(1.0, "gw", f64::NAN).to_line().unwrap();
    assert!(line.contains("\"ping_ms\":null"));
    match Sample::from_line(&line).unwrap() {
        Sample::Network(n) => {
            assert!(n.ping_ms.is_nan());
            assert!(!n.is_hit());
        }
        other => panic!("expected network sample, got {:?}", other),
    }
}

#[test]
fn test_unknown_type_is_rejected() {
    let err = Sample::from_line(r#"{"type":"DiskData","timestamp":1.0}"#).unwrap_err();
    assert!(matches!(err, RecordError::Malformed(_)));
    // An aggregate line is not a sample.
    let agg = aggregate(&[cpu(1.0, 1.0)]).unwrap().to_line().unwrap();
    assert!(Sample::from_line(&agg).is_err());
}

#[test]
fn test_blank_and_truncated_lines() {
    assert!(matches!(Sample::from_line("   "), Err(RecordError::Blank)));
    let line = cpu(1.0, 1.0).to_line().unwrap();
    let truncated = &line[..line.len() / 2];
    assert!(matches!(
        Sample::from_line(truncated),
        Err(RecordError::Malformed(_))
    ));
}

#[test]
fn test_ups_line_without_output_voltage_still_parses() {
    let line = r#"{"type":"UpsData","timestamp":5.0,"serial":"S1","line_voltage":230.0,"status":"ONLINE","load_percent":10.0,"battery_voltage":27.0,"battery_percent":100.0,"output_current":0.4}"#;
    match Sample::from_line(line).unwrap() {
        Sample::Ups(u) => {
            assert!(u.output_voltage.is_nan());
            assert!(u.is_online());
        }
        other => panic!("expected ups sample, got {:?}", other),
    }
}

#[test]
fn test_group_keys() {
    assert_eq!(cpu(1.0, 1.0).group_key(), CPU_GROUP_KEY);
    assert_eq!(gpu(1.0, "GPU-a", 1.0).group_key(), "GPU-a");
    assert_eq!(ping(1.0, "1.1.1.1", 1.0).group_key(), "1.1.1.1");
    assert_eq!(ups(1.0, "S1", "ONLINE", 230.0).group_key(), "S1");
    assert_eq!(ups(1.0, "", "ONLINE", 230.0).group_key(), UPS_GROUP_KEY);
}
