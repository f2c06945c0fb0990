// Ingestion tests: queue, daily log writer task, probe tasks with a scripted probe

mod common;

use common::{cpu, ping};
use hwlog::daily_log::{DailyLogWriter, read_samples, trim_torn_line};
use hwlog::models::Sample;
use hwlog::probes::{Probe, ScheduledProbe};
use hwlog::queue::IngestQueue;
use hwlog::worker::{PipelineStats, spawn_log_writer, spawn_probe};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn queue_drains_in_enqueue_order() {
    let queue = IngestQueue::new();
    queue.enqueue(cpu(1.0, 1.0));
    queue.enqueue_all(vec![cpu(2.0, 1.0), ping(3.0, "gw", 1.0)]);
    assert_eq!(queue.len(), 3);
    assert_eq!(queue.enqueued_total(), 3);

    let ts: Vec<f64> = queue.drain_all().iter().map(|s| s.timestamp()).collect();
    assert_eq!(ts, vec![1.0, 2.0, 3.0]);
    assert!(queue.is_empty());
    assert!(queue.drain_all().is_empty());
}

#[tokio::test]
async fn queue_wakes_a_waiting_drain() {
    let queue = Arc::new(IngestQueue::new());
    let waiter = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.wait_and_drain().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    queue.enqueue(cpu(1.0, 1.0));
    let batch = tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("drain woke up")
        .unwrap();
    assert_eq!(batch.len(), 1);
}

#[tokio::test]
async fn writer_appends_complete_lines_and_flushes_on_shutdown() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("logs").join("today.jsonl");
    let writer = DailyLogWriter::open(&path).await.unwrap();
    let queue = Arc::new(IngestQueue::new());
    let stats = Arc::new(PipelineStats::new());
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = spawn_log_writer(queue.clone(), writer, stats.clone(), shutdown_rx);

    queue.enqueue_all(vec![cpu(1.0, 1.0), cpu(2.0, 2.0)]);
    tokio::time::sleep(Duration::from_millis(50)).await;
    queue.enqueue(ping(3.0, "gw", f64::NAN));
    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.ends_with('\n'));
    let (samples, report) = read_samples(&path).unwrap();
    assert_eq!(report.skipped, 0);
    assert_eq!(samples.len(), 3);
    assert_eq!(stats.written(), 3);
    assert_eq!(stats.skipped(), 0);
}

#[tokio::test]
async fn writer_appends_to_an_existing_log() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("today.jsonl");
    std::fs::write(&path, common::lines(&[cpu(0.5, 1.0)])).unwrap();

    let mut writer = DailyLogWriter::open(&path).await.unwrap();
    let report = writer.append_batch(&[cpu(1.0, 1.0)]).await.unwrap();
    assert_eq!(report.written, 1);

    let (samples, _) = read_samples(&path).unwrap();
    assert_eq!(samples, vec![cpu(0.5, 1.0), cpu(1.0, 1.0)]);
}

#[tokio::test]
async fn writer_cuts_a_torn_last_line_before_appending() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("today.jsonl");
    let mut text = common::lines(&[cpu(1.0, 1.0)]);
    text.push_str(r#"{"type":"CpuData","timest"#);
    std::fs::write(&path, &text).unwrap();

    let mut writer = DailyLogWriter::open(&path).await.unwrap();
    writer.append_batch(&[cpu(2.0, 1.0)]).await.unwrap();

    let (samples, report) = read_samples(&path).unwrap();
    assert_eq!(report.skipped, 0);
    assert_eq!(samples, vec![cpu(1.0, 1.0), cpu(2.0, 1.0)]);
}

#[tokio::test]
async fn trim_leaves_complete_logs_alone() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("today.jsonl");
    assert_eq!(trim_torn_line(&path).await.unwrap(), 0);

    std::fs::write(&path, "").unwrap();
    assert_eq!(trim_torn_line(&path).await.unwrap(), 0);

    let text = common::lines(&[cpu(1.0, 1.0), cpu(2.0, 1.0)]);
    std::fs::write(&path, &text).unwrap();
    assert_eq!(trim_torn_line(&path).await.unwrap(), 0);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), text);
}

#[tokio::test]
async fn trim_drops_a_file_that_is_one_torn_line() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("today.jsonl");
    // Longer than one scan chunk, no newline anywhere.
    std::fs::write(&path, "x".repeat(10_000)).unwrap();
    assert_eq!(trim_torn_line(&path).await.unwrap(), 10_000);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
}

/// Yields one sample per poll, failing every other poll.
struct FlakyProbe {
    polls: u32,
}

impl Probe for FlakyProbe {
    fn name(&self) -> &str {
        "flaky"
    }

    fn poll(&mut self) -> anyhow::Result<Vec<Sample>> {
        self.polls += 1;
        if self.polls % 2 == 0 {
            anyhow::bail!("sensor busy");
        }
        Ok(vec![cpu(self.polls as f64, 1.0)])
    }
}

#[tokio::test]
async fn probe_task_survives_failures() {
    let queue = Arc::new(IngestQueue::new());
    let stats = Arc::new(PipelineStats::new());
    let handle = spawn_probe(
        ScheduledProbe::new(FlakyProbe { polls: 0 }, Duration::from_millis(10)),
        queue.clone(),
        stats.clone(),
    );

    tokio::time::timeout(Duration::from_secs(5), async {
        while queue.len() < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("probe kept producing");
    handle.abort();

    assert!(stats.probe_failures() >= 2);
    let ts: Vec<f64> = queue.drain_all().iter().map(|s| s.timestamp()).collect();
    assert!(ts.iter().all(|t| (*t as u32) % 2 == 1));
}
