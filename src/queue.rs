// Ingestion queue: probes push samples, the single log writer drains them in batches.
// Unbounded: a stalled writer grows memory, it never blocks a probe.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::Notify;

use crate::models::Sample;

#[derive(Debug, Default)]
pub struct IngestQueue {
    items: Mutex<Vec<Sample>>,
    notify: Notify,
    enqueued_total: AtomicU64,
}

impl IngestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never blocks on the consumer and never fails.
    pub fn enqueue(&self, sample: Sample) {
        self.enqueue_all(std::iter::once(sample));
    }

    pub fn enqueue_all(&self, samples: impl IntoIterator<Item = Sample>) {
        let added = {
            let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
            let before = items.len();
            items.extend(samples);
            items.len() - before
        };
        if added > 0 {
            self.enqueued_total
                .fetch_add(added as u64, Ordering::Relaxed);
            self.notify.notify_one();
        }
    }

    /// Removes and returns everything queued right now, in enqueue order.
    pub fn drain_all(&self) -> Vec<Sample> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *items)
    }

    /// Waits until at least one sample is queued, then drains the queue.
    pub async fn wait_and_drain(&self) -> Vec<Sample> {
        loop {
            let batch = self.drain_all();
            if !batch.is_empty() {
                return batch;
            }
            // notify_one stores a permit when nobody waits, so an enqueue racing with
            // the drain above still wakes us.
            self.notify.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn enqueued_total(&self) -> u64 {
        self.enqueued_total.load(Ordering::Relaxed)
    }
}
