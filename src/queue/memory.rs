use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::TaskQueue;
use crate::core::QueueMessage;
use crate::errors::SummaryError;

#[derive(Debug, Default)]
struct QueueState {
    visible: VecDeque<String>,
    in_flight: HashMap<String, String>,
}

/// Process-local queue. Dequeued messages stay in flight until deleted;
/// [`redeliver_in_flight`](Self::redeliver_in_flight) puts them back, the way
/// an expired visibility timeout would.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    state: Mutex<QueueState>,
    next_handle: AtomicU64,
}

impl InMemoryQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn visible_len(&self) -> usize {
        self.state.lock().visible.len()
    }

    #[must_use]
    pub fn in_flight_len(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    pub fn redeliver_in_flight(&self) -> usize {
        let mut state = self.state.lock();
        let ids: Vec<String> = state.in_flight.drain().map(|(_, id)| id).collect();
        let n = ids.len();
        state.visible.extend(ids);
        n
    }
}

#[async_trait]
impl TaskQueue for InMemoryQueue {
    async fn enqueue(&self, task_id: &str) -> Result<(), SummaryError> {
        self.state.lock().visible.push_back(task_id.to_string());
        Ok(())
    }

    async fn dequeue(&self, max: usize) -> Result<Vec<QueueMessage>, SummaryError> {
        let mut state = self.state.lock();
        let mut out = Vec::new();
        while out.len() < max {
            let Some(task_id) = state.visible.pop_front() else {
                break;
            };
            let handle = format!("rh-{}", self.next_handle.fetch_add(1, Ordering::Relaxed));
            state.in_flight.insert(handle.clone(), task_id.clone());
            out.push(QueueMessage {
                task_id,
                receipt_handle: handle,
            });
        }
        Ok(out)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), SummaryError> {
        self.state
            .lock()
            .in_flight
            .remove(receipt_handle)
            .map(|_| ())
            .ok_or_else(|| {
                SummaryError::StoreFailure(format!("unknown receipt handle: {receipt_handle}"))
            })
    }
}
