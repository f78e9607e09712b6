//! Bounded, non-blocking hand-off between worker tasks.

use crate::metrics::{Metrics, QueueKind};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

/// Producer side of a bounded queue. `offer` never waits: a full or closed
/// queue drops the item and counts the drop.
pub(crate) struct QueueSender<T> {
    kind: QueueKind,
    tx: mpsc::Sender<T>,
    metrics: Arc<Metrics>,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            tx: self.tx.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<T> QueueSender<T> {
    pub fn offer(&self, item: T) -> bool {
        match self.tx.try_send(item) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.metrics.record_queue_drop(self.kind);
                debug!(queue = %self.kind, "[poc] queue full, item dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.metrics.record_queue_drop(self.kind);
                debug!(queue = %self.kind, "[poc] queue closed, item dropped");
                false
            }
        }
    }
}

pub(crate) fn bounded<T>(
    kind: QueueKind,
    capacity: usize,
    metrics: &Arc<Metrics>,
) -> (QueueSender<T>, mpsc::Receiver<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        QueueSender {
            kind,
            tx,
            metrics: Arc::clone(metrics),
        },
        rx,
    )
}
