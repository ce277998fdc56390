//! Progress event delivery.
//!
//! Transfers report progress through [`ProgressEvents`], a cheap handle that
//! posts into an unbounded channel. A forwarder on the blocking thread pool
//! drains the channel into the configured [`ProgressSink`], so a slow sink
//! buffers events instead of slowing down transfer I/O. Without a sink,
//! events are dropped at the source.

use crate::transfer::TransferState;

use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::debug;

/// Receives progress notifications. Every method defaults to a no-op.
///
/// `task` is the destination path of the transfer.
pub trait ProgressSink: Send + Sync {
    /// A transfer began streaming, resuming from `resumed_from` bytes.
    fn on_transfer_start(&self, _task: &str, _resumed_from: u64, _total: Option<u64>) {}

    /// `bytes` more bytes were written for `task`.
    fn on_byte_progress(&self, _task: &str, _bytes: u64, _total: Option<u64>) {}

    /// `task` entered `state`.
    fn on_task_status(&self, _task: &str, _state: &TransferState) {}

    /// `completed` out of `total` transfers reached a terminal state.
    fn on_batch_progress(&self, _completed: usize, _total: usize) {}
}

/// A progress notification.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    TransferStart {
        task: String,
        resumed_from: u64,
        total: Option<u64>,
    },
    Bytes {
        task: String,
        bytes: u64,
        total: Option<u64>,
    },
    Status {
        task: String,
        state: TransferState,
    },
    Batch {
        completed: usize,
        total: usize,
    },
}

impl ProgressEvent {
    fn deliver(self, sink: &dyn ProgressSink) {
        match self {
            ProgressEvent::TransferStart {
                task,
                resumed_from,
                total,
            } => sink.on_transfer_start(&task, resumed_from, total),
            ProgressEvent::Bytes { task, bytes, total } => {
                sink.on_byte_progress(&task, bytes, total)
            }
            ProgressEvent::Status { task, state } => sink.on_task_status(&task, &state),
            ProgressEvent::Batch { completed, total } => sink.on_batch_progress(completed, total),
        }
    }
}

/// Fire-and-forget handle used by transfers to emit progress.
#[derive(Debug, Clone, Default)]
pub struct ProgressEvents {
    tx: Option<UnboundedSender<ProgressEvent>>,
}

impl ProgressEvents {
    /// A handle that drops every event.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Start forwarding events to `sink` on a blocking thread.
    ///
    /// The forwarder stops once every clone of the returned handle is
    /// dropped; await the returned [`JoinHandle`] to flush pending events.
    pub fn forward_to(sink: Option<Arc<dyn ProgressSink>>) -> (Self, Option<JoinHandle<()>>) {
        let Some(sink) = sink else {
            return (Self::disabled(), None);
        };
        let (tx, rx) = unbounded_channel();
        let forwarder = tokio::task::spawn_blocking(move || forward(rx, sink));
        (Self { tx: Some(tx) }, Some(forwarder))
    }

    /// Whether events reach a sink.
    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    fn emit(&self, event: impl FnOnce() -> ProgressEvent) {
        if let Some(ref tx) = self.tx {
            // The receiver only goes away once the batch is over.
            let _ = tx.send(event());
        }
    }

    pub(crate) fn transfer_start(&self, task: &str, resumed_from: u64, total: Option<u64>) {
        self.emit(|| ProgressEvent::TransferStart {
            task: task.to_string(),
            resumed_from,
            total,
        });
    }

    pub(crate) fn bytes(&self, task: &str, bytes: u64, total: Option<u64>) {
        self.emit(|| ProgressEvent::Bytes {
            task: task.to_string(),
            bytes,
            total,
        });
    }

    pub(crate) fn status(&self, task: &str, state: TransferState) {
        self.emit(|| ProgressEvent::Status {
            task: task.to_string(),
            state,
        });
    }

    pub(crate) fn batch(&self, completed: usize, total: usize) {
        self.emit(|| ProgressEvent::Batch { completed, total });
    }
}

fn forward(mut rx: UnboundedReceiver<ProgressEvent>, sink: Arc<dyn ProgressSink>) {
    let mut delivered = 0usize;
    while let Some(event) = rx.blocking_recv() {
        event.deliver(sink.as_ref());
        delivered += 1;
    }
    debug!("Progress forwarder delivered {} events", delivered);
}
