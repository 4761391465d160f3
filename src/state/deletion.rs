//! Deferred deletion with a grace period.
//!
//! A delete request hides the item locally and starts a timer. Undo inside
//! the window puts the item back at the head of the collection; expiry
//! sends the removal to persistence. At most one deletion is pending; a
//! second request commits the first immediately.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::io::persist::{self, PersistError};
use crate::model::item::Item;
use crate::state::pipeline::Pipeline;

/// What the UI shows while a deletion can still be undone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNotice {
    pub id: String,
    pub title: String,
    pub deadline: Instant,
}

impl PendingNotice {
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

/// Outcome of a committed removal
#[derive(Debug, Clone)]
pub enum DeletionEvent {
    Committed(String),
    /// The item stays hidden locally; the store still has it
    Failed { id: String, error: PersistError },
}

#[derive(Debug)]
pub(crate) enum Signal {
    Expired(u64),
    Removed {
        id: String,
        result: Result<(), PersistError>,
    },
}

struct PendingDeletion {
    item: Item,
    deadline: Instant,
    timer: JoinHandle<()>,
    generation: u64,
}

pub struct DeferredDeletion {
    grace: Duration,
    pending: Option<PendingDeletion>,
    generation: u64,
    removals: usize,
    signal_tx: mpsc::UnboundedSender<Signal>,
    signal_rx: mpsc::UnboundedReceiver<Signal>,
    notice: watch::Sender<Option<PendingNotice>>,
}

impl DeferredDeletion {
    pub fn new(grace: Duration) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (notice, _) = watch::channel(None);
        DeferredDeletion {
            grace,
            pending: None,
            generation: 0,
            removals: 0,
            signal_tx,
            signal_rx,
            notice,
        }
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// The item waiting out its grace period, if any
    pub fn pending(&self) -> Option<&Item> {
        self.pending.as_ref().map(|p| &p.item)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<PendingNotice>> {
        self.notice.subscribe()
    }

    /// True while a deletion is pending or a removal is in flight
    pub fn is_active(&self) -> bool {
        self.pending.is_some() || self.removals > 0
    }

    /// Hide `id` locally and start its grace period.
    ///
    /// Returns false if the item is unknown. Any earlier pending deletion
    /// is committed first. Must be called from within a tokio runtime.
    pub fn request_delete(&mut self, pipeline: &mut Pipeline, id: &str) -> bool {
        if !pipeline.store().contains(id) {
            tracing::debug!(%id, "delete requested for unknown item");
            return false;
        }
        self.flush(pipeline);
        let Some(item) = pipeline.take_local(id) else {
            return false;
        };

        self.generation += 1;
        let generation = self.generation;
        let deadline = Instant::now() + self.grace;
        let signal_tx = self.signal_tx.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = signal_tx.send(Signal::Expired(generation));
        });

        tracing::debug!(%id, grace_ms = self.grace.as_millis() as u64, "deletion pending");
        self.notice.send_replace(Some(PendingNotice {
            id: item.id.clone(),
            title: item.title.clone(),
            deadline,
        }));
        self.pending = Some(PendingDeletion {
            item,
            deadline,
            timer,
            generation,
        });
        true
    }

    /// Cancel the pending deletion and put the item back. Returns its id,
    /// or `None` if nothing was pending.
    ///
    /// The item goes to the head of the raw collection with its `order`
    /// unchanged, so sorted container views show it where it was before the
    /// delete, not at the top of its container.
    pub fn undo(&mut self, pipeline: &mut Pipeline) -> Option<String> {
        let pending = self.pending.take()?;
        pending.timer.abort();
        self.notice.send_replace(None);
        let id = pending.item.id.clone();
        tracing::debug!(%id, "deletion undone");
        pipeline.restore_front(pending.item);
        Some(id)
    }

    /// Commit the pending deletion now, without waiting for its timer
    pub fn flush(&mut self, pipeline: &Pipeline) -> Option<String> {
        let pending = self.pending.take()?;
        pending.timer.abort();
        let id = pending.item.id;
        self.commit(pipeline, id.clone());
        Some(id)
    }

    /// Handle every signal that has already arrived
    pub fn poll(&mut self, pipeline: &Pipeline) -> Vec<DeletionEvent> {
        let mut events = Vec::new();
        while let Ok(signal) = self.signal_rx.try_recv() {
            events.extend(self.handle(pipeline, signal));
        }
        events
    }

    /// Wait for the next removal to finish. `None` when nothing is pending
    /// or in flight.
    pub async fn next_event(&mut self, pipeline: &Pipeline) -> Option<DeletionEvent> {
        loop {
            let signal = self.recv_signal().await?;
            if let Some(event) = self.handle(pipeline, signal) {
                return Some(event);
            }
        }
    }

    pub(crate) async fn recv_signal(&mut self) -> Option<Signal> {
        if !self.is_active() {
            return None;
        }
        self.signal_rx.recv().await
    }

    pub(crate) fn handle(&mut self, pipeline: &Pipeline, signal: Signal) -> Option<DeletionEvent> {
        match signal {
            Signal::Expired(generation) => {
                let current = self
                    .pending
                    .as_ref()
                    .is_some_and(|p| p.generation == generation);
                if current {
                    self.flush(pipeline);
                }
                None
            }
            Signal::Removed { id, result } => {
                self.removals = self.removals.saturating_sub(1);
                match result {
                    Ok(()) => {
                        tracing::info!(%id, "item deleted");
                        Some(DeletionEvent::Committed(id))
                    }
                    Err(error) => {
                        tracing::warn!(%id, %error, "delete failed");
                        Some(DeletionEvent::Failed { id, error })
                    }
                }
            }
        }
    }

    fn commit(&mut self, pipeline: &Pipeline, id: String) {
        self.notice.send_replace(None);
        self.removals += 1;
        let persistence = pipeline.persistence();
        let signal_tx = self.signal_tx.clone();
        tokio::spawn(async move {
            let target = id.clone();
            let call = async move { persistence.remove(&target).await };
            let result = persist::run_isolated(call).await;
            let _ = signal_tx.send(Signal::Removed { id, result });
        });
    }
}
