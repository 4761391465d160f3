use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::io::persist::Persistence;
use crate::model::config::{BoardConfig, GridConfig};
use crate::model::item::{Item, Membership};
use crate::model::write::Write;
use crate::ops::drag::ListDrag;
use crate::ops::move_ops::{self, DropTarget};
use crate::ops::schedule::{self, GridDrag};
use crate::state::deletion::{DeferredDeletion, DeletionEvent, PendingNotice};
use crate::state::pipeline::{Pipeline, Settlement, Ticket};
use crate::state::store::ItemStore;

/// Something the owner of a session should react to
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Settled(Settlement),
    Deletion(DeletionEvent),
}

/// One board's worth of interactive state.
///
/// Gestures are planned against the current store, applied optimistically
/// and persisted in the background. The owner drives reconciliation with
/// `poll` (from a render loop) or `next_event` (from async code).
pub struct Session {
    pipeline: Pipeline,
    deletion: DeferredDeletion,
    grid: GridConfig,
}

impl Session {
    pub fn new(items: Vec<Item>, persistence: Arc<dyn Persistence>, config: &BoardConfig) -> Self {
        Session::with_settings(
            items,
            persistence,
            config.grid.clone(),
            Duration::from_secs(config.deletion.grace_seconds),
        )
    }

    pub fn with_settings(
        items: Vec<Item>,
        persistence: Arc<dyn Persistence>,
        grid: GridConfig,
        grace: Duration,
    ) -> Self {
        Session {
            pipeline: Pipeline::new(items, persistence),
            deletion: DeferredDeletion::new(grace),
            grid,
        }
    }

    pub fn grid(&self) -> &GridConfig {
        &self.grid
    }

    pub fn store(&self) -> &ItemStore {
        self.pipeline.store()
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.pipeline.store().get(id)
    }

    pub fn container(&self, membership: Membership, key: &str) -> Vec<Item> {
        self.pipeline.store().container(membership, key)
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Item>>> {
        self.pipeline.subscribe()
    }

    pub fn pending_deletions(&self) -> watch::Receiver<Option<PendingNotice>> {
        self.deletion.subscribe()
    }

    pub fn pending_deletion(&self) -> Option<&Item> {
        self.deletion.pending()
    }

    pub fn in_flight(&self) -> usize {
        self.pipeline.in_flight()
    }

    // -----------------------------------------------------------------------
    // List gestures
    // -----------------------------------------------------------------------

    /// Drop `id` on `target` within the `membership` grouping
    pub fn move_item(&mut self, membership: Membership, id: &str, target: &DropTarget) -> Option<Ticket> {
        let items = self.pipeline.store().to_vec();
        let plan = move_ops::plan_move(&items, membership, id, target);
        if plan.is_empty() {
            tracing::debug!(%id, container = %target.container, "drop changed nothing");
            return None;
        }
        tracing::debug!(%id, kind = ?plan.kind, "drop planned");
        self.pipeline.apply(plan.into_writes())
    }

    /// Finish a list drag started with [`ListDrag::begin`]
    pub fn release(&mut self, drag: ListDrag, membership: Membership) -> Option<Ticket> {
        let items = self.pipeline.store().to_vec();
        let plan = drag.release(&items, membership);
        self.pipeline.apply(plan.into_writes())
    }

    // -----------------------------------------------------------------------
    // Grid gestures
    // -----------------------------------------------------------------------

    /// Start moving a scheduled item. `None` if the item has no block.
    pub fn begin_grid_move(&self, id: &str, pointer_y: f64) -> Option<GridDrag> {
        let block = self.item(id)?.block.clone()?;
        Some(GridDrag::begin_move(id, block, pointer_y))
    }

    /// Start resizing a scheduled item. `None` if the item has no block.
    pub fn begin_grid_resize(&self, id: &str, pointer_y: f64) -> Option<GridDrag> {
        let block = self.item(id)?.block.clone()?;
        Some(GridDrag::begin_resize(id, block, pointer_y))
    }

    pub fn commit_grid(&mut self, drag: GridDrag) -> Option<Ticket> {
        let id = drag.item_id().to_string();
        let Some(write) = drag.finish(&self.grid) else {
            tracing::debug!(%id, "grid gesture changed nothing");
            return None;
        };
        self.pipeline.apply(vec![write])
    }

    /// Drop an item onto `day` at pointer offset `pointer_y`
    pub fn place(&mut self, id: &str, day: &str, pointer_y: f64) -> Option<Ticket> {
        let minute = self.grid.pointer_y_to_minutes(pointer_y);
        self.place_at(id, day, minute)
    }

    /// Schedule an item on `day` starting near `minute`
    pub fn place_at(&mut self, id: &str, day: &str, minute: i32) -> Option<Ticket> {
        let item = self.item(id)?;
        let block = self.grid.place_at(day, minute, item.estimate_minutes);
        if item.block.as_ref() == Some(&block) {
            return None;
        }
        if !self.grid.is_valid(&block) {
            tracing::warn!(%id, start = block.start, end = block.end, "placement does not fit the grid");
            return None;
        }
        self.pipeline.apply(vec![Write::Schedule {
            id: id.to_string(),
            block: Some(block),
        }])
    }

    /// Move a scheduled item back to the unscheduled pool
    pub fn unschedule(&mut self, id: &str) -> Option<Ticket> {
        if self.item(id)?.block.is_none() {
            return None;
        }
        self.pipeline.apply(vec![schedule::unschedule(id)])
    }

    // -----------------------------------------------------------------------
    // Deletion
    // -----------------------------------------------------------------------

    pub fn delete(&mut self, id: &str) -> bool {
        self.deletion.request_delete(&mut self.pipeline, id)
    }

    /// Restore the pending deletion. Containers show the item back at its
    /// previous position; see [`DeferredDeletion::undo`].
    pub fn undo_delete(&mut self) -> Option<String> {
        self.deletion.undo(&mut self.pipeline)
    }

    // -----------------------------------------------------------------------
    // Reconciliation
    // -----------------------------------------------------------------------

    /// Handle everything that has already completed, without waiting
    pub fn poll(&mut self) -> Vec<SessionEvent> {
        let mut events: Vec<SessionEvent> = self
            .pipeline
            .poll()
            .into_iter()
            .map(SessionEvent::Settled)
            .collect();
        events.extend(
            self.deletion
                .poll(&self.pipeline)
                .into_iter()
                .map(SessionEvent::Deletion),
        );
        events
    }

    /// Wait for the next settlement or removal. `None` when nothing is
    /// outstanding.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            let pipeline_busy = self.pipeline.in_flight() > 0;
            let deletion_busy = self.deletion.is_active();
            tokio::select! {
                Some(completion) = self.pipeline.recv_completion(), if pipeline_busy => {
                    return Some(SessionEvent::Settled(self.pipeline.reconcile(completion)));
                }
                Some(signal) = self.deletion.recv_signal(), if deletion_busy => {
                    if let Some(event) = self.deletion.handle(&self.pipeline, signal) {
                        return Some(SessionEvent::Deletion(event));
                    }
                }
                else => return None,
            }
        }
    }

    /// Commit any pending deletion and wait for all outstanding work
    pub async fn shutdown(mut self) -> Vec<SessionEvent> {
        self.deletion.flush(&self.pipeline);
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }
}
