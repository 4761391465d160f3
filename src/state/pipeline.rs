//! Optimistic mutation pipeline.
//!
//! `apply` merges an update set into the local store right away and hands
//! the same set to the persistence collaborator on a spawned task. The
//! task reports back over a channel; the owner reconciles completions with
//! `poll` or `settle_next`. A rejected set restores the snapshot taken just
//! before it was applied.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::io::persist::{self, PersistError, Persistence};
use crate::model::item::Item;
use crate::model::write::Write;
use crate::state::store::{ItemStore, Skipped, Snapshot};

pub type Ticket = u64;

/// One applied update set and what it takes to undo it
#[derive(Debug, Clone)]
pub struct Mutation {
    pub ticket: Ticket,
    pub forward: Vec<Write>,
    pub inverse: Snapshot,
}

/// Persistence accepted the update set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub ticket: Ticket,
    pub writes: usize,
}

/// Persistence rejected the update set and local state was restored
#[derive(Debug, Clone)]
pub struct RolledBack {
    pub ticket: Ticket,
    pub error: PersistError,
    /// Items whose pre-gesture state was put back
    pub restored: Vec<String>,
}

pub type Settlement = Result<Applied, RolledBack>;

/// Result of one spawned persistence call
#[derive(Debug)]
pub(crate) struct Completion {
    ticket: Ticket,
    result: Result<(), PersistError>,
}

pub struct Pipeline {
    store: ItemStore,
    persistence: Arc<dyn Persistence>,
    in_flight: HashMap<Ticket, Mutation>,
    next_ticket: Ticket,
    done_tx: mpsc::UnboundedSender<Completion>,
    done_rx: mpsc::UnboundedReceiver<Completion>,
    committed: watch::Sender<Arc<Vec<Item>>>,
}

impl Pipeline {
    pub fn new(items: Vec<Item>, persistence: Arc<dyn Persistence>) -> Self {
        let store = ItemStore::new(items);
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let (committed, _) = watch::channel(Arc::new(store.to_vec()));
        Pipeline {
            store,
            persistence,
            in_flight: HashMap::new(),
            next_ticket: 1,
            done_tx,
            done_rx,
            committed,
        }
    }

    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    pub fn persistence(&self) -> Arc<dyn Persistence> {
        Arc::clone(&self.persistence)
    }

    /// Committed item collection, republished after every local change,
    /// settlement and rollback
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Item>>> {
        self.committed.subscribe()
    }

    /// Number of update sets still waiting on persistence
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Apply one gesture's update set locally and start persisting it.
    ///
    /// Returns `None` (and persists nothing) for an empty set. Must be
    /// called from within a tokio runtime.
    pub fn apply(&mut self, writes: Vec<Write>) -> Option<Ticket> {
        if writes.is_empty() {
            return None;
        }

        let inverse = self.store.capture(&writes);
        for skipped in self.store.apply(&writes) {
            match skipped {
                Skipped::Missing(id) => tracing::warn!(%id, "write for unknown item skipped"),
                Skipped::Rejected { id, reason } => {
                    tracing::warn!(%id, %reason, "container change skipped")
                }
            }
        }
        self.publish();

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        tracing::debug!(ticket, writes = writes.len(), "update set applied locally");

        let persistence = Arc::clone(&self.persistence);
        let done_tx = self.done_tx.clone();
        let forward = writes.clone();
        tokio::spawn(async move {
            let call = async move { persistence.apply_update_set(&forward).await };
            let result = persist::run_isolated(call).await;
            let _ = done_tx.send(Completion { ticket, result });
        });

        self.in_flight.insert(
            ticket,
            Mutation {
                ticket,
                forward: writes,
                inverse,
            },
        );
        Some(ticket)
    }

    /// Reconcile every completion that has already arrived, without waiting
    pub fn poll(&mut self) -> Vec<Settlement> {
        let mut settled = Vec::new();
        while let Ok(completion) = self.done_rx.try_recv() {
            settled.push(self.reconcile(completion));
        }
        settled
    }

    /// Wait for the next update set to settle. `None` when nothing is in
    /// flight.
    pub async fn settle_next(&mut self) -> Option<Settlement> {
        let completion = self.recv_completion().await?;
        Some(self.reconcile(completion))
    }

    /// Wait until every in-flight update set has settled
    pub async fn settle_all(&mut self) -> Vec<Settlement> {
        let mut settled = Vec::new();
        while let Some(settlement) = self.settle_next().await {
            settled.push(settlement);
        }
        settled
    }

    pub(crate) async fn recv_completion(&mut self) -> Option<Completion> {
        if self.in_flight.is_empty() {
            return None;
        }
        self.done_rx.recv().await
    }

    pub(crate) fn reconcile(&mut self, completion: Completion) -> Settlement {
        let Completion { ticket, result } = completion;
        let Some(mutation) = self.in_flight.remove(&ticket) else {
            return Ok(Applied { ticket, writes: 0 });
        };

        match result {
            Ok(()) => {
                tracing::debug!(ticket, "update set persisted");
                self.publish();
                Ok(Applied {
                    ticket,
                    writes: mutation.forward.len(),
                })
            }
            Err(error) => {
                let restored = self.store.restore(&mutation.inverse);
                tracing::warn!(
                    ticket,
                    %error,
                    restored = restored.len(),
                    "persistence failed, local changes rolled back"
                );
                self.publish();
                Err(RolledBack {
                    ticket,
                    error,
                    restored,
                })
            }
        }
    }

    /// Remove an item from local state only
    pub(crate) fn take_local(&mut self, id: &str) -> Option<Item> {
        let item = self.store.take(id)?;
        self.publish();
        Some(item)
    }

    /// Put an item back at the head of local state
    pub(crate) fn restore_front(&mut self, item: Item) {
        self.store.put_front(item);
        self.publish();
    }

    fn publish(&self) {
        self.committed.send_replace(Arc::new(self.store.to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::memory::{MemoryStore, StoreCall};
    use crate::model::block::TimeBlock;
    use crate::model::item::Membership;
    use crate::model::write::OrderUpdate;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    struct PanickingStore;

    #[async_trait::async_trait]
    impl Persistence for PanickingStore {
        async fn batch_update_order(&self, _: &[OrderUpdate]) -> Result<(), PersistError> {
            panic!("order batch")
        }

        async fn update_container_membership(
            &self,
            _: &str,
            _: Membership,
            _: &str,
        ) -> Result<(), PersistError> {
            panic!("membership")
        }

        async fn update_schedule(&self, _: &str, _: Option<&TimeBlock>) -> Result<(), PersistError> {
            panic!("schedule")
        }

        async fn remove(&self, _: &str) -> Result<(), PersistError> {
            panic!("remove")
        }
    }

    fn items() -> Vec<Item> {
        ["a", "b", "c"]
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let mut item = Item::new(*id, "2025-05-01T09:00:00Z");
                item.status = Some("todo".into());
                item.order = Some(i as i64);
                item
            })
            .collect()
    }

    fn reorder() -> Vec<Write> {
        vec![
            Write::Order {
                id: "c".into(),
                order: 0,
            },
            Write::Order {
                id: "a".into(),
                order: 1,
            },
            Write::Order {
                id: "b".into(),
                order: 2,
            },
        ]
    }

    fn ids(items: &[Item]) -> Vec<String> {
        items.iter().map(|i| i.id.clone()).collect()
    }

    #[tokio::test]
    async fn applies_before_persisting() {
        let store = Arc::new(MemoryStore::new(items()).with_latency(Duration::from_millis(50)));
        let mut pipeline = Pipeline::new(items(), store.clone());
        let ticket = pipeline.apply(reorder()).unwrap();

        let todo = pipeline.store().container(Membership::Status, "todo");
        assert_eq!(ids(&todo), vec!["c", "a", "b"]);
        assert!(store.calls().is_empty());
        assert_eq!(pipeline.in_flight(), 1);

        let settled = pipeline.settle_next().await.unwrap();
        assert_eq!(settled.unwrap(), Applied { ticket, writes: 3 });
        assert_eq!(store.calls().len(), 1);
        assert!(matches!(&store.calls()[0], StoreCall::Orders(o) if o.len() == 3));
    }

    #[tokio::test]
    async fn rejection_restores_snapshot() {
        let store = Arc::new(MemoryStore::new(items()));
        store.fail_always(true);
        let mut pipeline = Pipeline::new(items(), store.clone());
        let before = pipeline.store().to_vec();

        pipeline.apply(reorder()).unwrap();
        assert_ne!(pipeline.store().to_vec(), before);

        let rolled_back = pipeline.settle_next().await.unwrap().unwrap_err();
        assert_eq!(rolled_back.restored, vec!["c", "a", "b"]);
        assert!(matches!(rolled_back.error, PersistError::Unavailable(_)));
        assert_eq!(pipeline.store().to_vec(), before);
    }

    #[tokio::test]
    async fn empty_set_is_not_persisted() {
        let store = Arc::new(MemoryStore::new(items()));
        let mut pipeline = Pipeline::new(items(), store.clone());
        assert_eq!(pipeline.apply(Vec::new()), None);
        assert_eq!(pipeline.in_flight(), 0);
        assert!(pipeline.settle_next().await.is_none());
    }

    #[tokio::test]
    async fn subscribers_see_optimistic_and_rolled_back_state() {
        let store = Arc::new(MemoryStore::new(items()));
        store.fail_next(1);
        let mut pipeline = Pipeline::new(items(), store.clone());
        let mut rx = pipeline.subscribe();
        rx.borrow_and_update();

        pipeline.apply(reorder()).unwrap();
        assert!(rx.has_changed().unwrap());
        let optimistic = rx.borrow_and_update().clone();
        assert_eq!(optimistic.iter().find(|i| i.id == "c").unwrap().order, Some(0));

        pipeline.settle_all().await;
        let restored = rx.borrow_and_update().clone();
        assert_eq!(restored.iter().find(|i| i.id == "c").unwrap().order, Some(2));
    }

    #[tokio::test]
    async fn each_gesture_settles_independently() {
        let store = Arc::new(MemoryStore::new(items()));
        let mut pipeline = Pipeline::new(items(), store.clone());
        let first = pipeline.apply(reorder()).unwrap();
        let second = pipeline
            .apply(vec![Write::Container {
                id: "b".into(),
                membership: Membership::Status,
                key: "done".into(),
            }])
            .unwrap();
        assert_ne!(first, second);
        let settled = pipeline.settle_all().await;
        assert_eq!(settled.len(), 2);
        assert!(settled.iter().all(|s| s.is_ok()));
        assert_eq!(pipeline.in_flight(), 0);
        assert_eq!(store.item("b").unwrap().status.as_deref(), Some("done"));
    }

    #[tokio::test]
    async fn poll_drains_without_waiting() {
        let store = Arc::new(MemoryStore::new(items()));
        let mut pipeline = Pipeline::new(items(), store);
        pipeline.apply(reorder()).unwrap();
        assert!(pipeline.poll().is_empty());
        let mut settled = Vec::new();
        while pipeline.in_flight() > 0 {
            tokio::task::yield_now().await;
            settled.extend(pipeline.poll());
        }
        assert_eq!(settled.len(), 1);
    }

    #[tokio::test]
    async fn panicking_store_rolls_back() {
        let mut pipeline = Pipeline::new(items(), Arc::new(PanickingStore));
        let before = pipeline.store().to_vec();
        pipeline.apply(reorder()).unwrap();

        let rolled_back = pipeline.settle_next().await.unwrap().unwrap_err();
        assert!(matches!(rolled_back.error, PersistError::Unavailable(_)));
        assert_eq!(pipeline.store().to_vec(), before);
        assert_eq!(pipeline.in_flight(), 0);
        assert!(pipeline.settle_all().await.is_empty());
    }
}
