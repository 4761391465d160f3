use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::io::persist::{PersistError, Persistence};
use crate::model::block::TimeBlock;
use crate::model::item::{Item, Membership};
use crate::model::write::OrderUpdate;

/// A call the store accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Orders(Vec<OrderUpdate>),
    Membership {
        id: String,
        membership: Membership,
        key: String,
    },
    Schedule {
        id: String,
        block: Option<TimeBlock>,
    },
    Remove(String),
}

/// In-process store with a call log and failure injection
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<IndexMap<String, Item>>,
    calls: Mutex<Vec<StoreCall>>,
    fail_next: AtomicUsize,
    fail_always: AtomicBool,
    latency: Option<Duration>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    pub fn new(items: Vec<Item>) -> Self {
        MemoryStore {
            items: Mutex::new(items.into_iter().map(|i| (i.id.clone(), i)).collect()),
            ..Default::default()
        }
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Reject the next `n` calls
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Reject every call until switched off
    pub fn fail_always(&self, fail: bool) {
        self.fail_always.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.calls).clone()
    }

    pub fn item(&self, id: &str) -> Option<Item> {
        lock(&self.items).get(id).cloned()
    }

    pub fn items(&self) -> Vec<Item> {
        lock(&self.items).values().cloned().collect()
    }

    async fn begin_call(&self) -> Result<(), PersistError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.fail_always.load(Ordering::SeqCst) {
            return Err(PersistError::Unavailable("injected failure".into()));
        }
        let rejected = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if rejected {
            return Err(PersistError::Unavailable("injected failure".into()));
        }
        Ok(())
    }

    fn record(&self, call: StoreCall) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl Persistence for MemoryStore {
    async fn batch_update_order(&self, updates: &[OrderUpdate]) -> Result<(), PersistError> {
        self.begin_call().await?;
        {
            let mut items = lock(&self.items);
            if let Some(missing) = updates.iter().find(|u| !items.contains_key(&u.id)) {
                return Err(PersistError::NotFound(missing.id.clone()));
            }
            for update in updates {
                if let Some(item) = items.get_mut(&update.id) {
                    item.order = Some(update.order);
                }
            }
        }
        self.record(StoreCall::Orders(updates.to_vec()));
        Ok(())
    }

    async fn update_container_membership(
        &self,
        id: &str,
        membership: Membership,
        key: &str,
    ) -> Result<(), PersistError> {
        self.begin_call().await?;
        {
            let mut items = lock(&self.items);
            let item = items
                .get_mut(id)
                .ok_or_else(|| PersistError::NotFound(id.to_string()))?;
            membership
                .assign(item, key)
                .map_err(|e| PersistError::Rejected(e.to_string()))?;
        }
        self.record(StoreCall::Membership {
            id: id.to_string(),
            membership,
            key: key.to_string(),
        });
        Ok(())
    }

    async fn update_schedule(
        &self,
        id: &str,
        block: Option<&TimeBlock>,
    ) -> Result<(), PersistError> {
        self.begin_call().await?;
        {
            let mut items = lock(&self.items);
            let item = items
                .get_mut(id)
                .ok_or_else(|| PersistError::NotFound(id.to_string()))?;
            item.block = block.cloned();
        }
        self.record(StoreCall::Schedule {
            id: id.to_string(),
            block: block.cloned(),
        });
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), PersistError> {
        self.begin_call().await?;
        lock(&self.items).shift_remove(id);
        self.record(StoreCall::Remove(id.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fail_next_counts_down() {
        let store = MemoryStore::new(vec![Item::new("a", "t")]);
        store.fail_next(2);
        assert!(store.remove("a").await.is_err());
        assert!(store.remove("a").await.is_err());
        assert!(store.remove("a").await.is_ok());
        assert!(store.item("a").is_none());
        assert_eq!(store.calls(), vec![StoreCall::Remove("a".into())]);
    }

    #[tokio::test]
    async fn unknown_ids_are_rejected_without_partial_writes() {
        let store = MemoryStore::new(vec![Item::new("a", "t")]);
        let err = store
            .batch_update_order(&[OrderUpdate::new("a", 3), OrderUpdate::new("ghost", 4)])
            .await
            .unwrap_err();
        assert!(matches!(err, PersistError::NotFound(id) if id == "ghost"));
        assert_eq!(store.item("a").unwrap().order, None);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let store = MemoryStore::new(vec![Item::new("a", "t")]);
        store.remove("a").await.unwrap();
        store.remove("a").await.unwrap();
        assert!(store.items().is_empty());
    }
}
