use indexmap::{IndexMap, IndexSet};

use crate::model::item::{Item, Membership};
use crate::model::write::Write;
use crate::ops::move_ops;

/// Pre-images of the items an update set touches, captured before it is
/// applied
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    items: Vec<Item>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Outcome of merging one write into the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skipped {
    /// The write names an item that is not in the store
    Missing(String),
    /// The container key could not be assigned
    Rejected { id: String, reason: String },
}

/// The in-memory item collection.
///
/// Collection order is insertion order; containers are sorted views over it.
#[derive(Debug, Clone, Default)]
pub struct ItemStore {
    items: IndexMap<String, Item>,
}

impl ItemStore {
    pub fn new(items: Vec<Item>) -> Self {
        ItemStore {
            items: items.into_iter().map(|item| (item.id.clone(), item)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// Every item, in collection order
    pub fn to_vec(&self) -> Vec<Item> {
        self.items.values().cloned().collect()
    }

    /// Stable-sorted members of one container
    pub fn container(&self, membership: Membership, key: &str) -> Vec<Item> {
        move_ops::container(&self.to_vec(), membership, key)
    }

    /// Capture the current state of every item `writes` touches
    pub fn capture(&self, writes: &[Write]) -> Snapshot {
        let touched: IndexSet<&str> = writes.iter().map(Write::id).collect();
        let items = touched
            .into_iter()
            .filter_map(|id| self.items.get(id).cloned())
            .collect();
        Snapshot { items }
    }

    /// Merge an update set. Writes that cannot be applied are skipped and
    /// reported.
    pub fn apply(&mut self, writes: &[Write]) -> Vec<Skipped> {
        let mut skipped = Vec::new();
        for write in writes {
            let Some(item) = self.items.get_mut(write.id()) else {
                skipped.push(Skipped::Missing(write.id().to_string()));
                continue;
            };
            match write {
                Write::Order { order, .. } => item.order = Some(*order),
                Write::Container {
                    membership, key, ..
                } => {
                    if let Err(e) = membership.assign(item, key) {
                        skipped.push(Skipped::Rejected {
                            id: item.id.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
                Write::Schedule { block, .. } => item.block = block.clone(),
            }
        }
        skipped
    }

    /// Put captured items back. Items removed since the capture stay
    /// removed.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Vec<String> {
        let mut restored = Vec::new();
        for item in &snapshot.items {
            if let Some(slot) = self.items.get_mut(&item.id) {
                *slot = item.clone();
                restored.push(item.id.clone());
            }
        }
        restored
    }

    /// Remove an item, keeping the order of the rest
    pub fn take(&mut self, id: &str) -> Option<Item> {
        self.items.shift_remove(id)
    }

    /// Insert at the head of the collection (replacing any item with the
    /// same id)
    pub fn put_front(&mut self, item: Item) {
        self.items.shift_remove(&item.id);
        self.items.shift_insert(0, item.id.clone(), item);
    }
}
