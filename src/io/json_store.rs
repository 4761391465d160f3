use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;

use crate::io::persist::{PersistError, Persistence};
use crate::model::block::TimeBlock;
use crate::model::item::{Item, Membership};
use crate::model::write::{OrderUpdate, Write};

/// On-disk shape of items.json
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemsFile {
    #[serde(default)]
    pub items: Vec<Item>,
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Read every item from an items file
pub fn read_items(path: &Path) -> Result<Vec<Item>, PersistError> {
    let text = fs::read_to_string(path)?;
    let file: ItemsFile = serde_json::from_str(&text)?;
    Ok(file.items)
}

/// Replace the items file contents
pub fn write_items(path: &Path, items: &[Item]) -> Result<(), PersistError> {
    let file = ItemsFile {
        items: items.to_vec(),
    };
    let mut content = serde_json::to_string_pretty(&file)?;
    content.push('\n');
    atomic_write(path, content.as_bytes())?;
    Ok(())
}

/// Persistence backed by a JSON file.
///
/// Each call is a read-modify-write of the whole file. Calls are serialized
/// so concurrent gestures cannot interleave their writes.
pub struct JsonFileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<Item>, PersistError> {
        read_items(&self.path)
    }

    async fn modify<F>(&self, f: F) -> Result<(), PersistError>
    where
        F: FnOnce(&mut Vec<Item>) -> Result<(), PersistError> + Send,
    {
        let _guard = self.guard.lock().await;
        let mut items = read_items(&self.path)?;
        f(&mut items)?;
        write_items(&self.path, &items)
    }
}

fn find_mut<'a>(items: &'a mut [Item], id: &str) -> Result<&'a mut Item, PersistError> {
    items
        .iter_mut()
        .find(|item| item.id == id)
        .ok_or_else(|| PersistError::NotFound(id.to_string()))
}

#[async_trait]
impl Persistence for JsonFileStore {
    async fn batch_update_order(&self, updates: &[OrderUpdate]) -> Result<(), PersistError> {
        self.modify(|items| {
            for update in updates {
                find_mut(items, &update.id)?.order = Some(update.order);
            }
            Ok(())
        })
        .await
    }

    async fn update_container_membership(
        &self,
        id: &str,
        membership: Membership,
        key: &str,
    ) -> Result<(), PersistError> {
        self.modify(|items| {
            membership
                .assign(find_mut(items, id)?, key)
                .map_err(|e| PersistError::Rejected(e.to_string()))
        })
        .await
    }

    async fn update_schedule(
        &self,
        id: &str,
        block: Option<&TimeBlock>,
    ) -> Result<(), PersistError> {
        let block = block.cloned();
        self.modify(move |items| {
            find_mut(items, id)?.block = block;
            Ok(())
        })
        .await
    }

    async fn remove(&self, id: &str) -> Result<(), PersistError> {
        self.modify(|items| {
            items.retain(|item| item.id != id);
            Ok(())
        })
        .await
    }

    /// The whole set in one read-modify-write: either every write lands or
    /// the file is left as it was
    async fn apply_update_set(&self, writes: &[Write]) -> Result<(), PersistError> {
        self.modify(|items| {
            for write in writes {
                let item = find_mut(items, write.id())?;
                match write {
                    Write::Order { order, .. } => item.order = Some(*order),
                    Write::Container {
                        membership, key, ..
                    } => membership
                        .assign(item, key)
                        .map_err(|e| PersistError::Rejected(e.to_string()))?,
                    Write::Schedule { block, .. } => item.block = block.clone(),
                }
            }
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seeded(dir: &TempDir) -> JsonFileStore {
        let path = dir.path().join("items.json");
        let mut a = Item::new("a", "2025-05-01T09:00:00Z");
        a.status = Some("todo".into());
        a.order = Some(0);
        let mut b = Item::new("b", "2025-05-02T09:00:00Z");
        b.status = Some("todo".into());
        b.order = Some(1);
        write_items(&path, &[a, b]).unwrap();
        JsonFileStore::new(path)
    }

    #[tokio::test]
    async fn order_batch_is_written() {
        let dir = TempDir::new().unwrap();
        let store = seeded(&dir);
        store
            .batch_update_order(&[OrderUpdate::new("b", 0), OrderUpdate::new("a", 1)])
            .await
            .unwrap();
        let items = store.load().unwrap();
        assert_eq!(items[0].order, Some(1));
        assert_eq!(items[1].order, Some(0));
    }

    #[tokio::test]
    async fn missing_item_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let store = seeded(&dir);
        let before = fs::read_to_string(store.path()).unwrap();
        let err = store
            .batch_update_order(&[OrderUpdate::new("a", 5), OrderUpdate::new("zz", 6)])
            .await
            .unwrap_err();
        assert!(matches!(err, PersistError::NotFound(_)));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn schedule_and_remove() {
        let dir = TempDir::new().unwrap();
        let store = seeded(&dir);
        let block = TimeBlock::new("2025-05-05", 540, 600);
        store.update_schedule("a", Some(&block)).await.unwrap();
        store.remove("b").await.unwrap();
        let items = store.load().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].block, Some(block));
    }

    #[tokio::test]
    async fn membership_change() {
        let dir = TempDir::new().unwrap();
        let store = seeded(&dir);
        store
            .update_container_membership("a", Membership::Status, "done")
            .await
            .unwrap();
        assert_eq!(store.load().unwrap()[0].status.as_deref(), Some("done"));
    }

    #[test]
    fn empty_object_reads_as_no_items() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("items.json");
        fs::write(&path, "{}").unwrap();
        assert!(read_items(&path).unwrap().is_empty());
    }

    #[test]
    fn malformed_file_is_encode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("items.json");
        fs::write(&path, "not json {{{").unwrap();
        assert!(matches!(read_items(&path), Err(PersistError::Encode(_))));
    }

    #[tokio::test]
    async fn update_set_is_one_write() {
        let dir = TempDir::new().unwrap();
        let store = seeded(&dir);
        let writes = vec![
            Write::Container {
                id: "a".into(),
                membership: Membership::Status,
                key: "done".into(),
            },
            Write::Order {
                id: "b".into(),
                order: 0,
            },
            Write::Order {
                id: "a".into(),
                order: 0,
            },
            Write::Schedule {
                id: "b".into(),
                block: Some(TimeBlock::new("2025-05-05", 540, 600)),
            },
        ];
        store.apply_update_set(&writes).await.unwrap();
        let items = store.load().unwrap();
        assert_eq!(items[0].status.as_deref(), Some("done"));
        assert_eq!(items[0].order, Some(0));
        assert_eq!(items[1].order, Some(0));
        assert!(items[1].block.is_some());
    }

    #[tokio::test]
    async fn rejected_update_set_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let store = seeded(&dir);
        let before = fs::read_to_string(store.path()).unwrap();
        let writes = vec![
            Write::Container {
                id: "a".into(),
                membership: Membership::Status,
                key: "done".into(),
            },
            Write::Order {
                id: "ghost".into(),
                order: 1,
            },
        ];
        let err = store.apply_update_set(&writes).await.unwrap_err();
        assert!(matches!(err, PersistError::NotFound(id) if id == "ghost"));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);

        let bad_day = vec![Write::Container {
            id: "a".into(),
            membership: Membership::Day,
            key: "someday".into(),
        }];
        assert!(matches!(
            store.apply_update_set(&bad_day).await,
            Err(PersistError::Rejected(_))
        ));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
    }
}
