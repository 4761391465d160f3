use std::future::Future;

use async_trait::async_trait;

use crate::model::block::TimeBlock;
use crate::model::item::Membership;
use crate::model::write::{OrderUpdate, Write};

/// Error type for the persistence collaborator
#[derive(Debug, Clone, thiserror::Error)]
pub enum PersistError {
    #[error("item not found: {0}")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("could not encode items: {0}")]
    Encode(String),
    #[error("rejected: {0}")]
    Rejected(String),
}

impl From<std::io::Error> for PersistError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value.to_string())
    }
}

/// The remote item store.
///
/// Every call is independent, may fail on its own, and is safe to resend.
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn batch_update_order(&self, updates: &[OrderUpdate]) -> Result<(), PersistError>;

    async fn update_container_membership(
        &self,
        id: &str,
        membership: Membership,
        key: &str,
    ) -> Result<(), PersistError>;

    /// `None` clears the item's placement
    async fn update_schedule(
        &self,
        id: &str,
        block: Option<&TimeBlock>,
    ) -> Result<(), PersistError>;

    async fn remove(&self, id: &str) -> Result<(), PersistError>;

    /// Persist one gesture's whole update set. Stores that can write a set
    /// in one step override this; the default goes through
    /// [`persist_writes`].
    async fn apply_update_set(&self, writes: &[Write]) -> Result<(), PersistError> {
        persist_writes(self, writes).await
    }
}

/// Send one update set to the store as separate calls.
///
/// Container changes go first, then every order key in a single batch, then
/// schedule changes. The first failure fails the whole set, but calls that
/// already succeeded stay applied at the store: a cross-container move whose
/// order batch is rejected leaves the item in its new container with its old
/// order key, while the pipeline rolls local state back to the old
/// container. The next reindex of either container repairs the keys.
pub async fn persist_writes<P>(store: &P, writes: &[Write]) -> Result<(), PersistError>
where
    P: Persistence + ?Sized,
{
    let mut orders = Vec::new();
    for write in writes {
        match write {
            Write::Container {
                id,
                membership,
                key,
            } => store.update_container_membership(id, *membership, key).await?,
            Write::Order { id, order } => orders.push(OrderUpdate::new(id.clone(), *order)),
            Write::Schedule { .. } => {}
        }
    }
    if !orders.is_empty() {
        store.batch_update_order(&orders).await?;
    }
    for write in writes {
        if let Write::Schedule { id, block } = write {
            store.update_schedule(id, block.as_ref()).await?;
        }
    }
    Ok(())
}

/// Run one persistence call on its own task. A panic inside the call comes
/// back as `PersistError::Unavailable`.
pub(crate) async fn run_isolated<F>(call: F) -> Result<(), PersistError>
where
    F: Future<Output = Result<(), PersistError>> + Send + 'static,
{
    match tokio::spawn(call).await {
        Ok(result) => result,
        Err(e) => Err(PersistError::Unavailable(format!("persistence task failed: {}", e))),
    }
}
