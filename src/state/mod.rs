pub mod deletion;
pub mod pipeline;
pub mod session;
pub mod store;

pub use deletion::{DeferredDeletion, DeletionEvent, PendingNotice};
pub use pipeline::{Applied, Mutation, Pipeline, RolledBack, Settlement, Ticket};
pub use session::{Session, SessionEvent};
pub use store::{ItemStore, Skipped, Snapshot};
