pub mod sqlite;

use tokio::sync::broadcast;

use crate::app::error::Result;
use crate::domain::Item;

pub use sqlite::SqliteStore;

/// Filter for [`ItemStore::query`]. Absent fields impose no constraint;
/// category and source are exact-set membership, text is a
/// case-insensitive substring match against the title.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub categories: Option<Vec<String>>,
    pub sources: Option<Vec<String>>,
    pub text: Option<String>,
}

/// Change notification delivered to consumers after a store mutation
/// commits.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    ItemsChanged(Vec<String>),
}

/// The one shared mutable resource in the pipeline. `merge` is the only
/// write path that can create records; the single-field mutations require
/// the record to exist and fail with `ItemNotFound` otherwise. All
/// mutations are internally synchronized so concurrent refresh runs and
/// hydrations never interleave a partial write.
pub trait ItemStore {
    /// Merge-insert: reconcile each incoming item with any stored record
    /// of the same key, inserting otherwise. Returns the post-merge items
    /// in input order.
    fn merge(&self, items: &[Item]) -> Result<Vec<Item>>;

    fn get(&self, key: &str) -> Result<Option<Item>>;

    fn query(&self, filter: &ItemFilter) -> Result<Vec<Item>>;

    fn set_bookmarked(&self, key: &str, bookmarked: bool) -> Result<()>;

    fn touch_last_accessed(&self, key: &str) -> Result<()>;

    /// Subscribe to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}
