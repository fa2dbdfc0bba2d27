pub mod http;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{AppConfig, StoreKind};
use crate::error::StoreError;
use crate::models::{Event, EventId};

pub use http::HttpEventStore;
pub use sqlite::SqliteEventStore;

/// The authoritative holder of event records.
///
/// Clients only read events and change `spots`; creation and deletion
/// belong to the store's owner.
#[async_trait]
pub trait EventStore: Send + Sync {
    fn name(&self) -> &'static str;

    async fn list_events(&self) -> Result<Vec<Event>, StoreError>;

    async fn get_event(&self, id: &EventId) -> Result<Event, StoreError>;

    /// Unconditional partial update of `spots`.
    async fn update_spots(&self, id: &EventId, spots: u32) -> Result<(), StoreError>;

    /// Takes one spot, provided the stored count still equals `expected`.
    ///
    /// Fails with `Exhausted` when no spot is left and `Conflict` when the
    /// count moved since the caller read it.
    async fn decrement_spots(&self, id: &EventId, expected: u32) -> Result<(), StoreError>;
}

pub fn open_store(config: &AppConfig) -> Result<Arc<dyn EventStore>, StoreError> {
    match config.store {
        StoreKind::Http => {
            let store = HttpEventStore::new(&config.api_base_url, config.request_timeout())?;
            Ok(Arc::new(store))
        }
        StoreKind::Local => {
            let store = SqliteEventStore::open(&config.database_path())?;
            Ok(Arc::new(store))
        }
    }
}
