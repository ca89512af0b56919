//! Event Store abstraction.
//!
//! Handlers only see [`EventStore`]; the Postgres implementation lives in
//! [`crate::db`] and [`MemoryEventStore`] backs tests and local runs.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::StoreBackend;
use crate::db::{self, PgEventStore};
use crate::models::{Event, NewEvent};
use crate::{Config, Result};

/// Persistence contract for calendar events.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist a new event and return it with its freshly assigned id.
    async fn insert(&self, new_event: NewEvent) -> Result<Event>;

    /// Look up a single event. Absence is `Ok(None)`, not an error.
    async fn find_by_id(&self, id: i32) -> Result<Option<Event>>;

    /// Every stored event, in insertion order.
    async fn find_all(&self) -> Result<Vec<Event>>;

    /// Remove the given event by id.
    async fn delete(&self, event: &Event) -> Result<()>;
}

/// Open the store selected by `config`.
pub async fn open_store(config: &Config) -> Result<Arc<dyn EventStore>> {
    match config.store_backend {
        StoreBackend::Memory => {
            info!("Using in-memory event store");
            Ok(Arc::new(MemoryEventStore::new()))
        }
        StoreBackend::Postgres => {
            let pool = db::create_pool(config).await?;
            db::ensure_schema(&pool).await?;
            info!("Connected to Postgres event store");
            Ok(Arc::new(PgEventStore::new(pool)))
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryEventStore
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct MemoryState {
    next_id: i32,
    events: BTreeMap<i32, Event>,
}

/// Process-local store. Ids increase monotonically and are never reused.
#[derive(Debug)]
pub struct MemoryEventStore {
    state: RwLock<MemoryState>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState {
                next_id: 1,
                events: BTreeMap::new(),
            }),
        }
    }
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn insert(&self, new_event: NewEvent) -> Result<Event> {
        let mut state = self.state.write().await;
        let id = state.next_id;
        state.next_id += 1;

        let event = Event {
            id,
            event: new_event.event,
            date: new_event.date,
        };
        state.events.insert(id, event.clone());
        Ok(event)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Event>> {
        Ok(self.state.read().await.events.get(&id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Event>> {
        Ok(self.state.read().await.events.values().cloned().collect())
    }

    async fn delete(&self, event: &Event) -> Result<()> {
        self.state.write().await.events.remove(&event.id);
        Ok(())
    }
}
