use std::{
    path::Path,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::EventStore;
use crate::error::StoreError;
use crate::models::{Event, EventId};
use crate::utils;

/// Embedded store used when the remote API is not available.
///
/// `spots` lives in its own column so the decrement can be a single
/// conditional `UPDATE`; the rest of the record is kept as JSON.
#[derive(Clone)]
pub struct SqliteEventStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEventStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        utils::ensure_parent(path);
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        init_schema(&conn)?;
        seed_if_empty(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Inserts or replaces a record, including its spot count.
    pub fn upsert_event(&self, event: &Event) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        upsert(&conn, event)
    }

    async fn with_conn<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().unwrap_or_else(PoisonError::into_inner);
            work(&guard)
        })
        .await
        .map_err(|err| StoreError::Task(err.to_string()))?
    }
}

#[async_trait]
impl EventStore for SqliteEventStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT payload, spots FROM events ORDER BY rowid")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
            })?;
            let mut out = Vec::new();
            for row in rows {
                let (payload, spots) = row?;
                out.push(decode(&payload, spots)?);
            }
            Ok(out)
        })
        .await
    }

    async fn get_event(&self, id: &EventId) -> Result<Event, StoreError> {
        let id = id.clone();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT payload, spots FROM events WHERE id = ?1",
                    params![id.as_str()],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?)),
                )
                .optional()?;
            match row {
                Some((payload, spots)) => decode(&payload, spots),
                None => Err(StoreError::NotFound(id)),
            }
        })
        .await
    }

    async fn update_spots(&self, id: &EventId, spots: u32) -> Result<(), StoreError> {
        let id = id.clone();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE events SET spots = ?2, updated_at_utc = ?3 WHERE id = ?1",
                params![id.as_str(), spots, Utc::now().to_rfc3339()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn decrement_spots(&self, id: &EventId, expected: u32) -> Result<(), StoreError> {
        let id = id.clone();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE events SET spots = spots - 1, updated_at_utc = ?3
                 WHERE id = ?1 AND spots = ?2 AND spots > 0",
                params![id.as_str(), expected, Utc::now().to_rfc3339()],
            )?;
            if changed == 1 {
                debug!(%id, remaining = expected - 1, "spot taken");
                return Ok(());
            }
            let current: Option<u32> = conn
                .query_row(
                    "SELECT spots FROM events WHERE id = ?1",
                    params![id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            match current {
                None => Err(StoreError::NotFound(id)),
                Some(0) => Err(StoreError::Exhausted(id)),
                Some(_) => Err(StoreError::Conflict { id, expected }),
            }
        })
        .await
    }
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS events(
            id TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            spots INTEGER NOT NULL CHECK (spots >= 0),
            first_seen_utc TEXT NOT NULL,
            updated_at_utc TEXT NOT NULL
        );",
    )?;
    Ok(())
}

fn seed_if_empty(conn: &Connection) -> Result<(), StoreError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
    if count > 0 {
        return Ok(());
    }
    for event in sample_events() {
        upsert(conn, &event)?;
    }
    Ok(())
}

fn upsert(conn: &Connection, event: &Event) -> Result<(), StoreError> {
    let now = Utc::now().to_rfc3339();
    let payload =
        serde_json::to_string(event).map_err(|err| StoreError::Parse(err.to_string()))?;
    conn.execute(
        "INSERT INTO events (id, payload, spots, first_seen_utc, updated_at_utc)
         VALUES (?1, ?2, ?3, ?4, ?4)
         ON CONFLICT(id) DO UPDATE SET
           payload = excluded.payload,
           spots = excluded.spots,
           updated_at_utc = excluded.updated_at_utc",
        params![event.id.as_str(), payload, event.spots, now],
    )?;
    Ok(())
}

fn decode(payload: &str, spots: u32) -> Result<Event, StoreError> {
    let mut event: Event =
        serde_json::from_str(payload).map_err(|err| StoreError::Parse(err.to_string()))?;
    event.spots = spots;
    Ok(event)
}

fn sample_events() -> Vec<Event> {
    let tags = |list: &[&str]| -> Vec<String> { list.iter().map(|tag| tag.to_string()).collect() };
    vec![
        Event {
            id: EventId::from("1"),
            title: "Morning Yoga in the Park".to_string(),
            time: "7:00 AM – 8:00 AM".to_string(),
            location: "Hyde Park, Sydney".to_string(),
            spots: 10,
            tags: tags(&["Today", "Wellness", "Outdoor"]),
            date_label: "Today".to_string(),
            description: Some("Start your day with relaxing yoga in nature.".to_string()),
        },
        Event {
            id: EventId::from("2"),
            title: "Tech Networking Meetup".to_string(),
            time: "6:30 PM – 8:30 PM".to_string(),
            location: "Startup Hub, Sydney".to_string(),
            spots: 25,
            tags: tags(&["This Week", "Tech", "Networking"]),
            date_label: "This Week".to_string(),
            description: Some("Meet professionals and expand your tech network.".to_string()),
        },
        Event {
            id: EventId::from("3"),
            title: "Weekend Hiking Trip".to_string(),
            time: "8:00 AM – 2:00 PM".to_string(),
            location: "Blue Mountains".to_string(),
            spots: 15,
            tags: tags(&["Weekend", "Adventure", "Outdoor"]),
            date_label: "Weekend".to_string(),
            description: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeds_sample_events_once() {
        let store = SqliteEventStore::open_in_memory().unwrap();
        let events = store.list_events().await.unwrap();
        let ids: Vec<&str> = events.iter().map(|event| event.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
        assert!(events[2].description.is_none());
    }

    #[tokio::test]
    async fn reopening_a_file_keeps_updates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.sqlite");
        let id = EventId::from("2");
        {
            let store = SqliteEventStore::open(&path).unwrap();
            store.update_spots(&id, 4).await.unwrap();
        }
        let store = SqliteEventStore::open(&path).unwrap();
        assert_eq!(store.get_event(&id).await.unwrap().spots, 4);
        assert_eq!(store.list_events().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn decrement_checks_expected_count() {
        let store = SqliteEventStore::open_in_memory().unwrap();
        let id = EventId::from("1");
        store.decrement_spots(&id, 10).await.unwrap();
        assert_eq!(store.get_event(&id).await.unwrap().spots, 9);

        let err = store.decrement_spots(&id, 10).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { expected: 10, .. }));
        assert_eq!(store.get_event(&id).await.unwrap().spots, 9);
    }

    #[tokio::test]
    async fn decrement_never_goes_negative() {
        let store = SqliteEventStore::open_in_memory().unwrap();
        let id = EventId::from("3");
        store.update_spots(&id, 0).await.unwrap();
        let err = store.decrement_spots(&id, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::Exhausted(_)));
        assert_eq!(store.get_event(&id).await.unwrap().spots, 0);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let store = SqliteEventStore::open_in_memory().unwrap();
        let id = EventId::from("404");
        assert!(matches!(store.get_event(&id).await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.update_spots(&id, 1).await, Err(StoreError::NotFound(_))));
        assert!(matches!(
            store.decrement_spots(&id, 1).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn upsert_replaces_payload_and_spots() {
        let store = SqliteEventStore::open_in_memory().unwrap();
        let mut event = store.get_event(&EventId::from("2")).await.unwrap();
        event.title = "Tech Meetup (moved)".to_string();
        event.spots = 2;
        store.upsert_event(&event).unwrap();

        let stored = store.get_event(&event.id).await.unwrap();
        assert_eq!(stored, event);
        assert_eq!(store.list_events().await.unwrap().len(), 3);
    }
}
