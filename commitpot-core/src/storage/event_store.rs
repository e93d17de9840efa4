use crate::error::Result;
use crate::storage::Storage;
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    pub seq: i64,
    pub round_id: String,
    pub kind: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Append-only log of events published by a round.
pub struct EventStore<'a> {
    storage: &'a Storage,
}

impl<'a> EventStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn append<T: Serialize>(&self, round_id: Uuid, kind: &str, event: &T) -> Result<i64> {
        let conn = self.storage.get_connection().await;
        let payload = serde_json::to_string(event)?;

        conn.execute(
            "INSERT INTO events (round_id, kind, payload, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![round_id.to_string(), kind, payload, Utc::now().timestamp()],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Newest events first.
    pub async fn list(&self, limit: usize) -> Result<Vec<StoredEvent>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT seq, round_id, kind, payload, created_at
             FROM events ORDER BY seq DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            let seq: i64 = row.get(0)?;
            let round_id: String = row.get(1)?;
            let kind: String = row.get(2)?;
            let payload: String = row.get(3)?;
            let created_at: i64 = row.get(4)?;
            Ok((seq, round_id, kind, payload, created_at))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (seq, round_id, kind, payload, created_at) = row?;
            events.push(StoredEvent {
                seq,
                round_id,
                kind,
                payload: serde_json::from_str(&payload)?,
                created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_else(Utc::now),
            });
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_listed_newest_first() {
        let storage = Storage::in_memory().await.unwrap();
        let store = EventStore::new(&storage);
        let round_id = Uuid::new_v4();

        store.append(round_id, "Committed", &serde_json::json!({"a": 1})).await.unwrap();
        store.append(round_id, "GuessPlaced", &serde_json::json!({"b": 2})).await.unwrap();

        let events = store.list(10).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, "GuessPlaced");
        assert_eq!(events[1].payload["a"], 1);
        assert_eq!(storage.height().await.unwrap(), 2);
    }
}
