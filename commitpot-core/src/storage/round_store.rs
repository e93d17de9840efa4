use crate::error::Result;
use crate::storage::Storage;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

/// Persists the round slot as a JSON snapshot.
pub struct RoundStore<'a> {
    storage: &'a Storage,
}

impl<'a> RoundStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn save<T: Serialize>(&self, round_id: Uuid, round: &T) -> Result<()> {
        let conn = self.storage.get_connection().await;
        let snapshot = serde_json::to_string(round)?;

        conn.execute(
            "INSERT OR REPLACE INTO rounds (id, snapshot, updated_at) VALUES (?1, ?2, ?3)",
            params![round_id.to_string(), snapshot, Utc::now().timestamp()],
        )?;

        tracing::debug!("Saved snapshot for round {}", round_id);
        Ok(())
    }

    /// Most recently updated round, if any.
    pub async fn load_latest<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let conn = self.storage.get_connection().await;

        let snapshot: Option<String> = conn
            .query_row(
                "SELECT snapshot FROM rounds ORDER BY updated_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match snapshot {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Slot {
        pot: u64,
    }

    #[tokio::test]
    async fn test_save_replaces_snapshot() {
        let storage = Storage::in_memory().await.unwrap();
        let store = RoundStore::new(&storage);
        let id = Uuid::new_v4();

        assert!(store.load_latest::<Slot>().await.unwrap().is_none());

        store.save(id, &Slot { pot: 10 }).await.unwrap();
        store.save(id, &Slot { pot: 25 }).await.unwrap();

        let loaded: Option<Slot> = store.load_latest().await.unwrap();
        assert_eq!(loaded, Some(Slot { pot: 25 }));
    }
}
