use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

use crate::error::StoreError;

/// The named values that survive between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    AccessToken,
    RefreshToken,
    Identity,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::AccessToken, Slot::RefreshToken, Slot::Identity];

    pub fn key(self) -> &'static str {
        match self {
            Slot::AccessToken => "token",
            Slot::RefreshToken => "refresh",
            Slot::Identity => "user",
        }
    }
}

/// Durable string slots. Batched writes and clears are all-or-nothing.
#[async_trait]
pub trait SlotStore: Send + Sync {
    async fn read(&self, slot: Slot) -> Result<Option<String>, StoreError>;

    async fn write_all(&self, entries: &[(Slot, String)]) -> Result<(), StoreError>;

    async fn clear_all(&self, slots: &[Slot]) -> Result<(), StoreError>;
}

pub struct SqliteSlots {
    pool: SqlitePool,
}

impl SqliteSlots {
    pub async fn connect(db_url: &str) -> Result<Self, StoreError> {
        // One connection: every `sqlite::memory:` connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(db_url)
            .await?;

        create_slot_table(&pool).await?;

        Ok(Self { pool })
    }
}

pub async fn create_slot_table(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS session_slots (
            name TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[async_trait]
impl SlotStore for SqliteSlots {
    async fn read(&self, slot: Slot) -> Result<Option<String>, StoreError> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM session_slots WHERE name = ?")
            .bind(slot.key())
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    async fn write_all(&self, entries: &[(Slot, String)]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for (slot, value) in entries {
            sqlx::query(
                r#"
                INSERT INTO session_slots (name, value)
                VALUES (?, ?)
                ON CONFLICT(name) DO UPDATE SET value = excluded.value
                "#,
            )
            .bind(slot.key())
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    async fn clear_all(&self, slots: &[Slot]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for slot in slots {
            sqlx::query("DELETE FROM session_slots WHERE name = ?")
                .bind(slot.key())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(())
    }
}

/// Process-local slots, for embedding without a database file.
#[derive(Debug, Default)]
pub struct MemorySlots {
    values: Mutex<HashMap<Slot, String>>,
}

impl MemorySlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = (Slot, String)>,
    {
        Self {
            values: Mutex::new(values.into_iter().collect()),
        }
    }
}

#[async_trait]
impl SlotStore for MemorySlots {
    async fn read(&self, slot: Slot) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(&slot).cloned())
    }

    async fn write_all(&self, entries: &[(Slot, String)]) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.extend(entries.iter().cloned());
        Ok(())
    }

    async fn clear_all(&self, slots: &[Slot]) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        for slot in slots {
            values.remove(slot);
        }
        Ok(())
    }
}
