use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::db::{
    helpers::{parse_datetime, to_u32},
    models::TakeCounter,
    Database,
};

fn to_counter(key: String, takes: i64, updated_at: String) -> Result<TakeCounter> {
    Ok(TakeCounter {
        key,
        takes: to_u32(takes, "takes")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn get_take_counter(&self, key: &str) -> Result<Option<TakeCounter>> {
        let key = key.to_string();
        self.execute(move |conn| {
            let raw: Option<(String, i64, String)> = conn
                .query_row(
                    "SELECT key, takes, updated_at
                     FROM take_counters
                     WHERE key = ?1",
                    params![key],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()
                .context("failed to read take counter row")?;
            raw.map(|(key, takes, updated_at)| to_counter(key, takes, updated_at))
                .transpose()
        })
        .await
    }

    pub async fn load_take_count(&self, key: &str) -> Result<Option<u32>> {
        Ok(self.get_take_counter(key).await?.map(|counter| counter.takes))
    }

    pub async fn save_take_count(&self, key: &str, takes: u32) -> Result<()> {
        let key = key.to_string();
        let now = Utc::now().to_rfc3339();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO take_counters (key, takes, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                     takes = excluded.takes,
                     updated_at = excluded.updated_at",
                params![key, i64::from(takes), now],
            )
            .context("failed to write take counter")?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    #[tokio::test]
    async fn save_then_load_round_trips_latest_value() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.load_take_count("gtk_take_a").await.unwrap(), None);

        db.save_take_count("gtk_take_a", 1).await.unwrap();
        db.save_take_count("gtk_take_a", 2).await.unwrap();

        assert_eq!(db.load_take_count("gtk_take_a").await.unwrap(), Some(2));
        let counter = db.get_take_counter("gtk_take_a").await.unwrap().unwrap();
        assert_eq!(counter.key, "gtk_take_a");
        assert_eq!(counter.takes, 2);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let db = Database::open_in_memory().unwrap();
        db.save_take_count("gtk_take_a", 3).await.unwrap();
        assert_eq!(db.load_take_count("gtk_take_b").await.unwrap(), None);
        assert!(db.get_take_counter("gtk_take_b").await.unwrap().is_none());
    }
}
