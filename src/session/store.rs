use std::{
    collections::HashMap,
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use log::{info, warn};
use tokio::sync::Mutex;

use crate::db::Database;

/// Per-session take counter storage, local to one client profile.
///
/// Implementations never surface storage errors: a broken backend degrades to
/// in-memory counts so the recording flow keeps moving.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str) -> u32;

    async fn set(&self, session_id: &str, takes: u32);

    async fn reset(&self, session_id: &str) {
        self.set(session_id, 0).await;
    }
}

/// Storage key for a session's counter.
pub fn take_key(session_id: &str) -> String {
    if session_id.is_empty() {
        "gtk_take_unknown".to_string()
    } else {
        format!("gtk_take_{session_id}")
    }
}

#[derive(Default)]
pub struct MemoryTakeStore {
    counts: Mutex<HashMap<String, u32>>,
}

impl MemoryTakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn load(&self, key: &str) -> u32 {
        self.counts.lock().await.get(key).copied().unwrap_or(0)
    }

    async fn store(&self, key: String, takes: u32) {
        self.counts.lock().await.insert(key, takes);
    }
}

#[async_trait]
impl SessionStore for MemoryTakeStore {
    async fn get(&self, session_id: &str) -> u32 {
        self.load(&take_key(session_id)).await
    }

    async fn set(&self, session_id: &str, takes: u32) {
        self.store(take_key(session_id), takes).await;
    }
}

/// SQLite-backed store that falls back to memory when the file is unusable.
pub struct LocalTakeStore {
    db: Option<Database>,
    mirror: MemoryTakeStore,
    degraded: AtomicBool,
}

impl LocalTakeStore {
    pub fn open(path: PathBuf) -> Self {
        match Database::new(path.clone()) {
            Ok(db) => Self::with_database(db),
            Err(err) => {
                warn!(
                    "Take store at {} unavailable, keeping counts in memory: {err:#}",
                    path.display()
                );
                Self::memory_only()
            }
        }
    }

    pub fn with_database(db: Database) -> Self {
        Self {
            db: Some(db),
            mirror: MemoryTakeStore::new(),
            degraded: AtomicBool::new(false),
        }
    }

    pub fn memory_only() -> Self {
        Self {
            db: None,
            mirror: MemoryTakeStore::new(),
            degraded: AtomicBool::new(true),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    fn active_db(&self) -> Option<&Database> {
        if self.is_degraded() {
            None
        } else {
            self.db.as_ref()
        }
    }

    fn degrade(&self, err: anyhow::Error) {
        if !self.degraded.swap(true, Ordering::SeqCst) {
            warn!("Take store failed, continuing with in-memory counts: {err:#}");
        }
    }
}

#[async_trait]
impl SessionStore for LocalTakeStore {
    async fn get(&self, session_id: &str) -> u32 {
        let key = take_key(session_id);
        if let Some(db) = self.active_db() {
            match db.load_take_count(&key).await {
                Ok(stored) => {
                    let takes = stored.unwrap_or(0);
                    self.mirror.store(key, takes).await;
                    return takes;
                }
                Err(err) => self.degrade(err),
            }
        }
        self.mirror.load(&key).await
    }

    async fn set(&self, session_id: &str, takes: u32) {
        let key = take_key(session_id);
        self.mirror.store(key.clone(), takes).await;
        if let Some(db) = self.active_db() {
            if let Err(err) = db.save_take_count(&key, takes).await {
                self.degrade(err);
            }
        }
    }

    async fn reset(&self, session_id: &str) {
        info!("Resetting take counter for session {session_id}");
        self.set(session_id, 0).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(take_key("123"), "gtk_take_123");
        assert_eq!(take_key(""), "gtk_take_unknown");
        assert_eq!(take_key("abc "), "gtk_take_abc ");
    }

    #[tokio::test]
    async fn padded_ids_keep_their_own_counter() {
        let store = MemoryTakeStore::new();
        store.set("abc", 2).await;
        assert_eq!(store.get("abc ").await, 0);
        assert_eq!(store.get("abc").await, 2);
    }

    #[tokio::test]
    async fn memory_store_defaults_to_zero_and_resets() {
        let store = MemoryTakeStore::new();
        assert_eq!(store.get("s").await, 0);
        store.set("s", 2).await;
        assert_eq!(store.get("s").await, 2);
        assert_eq!(store.get("other").await, 0);
        store.reset("s").await;
        assert_eq!(store.get("s").await, 0);
    }

    #[tokio::test]
    async fn local_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("takes.sqlite3");

        {
            let store = LocalTakeStore::open(path.clone());
            assert!(!store.is_degraded());
            store.set("abc", 2).await;
        }

        let store = LocalTakeStore::open(path);
        assert_eq!(store.get("abc").await, 2);
        store.reset("abc").await;
        assert_eq!(store.get("abc").await, 0);
    }

    #[tokio::test]
    async fn unusable_path_degrades_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let store = LocalTakeStore::open(blocker.join("takes.sqlite3"));
        assert!(store.is_degraded());

        assert_eq!(store.get("abc").await, 0);
        store.set("abc", 1).await;
        assert_eq!(store.get("abc").await, 1);
    }

    #[tokio::test]
    async fn failing_database_after_open_keeps_counting_in_memory() {
        let db = Database::open_in_memory().unwrap();
        let store = LocalTakeStore::with_database(db.clone());
        store.set("abc", 1).await;
        assert_eq!(store.get("abc").await, 1);
        assert!(!store.is_degraded());

        db.execute(|conn| {
            conn.execute_batch("DROP TABLE take_counters")?;
            Ok(())
        })
        .await
        .unwrap();

        store.set("abc", 2).await;
        assert!(store.is_degraded());
        assert_eq!(store.get("abc").await, 2);

        store.set("abc", 3).await;
        assert_eq!(store.get("abc").await, 3);
        store.reset("abc").await;
        assert_eq!(store.get("abc").await, 0);
    }
}
