//! MemoryKvStore - テスト用のキー・バリューストア
//!
//! # 実装詳細
//! - HashMap<String, String> を parking_lot::Mutex で保護
//! - ロックは await を跨がない（各メソッド内で完結）

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::ports::{KeyValueStore, StoreError};

/// MemoryKvStore はプロセス内だけで生きるストア
///
/// `Clone` は同じ中身を共有する（テストで書き込みを覗くため）。
#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value, bypassing the async API.
    pub fn snapshot(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.entries.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_remove() {
        let store = MemoryKvStore::new();
        assert_eq!(store.get("a").await.unwrap(), None);

        store.put("a", "1".into()).await.unwrap();
        store.put("a", "2".into()).await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("2"));

        store.remove("a").await.unwrap();
        store.remove("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let store = MemoryKvStore::new();
        let view = store.clone();
        store.put("k", "v".into()).await.unwrap();
        assert_eq!(view.snapshot("k").as_deref(), Some("v"));
        assert_eq!(view.keys(), vec!["k".to_string()]);
    }
}
