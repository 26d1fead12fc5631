//! KvStateStore - KeyValueStore の上に JSON で型付き保存する StateStore
//!
//! # キー
//! - `tubeMasterSystem_v2`: SystemState
//! - `tm_sheet_<profileId>`: planner 行
//! - `tm_saved_scripts`: 全プロファイルの台本
//! - `tm_audit_<profileId>`: 最新の監査結果

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::{AuditResult, ProfileId, SavedScript, SheetRow, SystemState};
use crate::ports::{KeyValueStore, StateStore, StoreError};

pub const SYSTEM_KEY: &str = "tubeMasterSystem_v2";
pub const SCRIPTS_KEY: &str = "tm_saved_scripts";

pub fn rows_key(profile: ProfileId) -> String {
    format!("tm_sheet_{profile}")
}

pub fn audit_key(profile: ProfileId) -> String {
    format!("tm_audit_{profile}")
}

#[derive(Clone)]
pub struct KvStateStore {
    kv: Arc<dyn KeyValueStore>,
}

impl KvStateStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.kv.get(key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                key: key.to_string(),
                source,
            })
    }

    async fn write<T: Serialize + ?Sized + Sync>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.kv.put(key, raw).await
    }
}

#[async_trait::async_trait]
impl StateStore for KvStateStore {
    async fn load_system(&self) -> Result<Option<SystemState>, StoreError> {
        self.read(SYSTEM_KEY).await
    }

    async fn save_system(&self, state: &SystemState) -> Result<(), StoreError> {
        self.write(SYSTEM_KEY, state).await
    }

    async fn load_rows(&self, profile: ProfileId) -> Result<Vec<SheetRow>, StoreError> {
        Ok(self.read(&rows_key(profile)).await?.unwrap_or_default())
    }

    async fn save_rows(&self, profile: ProfileId, rows: &[SheetRow]) -> Result<(), StoreError> {
        self.write(&rows_key(profile), rows).await
    }

    async fn load_scripts(&self) -> Result<Vec<SavedScript>, StoreError> {
        Ok(self.read(SCRIPTS_KEY).await?.unwrap_or_default())
    }

    async fn save_scripts(&self, scripts: &[SavedScript]) -> Result<(), StoreError> {
        self.write(SCRIPTS_KEY, scripts).await
    }

    async fn load_audit(&self, profile: ProfileId) -> Result<Option<AuditResult>, StoreError> {
        self.read(&audit_key(profile)).await
    }

    async fn save_audit(&self, profile: ProfileId, audit: &AuditResult) -> Result<(), StoreError> {
        self.write(&audit_key(profile), audit).await
    }
}
