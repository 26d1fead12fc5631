//! StateStore port - エンティティ単位の型付き永続化
//!
//! # 実装
//! - **KvStateStore**: KeyValueStore の上に JSON で保存

use crate::domain::{AuditResult, ProfileId, SavedScript, SheetRow, SystemState};
use crate::ports::StoreError;

/// StateStore はアプリの全状態の読み書き口
///
/// # 読み込みの約束
/// - 未保存 → `Ok(None)`（または空リスト）
/// - 壊れた値 → `Err(StoreError::Corrupt)`。回復方針は呼び出し側が決める
#[async_trait::async_trait]
pub trait StateStore: Send + Sync {
    async fn load_system(&self) -> Result<Option<SystemState>, StoreError>;

    async fn save_system(&self, state: &SystemState) -> Result<(), StoreError>;

    /// Planner rows of one profile, in display order.
    async fn load_rows(&self, profile: ProfileId) -> Result<Vec<SheetRow>, StoreError>;

    async fn save_rows(&self, profile: ProfileId, rows: &[SheetRow]) -> Result<(), StoreError>;

    /// Scripts of every profile, newest first.
    async fn load_scripts(&self) -> Result<Vec<SavedScript>, StoreError>;

    async fn save_scripts(&self, scripts: &[SavedScript]) -> Result<(), StoreError>;

    async fn load_audit(&self, profile: ProfileId) -> Result<Option<AuditResult>, StoreError>;

    async fn save_audit(&self, profile: ProfileId, audit: &AuditResult) -> Result<(), StoreError>;
}
