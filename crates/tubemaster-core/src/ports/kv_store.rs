//! KeyValueStore port - 文字列キー / JSON 文字列値のストア
//!
//! # 実装
//! - **MemoryKvStore**: テスト用
//! - **FileKvStore**: 1 キー 1 ファイル（CLI 用）

use thiserror::Error;

/// StoreError は永続化レイヤーのエラー
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Stored value exists but does not parse as the expected type.
    #[error("stored value for key {key} is unreadable: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode value for key {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}

impl StoreError {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, StoreError::Corrupt { .. })
    }
}

/// KeyValueStore はブラウザの localStorage 相当
///
/// # 設計原則
/// - 値は不透明な文字列（型付けは StateStore の責務）
/// - 書き込みはキー単位でアトミック
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Missing keys are not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}
