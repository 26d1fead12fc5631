//! Publisher port - 動画アップロードの抽象化
//!
//! 実際の YouTube API は使わない。`SimulatedPublisher` が遅延後に仮の video id を返す。

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::SheetRow;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("upload failed: {0}")]
pub struct PublishError(pub String);

/// Publish の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub video_id: String,
    pub published_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    /// Uploads an OPTIMIZED row. May take a while.
    async fn publish(&self, row: &SheetRow) -> Result<Publication, PublishError>;
}
