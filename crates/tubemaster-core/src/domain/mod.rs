//! Domain model (IDs, rows, profiles, scripts, generator payloads).
//!
//! I/O を持たない純粋な型とルールだけを置く。
//! - ids: 型付き ID
//! - state / row: planner 行の状態機械と行レコード
//! - profile: チャンネル設定と SystemState
//! - script: Content Studio の保存済み台本
//! - content: 生成 API とやり取りする型
//! - stats: ダッシュボード集計
//! - errors: 生成 API のエラー分類
//! - events: アクティビティログ

pub mod content;
pub mod errors;
pub mod events;
pub mod ids;
pub mod profile;
pub mod row;
pub mod script;
pub mod state;
pub mod stats;

pub use self::content::{
    AuditResult, ContentRequest, GeneratedContent, RowOptimization, SocialPosts, ThumbnailImage,
    TrendReport, TrendSource, VideoFormat,
};
pub use self::errors::{ErrorKind, GenerationError};
pub use self::events::{LogEntry, LogLevel};
pub use self::ids::{IdParseError, ProfileId, RowId, ScriptId};
pub use self::profile::{ChannelProfile, Credential, ProfileUpdate, SystemState};
pub use self::row::{SheetRow, TransitionError};
pub use self::script::{SavedScript, ScriptEdit};
pub use self::state::RowStatus;
pub use self::stats::{DashboardStats, HealthBand};
