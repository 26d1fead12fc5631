//! EventSink port - アクティビティログの記録先
//!
//! # 実装
//! - ActivityLog: メモリ上のリングバッファ + tracing

use crate::domain::LogEntry;

/// EventSink はアクティビティログを受け取る
///
/// 同期 API。ログを書くために await を挟まない。
pub trait EventSink: Send + Sync {
    fn emit(&self, entry: LogEntry);
}
