//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **MemoryKvStore** / **FileKvStore**: KeyValueStore（テスト用 / CLI 用）
//! - **KvStateStore**: KeyValueStore 上の StateStore
//! - **GeminiGenerator**: Gemini REST API
//! - **OfflineGenerator**: 決定的なダミー生成器
//! - **SimulatedPublisher**: 仮アップロード
//! - **ActivityLog**: メモリ上のログ + tracing

pub mod activity_log;
pub mod file_kv;
pub mod gemini;
pub mod kv_state_store;
pub mod memory_kv;
pub mod offline;
pub mod simulated_publisher;

// 主要な型を再エクスポート
pub use self::activity_log::ActivityLog;
pub use self::file_kv::FileKvStore;
pub use self::gemini::GeminiGenerator;
pub use self::kv_state_store::KvStateStore;
pub use self::memory_kv::MemoryKvStore;
pub use self::offline::OfflineGenerator;
pub use self::simulated_publisher::SimulatedPublisher;
