//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部（ストレージ、生成 AI、アップロード先）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - 永続化は KeyValueStore（localStorage 相当）+ 型付きの StateStore
//! - 生成 AI は不透明な request/response（ContentGenerator）
//! - 時刻と ID は差し替え可能（Clock / IdGenerator）

pub mod clock;
pub mod content_generator;
pub mod event_sink;
pub mod id_generator;
pub mod kv_store;
pub mod publisher;
pub mod state_store;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::content_generator::{ContentGenerator, GenResult};
pub use self::event_sink::EventSink;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::kv_store::{KeyValueStore, StoreError};
pub use self::publisher::{Publication, PublishError, Publisher};
pub use self::state_store::StateStore;
