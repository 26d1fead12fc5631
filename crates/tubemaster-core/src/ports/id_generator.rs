//! IdGenerator port - ID 生成の抽象化
//!
//! テスト容易性のために trait として抽象化しています。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use ulid::Ulid;

use crate::domain::ids::{Id, IdMarker, ProfileId, RowId, ScriptId};
use crate::ports::Clock;

/// IdGenerator は profile / row / script の ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（auto-pilot タスクからも使う）
pub trait IdGenerator: Send + Sync {
    fn profile_id(&self) -> ProfileId;

    fn row_id(&self) -> RowId;

    fn script_id(&self) -> ScriptId;
}

/// UlidGenerator は Clock の時刻をタイムスタンプ部に使う ULID 生成器
///
/// FixedClock を渡すと timestamp 部分が決定的になります。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next<T: IdMarker>(&self) -> Id<T> {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Id::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn profile_id(&self) -> ProfileId {
        self.next()
    }

    fn row_id(&self) -> RowId {
        self.next()
    }

    fn script_id(&self) -> ScriptId {
        self.next()
    }
}
