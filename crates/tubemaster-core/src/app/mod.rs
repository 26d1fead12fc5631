//! App - アプリケーション層
//!
//! ports を組み合わせてユースケースを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder / App**: ワイヤリングと各サービスの入口
//! - **ProfileService**: チャンネルプロファイルの管理
//! - **Planner**: 行キューと単発処理（処理スロットは 1 つ）
//! - **AutoPilot**: PENDING 行を順に流すループ
//! - **ContentStudio**: 台本の生成・編集・書き出し
//! - **ChannelAudit**: チャンネル診断
//! - **dashboard**: 集計

pub mod audit;
pub mod autopilot;
pub mod builder;
pub mod dashboard;
pub mod planner;
pub mod profiles;
pub mod studio;

#[cfg(test)]
pub(crate) mod testing;

// 主要な型を再エクスポート
pub use self::audit::ChannelAudit;
pub use self::autopilot::{AutoPilot, AutoPilotExit};
pub use self::builder::{App, AppBuilder, AppContext, BuildError};
pub use self::planner::{Planner, PlannerOptions, SAMPLE_TOPICS};
pub use self::profiles::ProfileService;
pub use self::studio::ContentStudio;
