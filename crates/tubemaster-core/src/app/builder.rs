//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（必須の port が足りなければ build() で失敗する）

use std::sync::Arc;

use crate::app::{ChannelAudit, ContentStudio, Planner, ProfileService};
use crate::config::PlannerSettings;
use crate::domain::{ChannelProfile, DashboardStats, LogEntry, LogLevel, ProfileId};
use crate::error::Result;
use crate::impls::{ActivityLog, SimulatedPublisher};
use crate::ports::{
    Clock, ContentGenerator, EventSink, IdGenerator, Publisher, StateStore, SystemClock,
    UlidGenerator,
};

/// AppContext は各サービスが共有する port の束
///
/// 中身はすべて `Arc` なので clone は安い。
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn StateStore>,
    pub generator: Arc<dyn ContentGenerator>,
    pub publisher: Arc<dyn Publisher>,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdGenerator>,
    pub events: Arc<dyn EventSink>,
}

impl AppContext {
    /// アクティビティログに 1 行書く
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.events
            .emit(LogEntry::new(self.clock.now(), level, message));
    }
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing required component: {0}")]
    Missing(&'static str),
}

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new()
///     .store(Arc::new(KvStateStore::new(kv)))
///     .generator(Arc::new(OfflineGenerator::new()))
///     .build()?;
/// ```
///
/// # 既定値
/// - clock: SystemClock
/// - ids: UlidGenerator（clock と同じ時計）
/// - publisher: SimulatedPublisher（`publish_delay`）
/// - activity log: 空の ActivityLog
pub struct AppBuilder {
    store: Option<Arc<dyn StateStore>>,
    generator: Option<Arc<dyn ContentGenerator>>,
    publisher: Option<Arc<dyn Publisher>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    activity: ActivityLog,
    settings: PlannerSettings,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            generator: None,
            publisher: None,
            clock: None,
            ids: None,
            activity: ActivityLog::default(),
            settings: PlannerSettings::default(),
        }
    }

    pub fn store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn ContentGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn activity_log(mut self, log: ActivityLog) -> Self {
        self.activity = log;
        self
    }

    pub fn settings(mut self, settings: PlannerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// # 検証
    /// - store と generator は必須
    pub fn build(self) -> std::result::Result<App, BuildError> {
        let store = self.store.ok_or(BuildError::Missing("state store"))?;
        let generator = self.generator.ok_or(BuildError::Missing("content generator"))?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);
        let ids = self.ids.unwrap_or_else(|| {
            Arc::new(UlidGenerator::new(Arc::clone(&clock))) as Arc<dyn IdGenerator>
        });
        let publisher = self.publisher.unwrap_or_else(|| {
            Arc::new(SimulatedPublisher::new(
                Arc::clone(&clock),
                self.settings.publish_delay(),
            )) as Arc<dyn Publisher>
        });

        let ctx = AppContext {
            store,
            generator,
            publisher,
            clock,
            ids,
            events: Arc::new(self.activity.clone()),
        };

        Ok(App {
            ctx,
            activity: self.activity,
            settings: self.settings,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// App は各サービスの入口
pub struct App {
    ctx: AppContext,
    activity: ActivityLog,
    settings: PlannerSettings,
}

impl App {
    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    pub fn activity_log(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn settings(&self) -> PlannerSettings {
        self.settings
    }

    /// Loads (or seeds) the profile state.
    pub async fn profiles(&self) -> Result<ProfileService> {
        ProfileService::load(self.ctx.clone()).await
    }

    pub async fn open_planner(&self, profile: ChannelProfile) -> Result<Planner> {
        Planner::open(self.ctx.clone(), self.settings, profile).await
    }

    pub fn studio(&self) -> ContentStudio {
        ContentStudio::new(self.ctx.clone())
    }

    pub fn audit(&self) -> ChannelAudit {
        ChannelAudit::new(self.ctx.clone())
    }

    pub async fn dashboard(&self, profile: ProfileId) -> Result<DashboardStats> {
        crate::app::dashboard::dashboard(&self.ctx, profile).await
    }
}
