//! Planner - 1 プロファイル分の行キュー
//!
//! # 設計
//! - 行は tokio::Mutex<Vec<SheetRow>> に持ち、変更のたびに StateStore へ保存
//! - 処理スロットは 1 permit の Semaphore。パイプライン（最適化 → 待機 → 公開）の
//!   間ずっと permit を保持するので、PROCESSING / UPLOADING の行は常に高々 1 つ
//! - 手動実行と AutoPilot は同じスロットを取り合う
//!
//! # パイプライン
//! 1. PENDING/ERROR → PROCESSING
//! 2. optimize_row → OPTIMIZED（失敗なら ERROR）
//! 3. auto-upload 無効ならここで終了
//! 4. 待機（AutoPilot 中はプロファイルの upload delay、手動は短い固定値）
//! 5. UPLOADING → publish → PUBLISHED（失敗なら ERROR）

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex as SyncMutex;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

use crate::app::AppContext;
use crate::codec::{self, CsvError};
use crate::config::PlannerSettings;
use crate::domain::content::excerpt;
use crate::domain::row::first_pending;
use crate::domain::{
    ChannelProfile, Credential, LogLevel, ProfileId, RowId, SheetRow, TransitionError,
};
use crate::error::{Result, TubeError};
use crate::ports::{ContentGenerator, IdGenerator, Publisher, StateStore};

pub const SAMPLE_TOPICS: [&str; 3] = [
    "Đánh giá iPhone 15 Pro Max sau 6 tháng",
    "Hướng dẫn làm Affiliate Marketing Shopee",
    "Top 5 sách hay về tư duy làm giàu",
];

const INTERRUPTED_NOTE: &str = "Interrupted before completion";

/// User-adjustable switches of an open planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerOptions {
    pub auto_upload: bool,
    pub upload_delay_secs: u64,
}

#[derive(Clone)]
pub struct Planner {
    inner: Arc<Inner>,
}

struct Inner {
    ctx: AppContext,
    settings: PlannerSettings,
    profile: SyncMutex<ChannelProfile>,
    options: SyncMutex<PlannerOptions>,
    rows: Mutex<Vec<SheetRow>>,
    slot: Arc<Semaphore>,
    autopilot: AtomicBool,
}

impl Planner {
    /// Loads the profile's rows and logs the session header.
    pub async fn open(
        ctx: AppContext,
        settings: PlannerSettings,
        profile: ChannelProfile,
    ) -> Result<Self> {
        ctx.log(
            LogLevel::Info,
            format!("Initialized environment for profile: {}", profile.name),
        );

        let mut rows = match ctx.store.load_rows(profile.id).await {
            Ok(rows) => rows,
            Err(e) if e.is_corrupt() => {
                ctx.log(
                    LogLevel::Warning,
                    format!("Saved rows could not be read; starting with an empty list ({e})."),
                );
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        if !rows.is_empty() {
            ctx.log(
                LogLevel::Success,
                format!("Restored {} pending jobs from previous session.", rows.len()),
            );
        }

        let interrupted = recover_interrupted(&mut rows);
        if interrupted > 0 {
            ctx.log(
                LogLevel::Warning,
                format!("{interrupted} job(s) from the previous session were interrupted and marked ERROR."),
            );
            ctx.store.save_rows(profile.id, &rows).await?;
        }

        if profile.has_sheet_link() {
            ctx.log(
                LogLevel::Success,
                format!("Connected to Google Sheets [{}...]", excerpt(&profile.sheet_id, 6)),
            );
        } else {
            ctx.log(
                LogLevel::Warning,
                "MODE: Local File System (No Google Sheet linked)",
            );
        }

        let options = PlannerOptions {
            auto_upload: true,
            upload_delay_secs: profile.initial_upload_delay(),
        };

        Ok(Self {
            inner: Arc::new(Inner {
                ctx,
                settings,
                profile: SyncMutex::new(profile),
                options: SyncMutex::new(options),
                rows: Mutex::new(rows),
                slot: Arc::new(Semaphore::new(1)),
                autopilot: AtomicBool::new(false),
            }),
        })
    }

    pub fn settings(&self) -> PlannerSettings {
        self.inner.settings
    }

    pub fn profile(&self) -> ChannelProfile {
        self.inner.profile.lock().clone()
    }

    pub fn profile_id(&self) -> ProfileId {
        self.inner.profile.lock().id
    }

    /// Picks up edited settings (e.g. a newly entered API key) of the same profile.
    pub fn refresh_profile(&self, profile: ChannelProfile) {
        let mut current = self.inner.profile.lock();
        if current.id != profile.id {
            tracing::warn!(open = %current.id, given = %profile.id, "ignoring profile of another planner");
            return;
        }
        *current = profile;
    }

    pub fn options(&self) -> PlannerOptions {
        *self.inner.options.lock()
    }

    pub fn set_auto_upload(&self, enabled: bool) {
        self.inner.options.lock().auto_upload = enabled;
    }

    pub fn set_upload_delay(&self, secs: u64) {
        self.inner.options.lock().upload_delay_secs = secs;
    }

    /// A row pipeline currently holds the slot.
    pub fn is_busy(&self) -> bool {
        self.inner.slot.available_permits() == 0
    }

    pub fn is_autopilot_active(&self) -> bool {
        self.inner.autopilot.load(Ordering::SeqCst)
    }

    pub async fn rows(&self) -> Vec<SheetRow> {
        self.inner.rows.lock().await.clone()
    }

    pub async fn row(&self, id: RowId) -> Result<SheetRow> {
        self.inner
            .rows
            .lock()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(TubeError::RowNotFound(id))
    }

    pub async fn next_pending(&self) -> Option<RowId> {
        let rows = self.inner.rows.lock().await;
        first_pending(&rows).map(|i| rows[i].id)
    }

    // ========================================
    // Housekeeping
    // ========================================

    /// Appends one PENDING row per topic found in `text`.
    pub async fn import_csv(&self, text: &str) -> Result<usize> {
        let topics = match codec::parse_topics(text) {
            Ok(topics) => topics,
            Err(e) => {
                let message = match e {
                    CsvError::NoRows => "File is empty or invalid format.",
                    _ => "Error parsing CSV file.",
                };
                self.log(LogLevel::Error, message);
                return Err(e.into());
            }
        };

        let rows: Vec<SheetRow> = topics
            .into_iter()
            .map(|topic| SheetRow::pending(self.inner.ctx.ids.row_id(), topic))
            .collect();
        let count = rows.len();
        self.append_rows(rows).await?;

        self.log(
            LogLevel::Success,
            format!("Successfully imported {count} rows from CSV."),
        );
        Ok(count)
    }

    pub async fn export_csv(&self) -> Result<String> {
        let rows = self.inner.rows.lock().await;
        if rows.is_empty() {
            self.log(LogLevel::Warning, "Nothing to export.");
            return Err(TubeError::NothingToExport);
        }
        let text = codec::render_rows(&rows)?;
        self.log(LogLevel::Success, "Exported report successfully.");
        Ok(text)
    }

    pub async fn load_sample_data(&self) -> Result<usize> {
        let rows: Vec<SheetRow> = SAMPLE_TOPICS
            .iter()
            .map(|topic| SheetRow::pending(self.inner.ctx.ids.row_id(), *topic))
            .collect();
        let count = rows.len();
        self.append_rows(rows).await?;
        self.log(LogLevel::Info, format!("Loaded {count} sample rows."));
        Ok(count)
    }

    /// Removes every row. Refused while a row is in flight.
    pub async fn clear_all(&self) -> Result<usize> {
        let _permit = self
            .inner
            .slot
            .clone()
            .try_acquire_owned()
            .map_err(|_| TubeError::Busy)?;

        let mut rows = self.inner.rows.lock().await;
        let removed = rows.len();
        self.inner.ctx.store.save_rows(self.profile_id(), &[]).await?;
        rows.clear();
        self.log(LogLevel::Warning, "Cleared all rows.");
        Ok(removed)
    }

    /// Appends rows as given (status included) and saves.
    pub async fn append_rows(&self, new_rows: Vec<SheetRow>) -> Result<()> {
        let mut rows = self.inner.rows.lock().await;
        let mut next = rows.clone();
        next.extend(new_rows);
        self.inner.ctx.store.save_rows(self.profile_id(), &next).await?;
        *rows = next;
        Ok(())
    }

    // ========================================
    // Processing
    // ========================================

    /// Runs one PENDING or ERROR row through the pipeline.
    ///
    /// Fails without touching the row when the profile has no AI key or
    /// another row is in flight.
    pub async fn process_row(&self, id: RowId) -> Result<SheetRow> {
        let key = self.require_credential()?;
        let permit = self
            .inner
            .slot
            .clone()
            .try_acquire_owned()
            .map_err(|_| TubeError::Busy)?;
        self.run_pipeline(id, key, permit).await
    }

    pub(crate) fn try_claim_slot(&self) -> Option<OwnedSemaphorePermit> {
        self.inner.slot.clone().try_acquire_owned().ok()
    }

    /// Returns false when the auto-pilot was already marked active.
    pub(crate) fn begin_autopilot(&self) -> bool {
        !self.inner.autopilot.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn end_autopilot(&self) {
        self.inner.autopilot.store(false, Ordering::SeqCst);
    }

    pub(crate) fn require_credential(&self) -> Result<Credential> {
        let profile = self.inner.profile.lock();
        match profile.ai_credential() {
            Some(key) => Ok(key.clone()),
            None => {
                self.log(LogLevel::Error, "ERROR: Missing Gemini API Key. Process aborted.");
                Err(TubeError::MissingCredential(profile.id))
            }
        }
    }

    /// The pipeline. `_permit` is the slot and is held until this returns.
    pub(crate) async fn run_pipeline(
        &self,
        id: RowId,
        key: Credential,
        _permit: OwnedSemaphorePermit,
    ) -> Result<SheetRow> {
        let row = self.update_row(id, |r| r.start_processing()).await?;
        self.log(LogLevel::Info, format!(">>> START JOB [{id}]"));
        self.log(LogLevel::Info, format!("[{id}] Analyzing topic & keywords..."));

        let optimization = match self.inner.ctx.generator.optimize_row(&key, &row.topic).await {
            Ok(optimization) => optimization,
            Err(e) => {
                self.fail_row(id, &e.to_string()).await?;
                return Err(e.into());
            }
        };

        let row = self
            .update_row(id, |r| r.apply_optimization(&optimization))
            .await?;
        self.log(
            LogLevel::Success,
            format!(
                "[{id}] Optimization Complete. SEO Score: {}",
                row.seo_score.unwrap_or(0)
            ),
        );

        let options = self.options();
        if !options.auto_upload {
            self.log(
                LogLevel::Warning,
                format!("[{id}] Auto-upload disabled. Job finished."),
            );
            return Ok(row);
        }

        if self.is_autopilot_active() {
            self.log(
                LogLevel::Info,
                format!("[{id}] Cooldown {}s before upload...", options.upload_delay_secs),
            );
            tokio::time::sleep(Duration::from_secs(options.upload_delay_secs)).await;
        } else {
            tokio::time::sleep(self.inner.settings.manual_cooldown()).await;
        }

        let row = self.update_row(id, |r| r.start_upload()).await?;
        self.log(LogLevel::Info, format!("[{id}] Pushing to YouTube API..."));

        match self.inner.ctx.publisher.publish(&row).await {
            Ok(publication) => {
                let row = self
                    .update_row(id, |r| {
                        r.mark_published(publication.video_id.clone(), publication.published_at)
                    })
                    .await?;
                self.log(
                    LogLevel::Success,
                    format!("[{id}] PUBLISH SUCCESS. Video ID: {}", publication.video_id),
                );
                Ok(row)
            }
            Err(e) => {
                self.fail_row(id, &e.to_string()).await?;
                Err(e.into())
            }
        }
    }

    async fn fail_row(&self, id: RowId, message: &str) -> Result<()> {
        self.log(LogLevel::Error, format!("[{id}] FAILED: {message}"));
        self.update_row(id, |r| r.mark_error(message)).await?;
        Ok(())
    }

    /// Applies `f` to one row and saves. A failed save is logged, not returned.
    async fn update_row<F>(&self, id: RowId, f: F) -> Result<SheetRow>
    where
        F: FnOnce(&mut SheetRow) -> std::result::Result<(), TransitionError>,
    {
        let mut rows = self.inner.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(TubeError::RowNotFound(id))?;
        f(row)?;
        let updated = row.clone();

        if let Err(e) = self.inner.ctx.store.save_rows(self.profile_id(), &rows).await {
            tracing::warn!(error = %e, "failed to persist planner rows");
            self.log(LogLevel::Warning, format!("Could not save rows: {e}"));
        }
        Ok(updated)
    }

    pub(crate) fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.inner.ctx.log(level, message);
    }
}

/// Rows left PROCESSING/UPLOADING by a previous session go to ERROR.
fn recover_interrupted(rows: &mut [SheetRow]) -> usize {
    rows.iter_mut()
        .filter(|r| r.status.is_busy())
        .filter_map(|r| r.mark_error(INTERRUPTED_NOTE).ok())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{harness, harness_with, keyed_profile};
    use crate::domain::{ErrorKind, RowStatus};
    use crate::domain::row::busy_count;
    use crate::impls::kv_state_store::rows_key;
    use crate::ports::{Clock, KeyValueStore};

    async fn open(h: &crate::app::testing::Harness) -> Planner {
        h.app.open_planner(keyed_profile()).await.unwrap()
    }

    #[tokio::test]
    async fn imported_rows_start_pending_and_are_saved() {
        let h = harness();
        let planner = open(&h).await;
        planner.load_sample_data().await.unwrap();

        let n = planner
            .import_csv("topic,status\n\"Intro to sourdough\",x\n")
            .await
            .unwrap();
        assert_eq!(n, 1);

        let rows = planner.rows().await;
        assert_eq!(rows.len(), 4);
        let imported = &rows[3];
        assert_eq!(imported.topic, "Intro to sourdough");
        assert_eq!(imported.status, RowStatus::Pending);
        assert!(!imported.has_optimization());

        let stored = h.app.context().store.load_rows(planner.profile_id()).await.unwrap();
        assert_eq!(stored, rows);
        assert!(h.log.contains("Successfully imported 1 rows from CSV."));
    }

    #[tokio::test]
    async fn bad_import_and_empty_export_are_reported() {
        let h = harness();
        let planner = open(&h).await;

        assert!(matches!(
            planner.import_csv("topic\n").await,
            Err(TubeError::Csv(CsvError::NoRows))
        ));
        assert!(h.log.contains("File is empty or invalid format."));

        assert!(matches!(
            planner.export_csv().await,
            Err(TubeError::NothingToExport)
        ));
        assert!(h.log.contains("Nothing to export."));
    }

    #[tokio::test]
    async fn unbalanced_quote_import_adds_nothing() {
        let h = harness();
        let planner = open(&h).await;

        assert!(matches!(
            planner.import_csv("topic\n\"Bread, butter\nCoffee\n").await,
            Err(TubeError::Csv(CsvError::UnbalancedQuote { .. }))
        ));
        assert!(h.log.contains("Error parsing CSV file."));
        assert!(planner.rows().await.is_empty());
    }

    #[tokio::test]
    async fn stored_zero_delay_opens_with_default_cooldown() {
        let h = harness();
        let mut profile = keyed_profile();
        profile.auto_upload_delay = 0;
        let planner = h.app.open_planner(profile).await.unwrap();
        assert_eq!(
            planner.options().upload_delay_secs,
            crate::domain::profile::DEFAULT_UPLOAD_DELAY_SECS
        );

        planner.set_upload_delay(0);
        assert_eq!(planner.options().upload_delay_secs, 0);
    }

    #[tokio::test]
    async fn export_then_import_preserves_topics() {
        let h = harness();
        let planner = open(&h).await;
        planner.load_sample_data().await.unwrap();
        let csv = planner.export_csv().await.unwrap();

        let other = harness();
        let fresh = other.app.open_planner(keyed_profile()).await.unwrap();
        fresh.import_csv(&csv).await.unwrap();

        let topics: Vec<_> = fresh.rows().await.into_iter().map(|r| r.topic).collect();
        assert_eq!(topics, SAMPLE_TOPICS.to_vec());
    }

    #[tokio::test]
    async fn missing_credential_leaves_row_untouched() {
        let h = harness();
        let mut profile = keyed_profile();
        profile.gemini_api_key = Credential::default();
        let planner = h.app.open_planner(profile).await.unwrap();
        planner.load_sample_data().await.unwrap();
        let id = planner.rows().await[0].id;

        let err = planner.process_row(id).await.unwrap_err();
        assert!(err.is_missing_credential());
        assert_eq!(planner.row(id).await.unwrap().status, RowStatus::Pending);
        assert_eq!(h.generator.calls(), 0);
        assert!(h.log.contains("Missing Gemini API Key"));
    }

    #[tokio::test(start_paused = true)]
    async fn auto_upload_disabled_stops_at_optimized() {
        let h = harness();
        let planner = open(&h).await;
        planner.load_sample_data().await.unwrap();
        planner.set_auto_upload(false);
        let id = planner.rows().await[0].id;

        let row = planner.process_row(id).await.unwrap();
        assert_eq!(row.status, RowStatus::Optimized);
        assert!(row.optimized_title.is_some());
        assert!(row.video_id.is_none());
        assert!(h.log.contains("Auto-upload disabled. Job finished."));
        assert!(!planner.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn manual_run_publishes_after_cooldown() {
        let h = harness();
        let planner = open(&h).await;
        planner.load_sample_data().await.unwrap();
        let id = planner.rows().await[0].id;

        let started = tokio::time::Instant::now();
        let row = planner.process_row(id).await.unwrap();
        // manual cooldown 1s + simulated upload 1.5s
        assert!(started.elapsed() >= Duration::from_millis(2500));

        assert_eq!(row.status, RowStatus::Published);
        let video_id = row.video_id.unwrap();
        assert!(video_id.starts_with('v'));
        assert_eq!(video_id.len(), 6);
        assert_eq!(row.publish_date, Some(h.clock.now()));
    }

    #[tokio::test(start_paused = true)]
    async fn error_row_can_be_rerun() {
        let h = harness();
        let planner = open(&h).await;
        planner.load_sample_data().await.unwrap();
        planner.set_auto_upload(false);
        let id = planner.rows().await[0].id;

        h.generator.fail_next(ErrorKind::Quota);
        let err = planner.process_row(id).await.unwrap_err();
        assert!(matches!(err, TubeError::Generation(ref g) if g.kind == ErrorKind::Quota));
        let failed = planner.row(id).await.unwrap();
        assert_eq!(failed.status, RowStatus::Error);
        assert!(failed.logs.unwrap().starts_with("Quota exceeded"));

        let row = planner.process_row(id).await.unwrap();
        assert_eq!(row.status, RowStatus::Optimized);
        assert!(row.logs.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn publish_failure_marks_error() {
        let h = harness();
        let planner = open(&h).await;
        planner.load_sample_data().await.unwrap();
        let id = planner.rows().await[0].id;

        h.publisher.fail_next();
        let err = planner.process_row(id).await.unwrap_err();
        assert!(matches!(err, TubeError::Publish(_)));
        let row = planner.row(id).await.unwrap();
        assert_eq!(row.status, RowStatus::Error);
        assert!(row.optimized_title.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn second_run_while_busy_is_refused() {
        let h = harness();
        let _slow = h.generator.clone().with_latency(Duration::from_secs(5));
        let planner = open(&h).await;
        planner.load_sample_data().await.unwrap();
        planner.set_auto_upload(false);
        let rows = planner.rows().await;

        let first = tokio::spawn({
            let planner = planner.clone();
            let id = rows[0].id;
            async move { planner.process_row(id).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(planner.is_busy());
        assert_eq!(busy_count(&planner.rows().await), 1);
        assert!(matches!(
            planner.process_row(rows[1].id).await,
            Err(TubeError::Busy)
        ));
        assert!(matches!(planner.clear_all().await, Err(TubeError::Busy)));
        assert_eq!(planner.row(rows[1].id).await.unwrap().status, RowStatus::Pending);

        first.await.unwrap().unwrap();
        assert!(!planner.is_busy());
    }

    #[tokio::test]
    async fn finished_rows_are_not_rerun() {
        let h = harness();
        let planner = open(&h).await;
        let mut row = SheetRow::pending(h.app.context().ids.row_id(), "done");
        row.status = RowStatus::Published;
        let id = row.id;
        planner.append_rows(vec![row]).await.unwrap();

        let err = planner.process_row(id).await.unwrap_err();
        assert!(matches!(err, TubeError::InvalidTransition(_)));
        assert_eq!(planner.row(id).await.unwrap().status, RowStatus::Published);
        assert!(!planner.is_busy());
    }

    #[tokio::test]
    async fn reopen_recovers_interrupted_and_unreadable_rows() {
        let h = harness();
        let profile = keyed_profile();
        let planner = h.app.open_planner(profile.clone()).await.unwrap();
        let mut stuck = SheetRow::pending(h.app.context().ids.row_id(), "stuck");
        stuck.status = RowStatus::Uploading;
        planner.append_rows(vec![stuck]).await.unwrap();

        let reopened = h.app.open_planner(profile.clone()).await.unwrap();
        let row = &reopened.rows().await[0];
        assert_eq!(row.status, RowStatus::Error);
        assert_eq!(row.logs.as_deref(), Some(INTERRUPTED_NOTE));
        assert!(h.log.contains("Restored 1 pending jobs"));

        h.kv.put(&rows_key(profile.id), "[{oops".into()).await.unwrap();
        let reopened = h.app.open_planner(profile).await.unwrap();
        assert!(reopened.rows().await.is_empty());
        assert!(h.log.contains("could not be read"));
    }

    #[tokio::test]
    async fn clear_all_empties_store() {
        let h = harness_with(PlannerSettings::default());
        let planner = open(&h).await;
        planner.load_sample_data().await.unwrap();
        assert_eq!(planner.clear_all().await.unwrap(), 3);
        assert!(planner.rows().await.is_empty());
        let stored = h.app.context().store.load_rows(planner.profile_id()).await.unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn sheet_link_is_logged() {
        let h = harness();
        let mut profile = keyed_profile();
        profile.sheet_id = "1AbCdEfGhIj".into();
        h.app.open_planner(profile).await.unwrap();
        assert!(h.log.contains("Connected to Google Sheets [1AbCdE...]"));

        let h = harness();
        h.app.open_planner(keyed_profile()).await.unwrap();
        assert!(h.log.contains("No Google Sheet linked"));
    }
}
