//! AutoPilot - PENDING 行を 1 件ずつ自動で流すループ
//!
//! # 動作
//! - poll 間隔ごとに tick（最初の tick は 1 周期後）
//! - スロットが埋まっていればその tick は何もしない
//! - PENDING 行がなければ "QUEUE EMPTY" を出して終了
//! - AI キーがなければ停止
//! - パイプラインはループ内で await するので、実行中に次の行は取らない
//!
//! # 停止
//! - `request_stop` は新しい行を取らなくするだけ。実行中の行は最後まで走る

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::app::Planner;
use crate::domain::LogLevel;
use crate::error::{Result, TubeError};

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoPilotExit {
    QueueEmpty,
    Stopped,
    MissingCredential,
}

/// Handle to a running auto-pilot.
/// - `request_stop()` で停止を要求
/// - `join()` で終了理由を受け取る
pub struct AutoPilot {
    planner: Planner,
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<AutoPilotExit>,
}

impl AutoPilot {
    /// Engages the auto-pilot on `planner`. Only one may run per planner.
    pub fn start(planner: Planner) -> Result<Self> {
        if !planner.begin_autopilot() {
            return Err(TubeError::AutoPilotRunning);
        }
        planner.log(LogLevel::Warning, ">>> SYSTEM AUTO-PILOT ENGAGED");

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let task_planner = planner.clone();
        let join = tokio::spawn(async move {
            let exit = autopilot_loop(&task_planner, &mut stop_rx).await;
            task_planner.end_autopilot();
            tracing::info!(profile = %task_planner.profile_id(), ?exit, "auto-pilot finished");
            exit
        });

        Ok(Self {
            planner,
            stop_tx,
            join,
        })
    }

    /// Stop taking new rows. The row in flight, if any, still completes.
    pub fn request_stop(&self) {
        // receiver is gone once the loop has exited
        let _ = self.stop_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub async fn stop(self) -> AutoPilotExit {
        self.request_stop();
        self.join().await
    }

    /// Waits for the loop to end on its own (queue drained or missing key).
    pub async fn join(self) -> AutoPilotExit {
        match self.join.await {
            Ok(exit) => exit,
            Err(e) => {
                tracing::error!(error = %e, "auto-pilot task aborted");
                self.planner.end_autopilot();
                AutoPilotExit::Stopped
            }
        }
    }
}

async fn autopilot_loop(planner: &Planner, stop_rx: &mut watch::Receiver<bool>) -> AutoPilotExit {
    let period = planner.settings().poll_interval().max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        if *stop_rx.borrow() {
            planner.log(LogLevel::Info, "Auto-pilot stopped.");
            return AutoPilotExit::Stopped;
        }

        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() {
                    // handle dropped
                    return AutoPilotExit::Stopped;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        let Some(permit) = planner.try_claim_slot() else {
            tracing::debug!("slot busy, skipping tick");
            continue;
        };

        let Some(id) = planner.next_pending().await else {
            planner.log(LogLevel::Success, ">>> QUEUE EMPTY. AUTO-PILOT DISENGAGED.");
            return AutoPilotExit::QueueEmpty;
        };

        let Ok(key) = planner.require_credential() else {
            return AutoPilotExit::MissingCredential;
        };

        if let Err(e) = planner.run_pipeline(id, key, permit).await {
            tracing::warn!(row = %id, error = %e, "auto-pilot row failed");
        }
    }
}
