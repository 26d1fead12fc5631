//! Dashboard figures for one profile.

use crate::app::AppContext;
use crate::domain::{DashboardStats, ProfileId};
use crate::error::Result;
use crate::ports::StateStore;

/// Reads rows, scripts and the latest audit and aggregates them.
/// Unreadable rows or scripts count as empty.
pub async fn dashboard(ctx: &AppContext, profile: ProfileId) -> Result<DashboardStats> {
    let rows = match ctx.store.load_rows(profile).await {
        Ok(rows) => rows,
        Err(e) if e.is_corrupt() => {
            tracing::warn!(%profile, error = %e, "rows unreadable, counted as empty");
            Vec::new()
        }
        Err(e) => return Err(e.into()),
    };
    let scripts = match ctx.store.load_scripts().await {
        Ok(scripts) => scripts,
        Err(e) if e.is_corrupt() => {
            tracing::warn!(error = %e, "scripts unreadable, counted as empty");
            Vec::new()
        }
        Err(e) => return Err(e.into()),
    };
    let audit = ctx.store.load_audit(profile).await?;

    Ok(DashboardStats::compute(profile, &rows, &scripts, audit.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{harness, keyed_profile};
    use crate::domain::{ContentRequest, HealthBand, RowStatus, SheetRow, VideoFormat};
    use crate::impls::kv_state_store::rows_key;
    use crate::ports::{IdGenerator, KeyValueStore};

    #[tokio::test]
    async fn counts_outstanding_rows_scripts_and_health() {
        let h = harness();
        let profile = keyed_profile();
        let planner = h.app.open_planner(profile.clone()).await.unwrap();
        planner.load_sample_data().await.unwrap();

        let ids = &h.app.context().ids;
        let mut published = SheetRow::pending(ids.row_id(), "done");
        published.status = RowStatus::Published;
        let mut failed = SheetRow::pending(ids.row_id(), "failed");
        failed.status = RowStatus::Error;
        planner.append_rows(vec![published, failed]).await.unwrap();

        h.app
            .studio()
            .generate(&profile, ContentRequest::new("Tea", "calm", VideoFormat::Short))
            .await
            .unwrap();

        let stats = h.app.dashboard(profile.id).await.unwrap();
        assert_eq!(stats.pending_tasks, 3);
        assert_eq!(stats.scripts, 1);
        assert_eq!(stats.health, HealthBand::Unknown);

        let audit = h.app.audit().run(&profile, "channel").await.unwrap();
        let stats = h.app.dashboard(profile.id).await.unwrap();
        assert_eq!(stats.health_score, Some(audit.score));
        assert_eq!(stats.health, HealthBand::from_score(Some(audit.score)));
    }

    #[tokio::test]
    async fn unreadable_rows_count_as_empty() {
        let h = harness();
        let profile = keyed_profile();
        h.kv.put(&rows_key(profile.id), "not json".into()).await.unwrap();
        let stats = h.app.dashboard(profile.id).await.unwrap();
        assert_eq!(stats.pending_tasks, 0);
    }
}
