//! Dashboard figures.

use serde::Serialize;

use super::{AuditResult, RowStatus, SavedScript, SheetRow, ProfileId};

/// Channel health band derived from the audit score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthBand {
    Good,
    Fair,
    Poor,
    /// No audit yet.
    Unknown,
}

impl HealthBand {
    pub fn from_score(score: Option<f64>) -> Self {
        match score {
            None => HealthBand::Unknown,
            Some(s) if s >= 80.0 => HealthBand::Good,
            Some(s) if s >= 50.0 => HealthBand::Fair,
            Some(_) => HealthBand::Poor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Rows neither PUBLISHED nor ERROR.
    pub pending_tasks: usize,
    pub scripts: usize,
    pub health_score: Option<f64>,
    pub health: HealthBand,
}

impl DashboardStats {
    pub fn compute(
        profile_id: ProfileId,
        rows: &[SheetRow],
        scripts: &[SavedScript],
        audit: Option<&AuditResult>,
    ) -> Self {
        let health_score = audit.map(|a| a.score);
        Self {
            pending_tasks: rows.iter().filter(|r| r.status.is_outstanding()).count(),
            scripts: scripts.iter().filter(|s| s.profile_id == profile_id).count(),
            health_score,
            health: HealthBand::from_score(health_score),
        }
    }
}

/// Per-status row counts.
pub fn status_counts(rows: &[SheetRow]) -> Vec<(RowStatus, usize)> {
    use RowStatus::*;
    [Pending, Processing, Optimized, ScriptReady, Uploading, Published, Error]
        .into_iter()
        .map(|s| (s, rows.iter().filter(|r| r.status == s).count()))
        .filter(|(_, n)| *n > 0)
        .collect()
}
