//! Planner row record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RowId, RowOptimization, RowStatus, ScriptId};

/// Rejected status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("row cannot move from {from} to {to}")]
pub struct TransitionError {
    pub from: RowStatus,
    pub to: RowStatus,
}

/// One topic in the planner.
///
/// Design:
/// - All status changes go through the methods here.
/// - `logs` holds the last error text (or an import note), not a history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRow {
    pub id: RowId,
    pub topic: String,
    pub status: RowStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimized_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimized_desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_score: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_script_id: Option<ScriptId>,
}

impl SheetRow {
    /// A fresh PENDING row.
    pub fn pending(id: RowId, topic: impl Into<String>) -> Self {
        Self {
            id,
            topic: topic.into(),
            status: RowStatus::Pending,
            optimized_title: None,
            optimized_desc: None,
            keywords: None,
            seo_score: None,
            video_id: None,
            publish_date: None,
            logs: None,
            linked_script_id: None,
        }
    }

    pub fn has_optimization(&self) -> bool {
        self.optimized_title.is_some()
            || self.optimized_desc.is_some()
            || self.keywords.is_some()
            || self.seo_score.is_some()
    }

    /// Move to `next` if the state machine allows it.
    pub fn transition(&mut self, next: RowStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// PENDING/ERROR -> PROCESSING. Clears the previous error text.
    pub fn start_processing(&mut self) -> Result<(), TransitionError> {
        self.transition(RowStatus::Processing)?;
        self.logs = None;
        Ok(())
    }

    /// PROCESSING -> OPTIMIZED with the generated metadata.
    pub fn apply_optimization(&mut self, opt: &RowOptimization) -> Result<(), TransitionError> {
        self.transition(RowStatus::Optimized)?;
        self.optimized_title = Some(opt.optimized_title.clone());
        self.optimized_desc = Some(opt.optimized_desc.clone());
        self.keywords = Some(opt.keywords.clone());
        self.seo_score = Some(opt.score());
        Ok(())
    }

    pub fn start_upload(&mut self) -> Result<(), TransitionError> {
        self.transition(RowStatus::Uploading)
    }

    /// UPLOADING -> PUBLISHED.
    pub fn mark_published(
        &mut self,
        video_id: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.transition(RowStatus::Published)?;
        self.video_id = Some(video_id.into());
        self.publish_date = Some(at);
        Ok(())
    }

    /// PROCESSING/UPLOADING -> ERROR, keeping the message on the row.
    pub fn mark_error(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(RowStatus::Error)?;
        self.logs = Some(message.into());
        Ok(())
    }
}

/// Index of the first row eligible for the auto-pilot.
pub fn first_pending(rows: &[SheetRow]) -> Option<usize> {
    rows.iter().position(|r| r.status == RowStatus::Pending)
}

/// Number of rows currently holding the in-flight slot.
pub fn busy_count(rows: &[SheetRow]) -> usize {
    rows.iter().filter(|r| r.status.is_busy()).count()
}
