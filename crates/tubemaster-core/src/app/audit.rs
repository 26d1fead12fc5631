//! ChannelAudit - チャンネル診断の実行と最新結果の保存

use crate::app::AppContext;
use crate::domain::{AuditResult, ChannelProfile, LogLevel, ProfileId};
use crate::error::{Result, TubeError};
use crate::ports::{ContentGenerator, StateStore};

pub struct ChannelAudit {
    ctx: AppContext,
}

impl ChannelAudit {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Audits the channel described by `channel_info` and keeps the result
    /// as the profile's latest audit.
    pub async fn run(&self, profile: &ChannelProfile, channel_info: &str) -> Result<AuditResult> {
        let channel_info = channel_info.trim();
        if channel_info.is_empty() {
            return Err(TubeError::EmptyInput("channel info"));
        }
        let Some(key) = profile.ai_credential() else {
            self.ctx.log(
                LogLevel::Error,
                format!("Missing Gemini API Key for profile {}.", profile.name),
            );
            return Err(TubeError::MissingCredential(profile.id));
        };

        let audit = self.ctx.generator.audit_channel(key, channel_info).await?;
        self.ctx.store.save_audit(profile.id, &audit).await?;

        self.ctx.log(
            LogLevel::Success,
            format!("Channel audit complete. Score: {}", audit.score.round()),
        );
        Ok(audit)
    }

    pub async fn latest(&self, profile: ProfileId) -> Result<Option<AuditResult>> {
        Ok(self.ctx.store.load_audit(profile).await?)
    }
}
