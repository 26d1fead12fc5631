//! ContentStudio - 台本の生成と保存済み台本の編集
//!
//! 台本は全プロファイル分を 1 つのリストとして保存する（新しいものが先頭）。
//! 読み出しはプロファイルで絞り込む。

use tokio::sync::Mutex;

use crate::app::{AppContext, Planner};
use crate::domain::content::excerpt;
use crate::domain::{
    ChannelProfile, ContentRequest, Credential, LogLevel, ProfileId, SavedScript, ScriptEdit,
    ScriptId, SheetRow, SocialPosts, ThumbnailImage, TrendReport,
};
use crate::error::{Result, TubeError};
use crate::ports::{Clock, ContentGenerator, IdGenerator, StateStore};

/// Longest excerpt handed to the generator for thumbnails and social posts.
pub const EXCERPT_CHARS: usize = 300;

pub struct ContentStudio {
    ctx: AppContext,
    // serializes read-modify-write of the script list
    write: Mutex<()>,
}

impl ContentStudio {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            write: Mutex::new(()),
        }
    }

    /// Scripts owned by `profile`, newest first.
    pub async fn scripts(&self, profile: ProfileId) -> Result<Vec<SavedScript>> {
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .filter(|s| s.profile_id == profile)
            .collect())
    }

    pub async fn script(&self, id: ScriptId) -> Result<SavedScript> {
        self.load_all()
            .await?
            .into_iter()
            .find(|s| s.id == id)
            .ok_or(TubeError::ScriptNotFound(id))
    }

    /// Generates a script package and stores it at the front of the list.
    pub async fn generate(
        &self,
        profile: &ChannelProfile,
        request: ContentRequest,
    ) -> Result<SavedScript> {
        let topic = request.topic.trim();
        if topic.is_empty() {
            return Err(TubeError::EmptyInput("topic"));
        }
        let key = self.credential(profile)?;

        self.ctx.log(LogLevel::Info, format!("Generating script for \"{topic}\"..."));
        let generated = self.ctx.generator.generate_content(&key, &request).await?;

        let script = SavedScript::from_generated(
            self.ctx.ids.script_id(),
            profile.id,
            topic,
            request.format,
            generated,
            self.ctx.clock.now(),
        );

        let _guard = self.write.lock().await;
        let mut scripts = self.load_all().await?;
        scripts.insert(0, script.clone());
        self.ctx.store.save_scripts(&scripts).await?;

        self.ctx.log(
            LogLevel::Success,
            format!("Script saved: {}", script.title),
        );
        Ok(script)
    }

    pub async fn save_edits(&self, id: ScriptId, edit: ScriptEdit) -> Result<SavedScript> {
        let now = self.ctx.clock.now();
        self.modify(id, |script| script.apply(edit, now)).await
    }

    pub async fn delete(&self, id: ScriptId) -> Result<()> {
        let _guard = self.write.lock().await;
        let mut scripts = self.load_all().await?;
        let before = scripts.len();
        scripts.retain(|s| s.id != id);
        if scripts.len() == before {
            return Err(TubeError::ScriptNotFound(id));
        }
        self.ctx.store.save_scripts(&scripts).await?;
        tracing::info!(script = %id, "script deleted");
        Ok(())
    }

    /// Appends the script to the planner as an already OPTIMIZED row.
    pub async fn push_to_planner(&self, id: ScriptId, planner: &Planner) -> Result<SheetRow> {
        let script = self.script(id).await?;
        let row = script.to_planner_row(self.ctx.ids.row_id());
        planner.append_rows(vec![row.clone()]).await?;
        self.ctx.log(
            LogLevel::Success,
            format!("Pushed \"{}\" to the planner.", script.title),
        );
        Ok(row)
    }

    pub async fn suggest_thumbnails(
        &self,
        profile: &ChannelProfile,
        id: ScriptId,
        style: &str,
    ) -> Result<Vec<String>> {
        let key = self.credential(profile)?;
        let script = self.script(id).await?;
        let ideas = self
            .ctx
            .generator
            .thumbnail_ideas(
                &key,
                &script.title,
                excerpt(&script.content, EXCERPT_CHARS),
                style,
            )
            .await?;
        Ok(ideas)
    }

    /// Renders a thumbnail. Without `prompt` the script's stored prompt (or its
    /// title) is used; the prompt used is stored on the script.
    pub async fn render_thumbnail(
        &self,
        profile: &ChannelProfile,
        id: ScriptId,
        prompt: Option<String>,
        style: Option<&str>,
    ) -> Result<ThumbnailImage> {
        let key = self.credential(profile)?;
        let script = self.script(id).await?;
        let prompt = prompt
            .filter(|p| !p.trim().is_empty())
            .or(script.thumbnail_prompt)
            .unwrap_or(script.title);

        let image = self
            .ctx
            .generator
            .thumbnail_image(&key, &prompt, style)
            .await?;

        self.save_edits(
            id,
            ScriptEdit {
                thumbnail_prompt: Some(prompt),
                ..Default::default()
            },
        )
        .await?;
        Ok(image)
    }

    pub async fn generate_social_posts(
        &self,
        profile: &ChannelProfile,
        id: ScriptId,
    ) -> Result<SocialPosts> {
        let key = self.credential(profile)?;
        let script = self.script(id).await?;
        let posts = self
            .ctx
            .generator
            .social_posts(
                &key,
                &script.title,
                excerpt(&script.description, EXCERPT_CHARS),
            )
            .await?;

        self.save_edits(
            id,
            ScriptEdit {
                social_posts: Some(posts.clone()),
                ..Default::default()
            },
        )
        .await?;
        Ok(posts)
    }

    /// Rewrites the description in the profile's default tone and stores it.
    pub async fn rewrite_description(
        &self,
        profile: &ChannelProfile,
        id: ScriptId,
    ) -> Result<String> {
        let key = self.credential(profile)?;
        let script = self.script(id).await?;
        let description = self
            .ctx
            .generator
            .rewrite_description(&key, &script.title, &script.tags, &profile.default_tone)
            .await?;

        self.save_edits(
            id,
            ScriptEdit {
                description: Some(description.clone()),
                ..Default::default()
            },
        )
        .await?;
        Ok(description)
    }

    pub async fn find_trends(&self, profile: &ChannelProfile, niche: &str) -> Result<TrendReport> {
        let niche = niche.trim();
        if niche.is_empty() {
            return Err(TubeError::EmptyInput("niche"));
        }
        let key = self.credential(profile)?;
        let report = self.ctx.generator.trending_ideas(&key, niche).await?;
        self.ctx.log(
            LogLevel::Info,
            format!("Found {} trend ideas for \"{niche}\".", report.ideas.len()),
        );
        Ok(report)
    }

    /// `(file name, text)` of the plain-text export.
    pub async fn export_text(&self, id: ScriptId) -> Result<(String, String)> {
        let script = self.script(id).await?;
        Ok((script.export_file_name(), script.render_text()))
    }

    fn credential(&self, profile: &ChannelProfile) -> Result<Credential> {
        match profile.ai_credential() {
            Some(key) => Ok(key.clone()),
            None => {
                self.ctx.log(
                    LogLevel::Error,
                    format!("Missing Gemini API Key for profile {}.", profile.name),
                );
                Err(TubeError::MissingCredential(profile.id))
            }
        }
    }

    async fn load_all(&self) -> Result<Vec<SavedScript>> {
        match self.ctx.store.load_scripts().await {
            Ok(scripts) => Ok(scripts),
            Err(e) if e.is_corrupt() => {
                self.ctx.log(
                    LogLevel::Warning,
                    format!("Saved scripts could not be read; starting with an empty library ({e})."),
                );
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn modify<F>(&self, id: ScriptId, f: F) -> Result<SavedScript>
    where
        F: FnOnce(&mut SavedScript),
    {
        let _guard = self.write.lock().await;
        let mut scripts = self.load_all().await?;
        let script = scripts
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(TubeError::ScriptNotFound(id))?;
        f(script);
        let updated = script.clone();
        self.ctx.store.save_scripts(&scripts).await?;
        Ok(updated)
    }
}
