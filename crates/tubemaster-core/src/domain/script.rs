//! Saved scripts (content studio library).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::content::excerpt;
use super::{GeneratedContent, ProfileId, RowId, RowStatus, ScriptId, SheetRow, SocialPosts, VideoFormat};

/// Score given to rows pushed from the studio.
pub const PUSHED_ROW_SEO_SCORE: u32 = 90;
pub const PUSHED_ROW_NOTE: &str = "Imported from Content Studio";

const EXPORT_TITLE_CHARS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedScript {
    pub id: ScriptId,
    pub profile_id: ProfileId,
    #[serde(rename = "type")]
    pub format: VideoFormat,
    pub topic: String,
    pub title: String,
    pub description: String,
    /// Editable body: hook followed by the outline.
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_posts: Option<SocialPosts>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl SavedScript {
    pub fn from_generated(
        id: ScriptId,
        profile_id: ProfileId,
        topic: impl Into<String>,
        format: VideoFormat,
        generated: GeneratedContent,
        now: DateTime<Utc>,
    ) -> Self {
        let content = render_body(&generated.hook, &generated.script_outline);
        Self {
            id,
            profile_id,
            format,
            topic: topic.into(),
            title: generated.title,
            description: generated.description,
            content,
            tags: generated.tags,
            thumbnail_prompt: None,
            social_posts: None,
            created_at: now,
            last_modified: now,
        }
    }

    pub fn apply(&mut self, edit: ScriptEdit, now: DateTime<Utc>) {
        let ScriptEdit {
            title,
            description,
            content,
            tags,
            thumbnail_prompt,
            social_posts,
        } = edit;

        if let Some(v) = title {
            self.title = v;
        }
        if let Some(v) = description {
            self.description = v;
        }
        if let Some(v) = content {
            self.content = v;
        }
        if let Some(v) = tags {
            self.tags = v;
        }
        if let Some(v) = thumbnail_prompt {
            self.thumbnail_prompt = Some(v);
        }
        if let Some(v) = social_posts {
            self.social_posts = Some(v);
        }
        self.last_modified = now;
    }

    /// Planner row for this script. Already optimized, so it skips the optimizer.
    pub fn to_planner_row(&self, row_id: RowId) -> SheetRow {
        let mut row = SheetRow::pending(row_id, self.topic.clone());
        row.status = RowStatus::Optimized;
        row.optimized_title = Some(self.title.clone());
        row.optimized_desc = Some(self.description.clone());
        row.keywords = Some(self.tags.join(", "));
        row.seo_score = Some(PUSHED_ROW_SEO_SCORE);
        row.logs = Some(PUSHED_ROW_NOTE.to_string());
        row.linked_script_id = Some(self.id);
        row
    }

    /// Plain-text export.
    pub fn render_text(&self) -> String {
        format!(
            "TITLE: {}\n\nDESCRIPTION:\n{}\n\nTAGS: {}\n\nCONTENT:\n{}",
            self.title,
            self.description,
            self.tags.join(", "),
            self.content
        )
    }

    /// `<first 20 chars of title>.txt`, with path separators replaced.
    pub fn export_file_name(&self) -> String {
        let stem: String = excerpt(&self.title, EXPORT_TITLE_CHARS)
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
            .collect();
        let stem = stem.trim();
        if stem.is_empty() {
            format!("{}.txt", self.id)
        } else {
            format!("{stem}.txt")
        }
    }
}

fn render_body(hook: &str, outline: &[String]) -> String {
    format!("HOOK: {hook}\n\n{}", outline.join("\n\n"))
}

/// Fields a user can change on a saved script. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ScriptEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub thumbnail_prompt: Option<String>,
    pub social_posts: Option<SocialPosts>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ulid::Ulid;

    fn generated() -> GeneratedContent {
        GeneratedContent {
            title: "Bánh mì sourdough cho người mới bắt đầu".into(),
            description: "Step by step".into(),
            tags: vec!["bread".into(), "baking".into()],
            script_outline: vec!["Intro".into(), "Starter".into()],
            hook: "Your first loaf".into(),
            seo_score: Some(88.0),
        }
    }

    fn script() -> SavedScript {
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        SavedScript::from_generated(
            ScriptId::from_ulid(Ulid::new()),
            ProfileId::from_ulid(Ulid::new()),
            "sourdough",
            VideoFormat::Short,
            generated(),
            now,
        )
    }

    #[test]
    fn body_is_hook_then_outline() {
        let s = script();
        assert_eq!(s.content, "HOOK: Your first loaf\n\nIntro\n\nStarter");
        assert_eq!(s.created_at, s.last_modified);
    }

    #[test]
    fn pushed_row_is_optimized_and_linked() {
        let s = script();
        let row = s.to_planner_row(RowId::from_ulid(Ulid::new()));
        assert_eq!(row.status, RowStatus::Optimized);
        assert_eq!(row.keywords.as_deref(), Some("bread, baking"));
        assert_eq!(row.seo_score, Some(90));
        assert_eq!(row.logs.as_deref(), Some("Imported from Content Studio"));
        assert_eq!(row.linked_script_id, Some(s.id));
    }

    #[test]
    fn text_export_layout_and_file_name() {
        let s = script();
        let text = s.render_text();
        assert!(text.starts_with("TITLE: Bánh mì sourdough"));
        assert!(text.contains("\n\nTAGS: bread, baking\n\nCONTENT:\nHOOK:"));
        assert_eq!(s.export_file_name(), "Bánh mì sourdough ch.txt");
    }

    #[test]
    fn edit_updates_last_modified() {
        let mut s = script();
        let later = s.created_at + chrono::Duration::minutes(5);
        s.apply(
            ScriptEdit {
                title: Some("New".into()),
                thumbnail_prompt: Some("chef with bread".into()),
                ..Default::default()
            },
            later,
        );
        assert_eq!(s.title, "New");
        assert_eq!(s.description, "Step by step");
        assert_eq!(s.last_modified, later);
    }

    #[test]
    fn format_is_stored_under_type() {
        let json = serde_json::to_value(script()).unwrap();
        assert_eq!(json["type"], "SHORT");
        assert!(json.get("socialPosts").is_none());
    }
}
