//! Shapes exchanged with the content generator.
//!
//! Field names follow the JSON the generator is asked to return (camelCase),
//! so the same types deserialize provider output and persist to the store.

use std::sync::LazyLock;

use base64::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Long-form video or a Short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VideoFormat {
    #[default]
    Long,
    Short,
}

/// Input for a script generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRequest {
    pub topic: String,
    pub tone: String,
    pub format: VideoFormat,
    /// YouTube video id used as a reference for a remix/reaction style script.
    pub related_video_id: Option<String>,
}

impl ContentRequest {
    pub fn new(topic: impl Into<String>, tone: impl Into<String>, format: VideoFormat) -> Self {
        Self {
            topic: topic.into(),
            tone: tone.into(),
            format,
            related_video_id: None,
        }
    }
}

/// Full script package returned by the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContent {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub script_outline: Vec<String>,
    #[serde(default)]
    pub hook: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_score: Option<f64>,
}

/// SEO metadata for one planner row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowOptimization {
    #[serde(default)]
    pub optimized_title: String,
    #[serde(default)]
    pub optimized_desc: String,
    /// Comma separated.
    #[serde(default)]
    pub keywords: String,
    #[serde(default)]
    pub seo_score: f64,
}

impl RowOptimization {
    /// Score clamped to 0..=100 and rounded.
    pub fn score(&self) -> u32 {
        self.seo_score.clamp(0.0, 100.0).round() as u32
    }
}

/// Channel health audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResult {
    pub score: f64,
    pub analysis: String,
    #[serde(default)]
    pub action_items: Vec<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitor_analysis: Option<String>,
}

/// Promotion copy per platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialPosts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
}

impl SocialPosts {
    pub fn is_empty(&self) -> bool {
        self.facebook.is_none() && self.twitter.is_none() && self.linkedin.is_none()
    }
}

/// A generated thumbnail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ThumbnailImage {
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    /// File extension matching the mime type.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            _ => "jpg",
        }
    }
}

/// Web page that grounded a trend lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendSource {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendReport {
    pub ideas: Vec<String>,
    pub sources: Vec<TrendSource>,
}

pub const MAX_TREND_IDEAS: usize = 5;

static NUMBERED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s*").expect("static regex"));

/// Extracts trend ideas from free text.
///
/// Takes lines shaped like `1. Idea`, strips the numbering and markdown bold,
/// keeps at most five. When no numbered line exists, falls back to the first
/// five lines longer than ten characters.
pub fn parse_trend_ideas(text: &str) -> Vec<String> {
    let numbered: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| NUMBERED_LINE.is_match(line))
        .map(|line| NUMBERED_LINE.replace(line, "").replace("**", "").trim().to_string())
        .take(MAX_TREND_IDEAS)
        .collect();

    if !numbered.is_empty() {
        return numbered;
    }

    text.lines()
        .filter(|line| line.chars().count() > 10)
        .map(|line| line.trim().to_string())
        .take(MAX_TREND_IDEAS)
        .collect()
}

/// Final prompt sent to the image model.
pub fn compose_image_prompt(prompt: &str, style: Option<&str>) -> String {
    let style_suffix = style
        .filter(|s| !s.trim().is_empty())
        .map(|s| format!(", {} style", s.trim()))
        .unwrap_or_default();
    format!(
        "{prompt}{style_suffix}, high quality, 8k resolution, youtube thumbnail, vivid colors, highly detailed"
    )
}

/// First `max_chars` characters of `text` (char-boundary safe).
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
