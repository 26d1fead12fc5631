//! OfflineGenerator - API を呼ばない決定的な ContentGenerator
//!
//! `--offline` の CLI 実行とテストで使う。出力は入力文字列だけから決まる。
//!
//! # テスト用の仕掛け
//! - `fail_next`: 次の呼び出しを指定した ErrorKind で失敗させる（FIFO）
//! - `with_latency`: 各呼び出しの前に tokio::time::sleep を挟む
//! - `calls`: 呼び出し回数

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::domain::content::compose_image_prompt;
use crate::domain::{
    AuditResult, ContentRequest, Credential, ErrorKind, GeneratedContent, GenerationError,
    RowOptimization, SocialPosts, ThumbnailImage, TrendReport, TrendSource, VideoFormat,
};
use crate::ports::{ContentGenerator, GenResult};

/// Smallest valid JPEG header + end marker; enough for a file viewer to detect the type.
const PLACEHOLDER_JPEG: [u8; 4] = [0xff, 0xd8, 0xff, 0xd9];

#[derive(Debug, Clone, Default)]
pub struct OfflineGenerator {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    failures: Mutex<VecDeque<ErrorKind>>,
    latency: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl OfflineGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(self, latency: Duration) -> Self {
        *self.inner.latency.lock() = Some(latency);
        self
    }

    /// Queue a failure for the next call.
    pub fn fail_next(&self, kind: ErrorKind) {
        self.inner.failures.lock().push_back(kind);
    }

    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self, key: &Credential) -> GenResult<()> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.inner.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if key.is_empty() {
            return Err(GenerationError::new(ErrorKind::Auth, "empty API key"));
        }
        let failure = self.inner.failures.lock().pop_front();
        match failure {
            Some(kind) => Err(GenerationError::new(kind, "injected failure")),
            None => Ok(()),
        }
    }
}

/// 0..=100 の疑似スコア（文字列のハッシュ）
fn score_for(text: &str) -> f64 {
    let sum = text
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
    f64::from(60 + sum % 41)
}

fn keywords_for(topic: &str) -> Vec<String> {
    let mut words: Vec<String> = topic
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| w.chars().count() > 2)
        .collect();
    words.dedup();
    words.truncate(10);
    words
}

#[async_trait::async_trait]
impl ContentGenerator for OfflineGenerator {
    async fn generate_content(
        &self,
        key: &Credential,
        request: &ContentRequest,
    ) -> GenResult<GeneratedContent> {
        self.enter(key).await?;
        let topic = request.topic.trim();
        let (title, outline) = match request.format {
            VideoFormat::Short => (
                format!("{topic} in 60 seconds"),
                vec![
                    format!("Scene 1: the problem with {topic}"),
                    "Scene 2: the fix".to_string(),
                    "Scene 3: the result".to_string(),
                    "CTA: follow for part 2".to_string(),
                ],
            ),
            VideoFormat::Long => (
                format!("{topic}: the complete guide"),
                vec![
                    format!("Intro: why {topic} matters"),
                    "Part 1: the basics".to_string(),
                    "Part 2: common mistakes".to_string(),
                    "Conclusion: next steps".to_string(),
                ],
            ),
        };
        let mut tags = keywords_for(topic);
        if request.format == VideoFormat::Short {
            tags.insert(0, "#shorts".to_string());
        }
        Ok(GeneratedContent {
            title,
            description: format!("Everything about {topic}, told in a {} tone.", request.tone),
            tags,
            script_outline: outline,
            hook: format!("Nobody tells you this about {topic}."),
            seo_score: Some(score_for(topic)),
        })
    }

    async fn rewrite_description(
        &self,
        key: &Credential,
        title: &str,
        tags: &[String],
        tone: &str,
    ) -> GenResult<String> {
        self.enter(key).await?;
        Ok(format!(
            "{title}. A {tone} take you will not want to miss. Subscribe for more!\n\n{}",
            tags.iter()
                .map(|t| format!("#{}", t.trim_start_matches('#')))
                .collect::<Vec<_>>()
                .join(" ")
        ))
    }

    async fn optimize_row(&self, key: &Credential, topic: &str) -> GenResult<RowOptimization> {
        self.enter(key).await?;
        let topic = topic.trim();
        Ok(RowOptimization {
            optimized_title: format!("{topic} (Tested & Explained)"),
            optimized_desc: format!("We put {topic} to the test. Here is what we found."),
            keywords: keywords_for(topic).join(", "),
            seo_score: score_for(topic),
        })
    }

    async fn audit_channel(&self, key: &Credential, channel_info: &str) -> GenResult<AuditResult> {
        self.enter(key).await?;
        Ok(AuditResult {
            score: score_for(channel_info),
            analysis: format!(
                "Offline audit of a channel described in {} characters.",
                channel_info.chars().count()
            ),
            action_items: vec![
                "Post on a fixed weekly schedule".to_string(),
                "Put the main keyword in the first line of every description".to_string(),
            ],
            strengths: vec!["Clear niche".to_string()],
            weaknesses: vec!["Inconsistent thumbnails".to_string()],
            competitor_analysis: None,
        })
    }

    async fn thumbnail_ideas(
        &self,
        key: &Credential,
        title: &str,
        _script_excerpt: &str,
        style: &str,
    ) -> GenResult<Vec<String>> {
        self.enter(key).await?;
        Ok(vec![
            format!("Close-up of a surprised presenter reacting to {title}, {style}"),
            format!("Split screen before and after of {title}, {style}"),
            format!("Bold object in the centre symbolising {title}, {style}"),
        ])
    }

    async fn thumbnail_image(
        &self,
        key: &Credential,
        prompt: &str,
        style: Option<&str>,
    ) -> GenResult<ThumbnailImage> {
        self.enter(key).await?;
        tracing::debug!(prompt = %compose_image_prompt(prompt, style), "offline thumbnail");
        Ok(ThumbnailImage {
            mime_type: "image/jpeg".to_string(),
            bytes: PLACEHOLDER_JPEG.to_vec(),
        })
    }

    async fn social_posts(
        &self,
        key: &Credential,
        title: &str,
        _description_excerpt: &str,
    ) -> GenResult<SocialPosts> {
        self.enter(key).await?;
        Ok(SocialPosts {
            facebook: Some(format!("🎬 New video: {title}! What do you think? [LINK]")),
            twitter: Some(format!("{title} 🧵 #youtube")),
            linkedin: Some(format!("Lessons learned while making \"{title}\".")),
        })
    }

    async fn trending_ideas(&self, key: &Credential, niche: &str) -> GenResult<TrendReport> {
        self.enter(key).await?;
        let niche = niche.trim();
        Ok(TrendReport {
            ideas: vec![
                format!("{niche} on a budget"),
                format!("{niche} myths debunked"),
                format!("A week of {niche} challenge"),
                format!("{niche} tools ranked"),
                format!("Beginner mistakes in {niche}"),
            ],
            sources: vec![TrendSource {
                title: "Offline mode".to_string(),
                uri: "about:offline".to_string(),
            }],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> Credential {
        Credential::new("offline-key")
    }

    #[tokio::test]
    async fn output_is_deterministic() {
        let generator = OfflineGenerator::new();
        let a = generator.optimize_row(&key(), "Intro to sourdough").await.unwrap();
        let b = generator.optimize_row(&key(), "Intro to sourdough").await.unwrap();
        assert_eq!(a, b);
        assert!((60.0..=100.0).contains(&a.seo_score));
        assert_eq!(a.keywords, "intro, sourdough");
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed_in_order() {
        let generator = OfflineGenerator::new();
        generator.fail_next(ErrorKind::Quota);
        generator.fail_next(ErrorKind::Safety);

        let first = generator.optimize_row(&key(), "t").await.unwrap_err();
        let second = generator.trending_ideas(&key(), "t").await.unwrap_err();
        assert_eq!(first.kind, ErrorKind::Quota);
        assert_eq!(second.kind, ErrorKind::Safety);
        assert!(generator.optimize_row(&key(), "t").await.is_ok());
    }

    #[tokio::test]
    async fn empty_key_is_an_auth_error() {
        let generator = OfflineGenerator::new();
        let err = generator
            .audit_channel(&Credential::default(), "info")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Auth);
    }

    #[tokio::test]
    async fn short_content_is_tagged() {
        let generator = OfflineGenerator::new();
        let request = ContentRequest::new("sourdough", "calm", VideoFormat::Short);
        let content = generator.generate_content(&key(), &request).await.unwrap();
        assert_eq!(content.tags[0], "#shorts");
        assert_eq!(content.script_outline.len(), 4);
    }
}
