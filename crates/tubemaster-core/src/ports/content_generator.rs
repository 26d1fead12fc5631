//! ContentGenerator port - 生成 AI への request/response 境界
//!
//! # 実装
//! - **GeminiGenerator**: Gemini REST API
//! - **OfflineGenerator**: 決定的なダミー出力（オフライン実行・テスト用）
//!
//! # エラー方針
//! - 失敗は必ず `GenerationError`（ErrorKind で分類済み）で返す
//! - リトライはしない

use crate::domain::{
    AuditResult, ContentRequest, Credential, GeneratedContent, GenerationError, RowOptimization,
    SocialPosts, ThumbnailImage, TrendReport,
};

pub type GenResult<T> = Result<T, GenerationError>;

/// ContentGenerator は各操作をプロファイルの API キー付きで呼ぶ
#[async_trait::async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Full script package for a topic.
    async fn generate_content(
        &self,
        key: &Credential,
        request: &ContentRequest,
    ) -> GenResult<GeneratedContent>;

    async fn rewrite_description(
        &self,
        key: &Credential,
        title: &str,
        tags: &[String],
        tone: &str,
    ) -> GenResult<String>;

    /// SEO metadata for one planner topic.
    async fn optimize_row(&self, key: &Credential, topic: &str) -> GenResult<RowOptimization>;

    async fn audit_channel(&self, key: &Credential, channel_info: &str) -> GenResult<AuditResult>;

    /// Image prompts. `script_excerpt` is at most 300 characters.
    async fn thumbnail_ideas(
        &self,
        key: &Credential,
        title: &str,
        script_excerpt: &str,
        style: &str,
    ) -> GenResult<Vec<String>>;

    /// `prompt` is the raw idea; implementations append style and quality keywords.
    async fn thumbnail_image(
        &self,
        key: &Credential,
        prompt: &str,
        style: Option<&str>,
    ) -> GenResult<ThumbnailImage>;

    /// `description_excerpt` is at most 300 characters.
    async fn social_posts(
        &self,
        key: &Credential,
        title: &str,
        description_excerpt: &str,
    ) -> GenResult<SocialPosts>;

    async fn trending_ideas(&self, key: &Credential, niche: &str) -> GenResult<TrendReport>;
}
