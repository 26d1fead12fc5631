//! GeminiGenerator - Gemini REST API による ContentGenerator
//!
//! # エンドポイント
//! - テキスト: `POST {base}/v1beta/models/{model}:generateContent`
//!   （JSON スキーマ指定、トレンドだけ Google 検索グラウンディング）
//! - 画像: `POST {base}/v1beta/models/{image_model}:predict`（Imagen）
//!
//! API キーは `x-goog-api-key` ヘッダーで送る（URL には載せない）。
//!
//! # エラー分類
//! HTTP ステータスと本文、送信エラーの種類から `ErrorKind` を決める。
//! 判定ロジックは純粋関数にしてあり、ネットワークなしでテストできる。

use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::config::GeminiSettings;
use crate::domain::content::{compose_image_prompt, parse_trend_ideas};
use crate::domain::{
    AuditResult, ContentRequest, Credential, ErrorKind, GeneratedContent, GenerationError,
    RowOptimization, SocialPosts, ThumbnailImage, TrendReport, TrendSource, VideoFormat,
};
use crate::ports::{ContentGenerator, GenResult};

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiGenerator {
    client: Client,
    settings: GeminiSettings,
}

impl GeminiGenerator {
    pub fn new(settings: GeminiSettings) -> Result<Self, GenerationError> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| GenerationError::new(ErrorKind::Unknown, e.to_string()))?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!(
            "{}/v1beta/models/{}:{}",
            self.settings.base_url.trim_end_matches('/'),
            model,
            method
        )
    }

    /// POST して成功時の本文を返す。失敗は分類済み。
    async fn post(&self, key: &Credential, url: &str, body: &Value) -> GenResult<String> {
        if key.is_empty() {
            return Err(GenerationError::new(ErrorKind::Auth, "empty API key"));
        }

        tracing::debug!(url, "gemini request");
        let resp = self
            .client
            .post(url)
            .header(API_KEY_HEADER, key.expose())
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::new(classify_transport(&e), e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| GenerationError::new(classify_transport(&e), e.to_string()))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "gemini request failed");
            return Err(GenerationError::new(
                classify_status(status.as_u16(), &text),
                format!("HTTP {}: {}", status.as_u16(), truncate(&text, 300)),
            ));
        }
        Ok(text)
    }

    /// JSON モードで生成し、`T` として読む。
    async fn generate_json<T: DeserializeOwned>(
        &self,
        key: &Credential,
        prompt: String,
        schema: Value,
    ) -> GenResult<T> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
            }
        });
        let url = self.endpoint(&self.settings.text_model, "generateContent");
        let raw = self.post(key, &url, &body).await?;
        let response: GenerateContentResponse = parse_payload(&raw)?;
        let text = extract_text(&response)?;
        parse_payload(&text)
    }
}

#[async_trait::async_trait]
impl ContentGenerator for GeminiGenerator {
    async fn generate_content(
        &self,
        key: &Credential,
        request: &ContentRequest,
    ) -> GenResult<GeneratedContent> {
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING" },
                "description": { "type": "STRING" },
                "tags": { "type": "ARRAY", "items": { "type": "STRING" } },
                "hook": { "type": "STRING" },
                "scriptOutline": { "type": "ARRAY", "items": { "type": "STRING" } },
                "seoScore": { "type": "NUMBER" }
            },
            "required": ["title", "description", "tags", "hook", "scriptOutline", "seoScore"]
        });
        self.generate_json(key, content_prompt(request), schema).await
    }

    async fn rewrite_description(
        &self,
        key: &Credential,
        title: &str,
        tags: &[String],
        tone: &str,
    ) -> GenResult<String> {
        let prompt = format!(
            "Rewrite the DESCRIPTION of this YouTube video for SEO and conversion.\n\
             Title: \"{title}\"\n\
             Main tags: {}\n\
             Tone: {tone}\n\n\
             Requirements:\n\
             - The first 2-3 sentences carry the main keyword and spark curiosity.\n\
             - Include a call to action.\n\
             - Weave keywords in naturally.\n\
             - Use emoji sparingly.",
            tags.join(", ")
        );
        let schema = json!({
            "type": "OBJECT",
            "properties": { "description": { "type": "STRING" } },
            "required": ["description"]
        });
        let payload: DescriptionPayload = self.generate_json(key, prompt, schema).await?;
        non_empty(payload.description, "description")
    }

    async fn optimize_row(&self, key: &Credential, topic: &str) -> GenResult<RowOptimization> {
        let prompt = format!(
            "Optimize the metadata of this YouTube video for the highest click-through rate.\n\
             Original topic: \"{topic}\"\n\
             Tasks:\n\
             1. Rewrite the title for SEO and curiosity.\n\
             2. Write a short description (2-3 sentences).\n\
             3. Pick the 10 best keywords (comma separated).\n\
             4. Predict an SEO score (0-100).\n\n\
             Return JSON."
        );
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "optimizedTitle": { "type": "STRING" },
                "optimizedDesc": { "type": "STRING" },
                "keywords": { "type": "STRING", "description": "Comma separated keywords" },
                "seoScore": { "type": "NUMBER" }
            }
        });
        self.generate_json(key, prompt, schema).await
    }

    async fn audit_channel(&self, key: &Credential, channel_info: &str) -> GenResult<AuditResult> {
        let prompt = format!(
            "You are a senior YouTube channel auditor.\n\
             Channel information: \"{channel_info}\"\n\n\
             Analyse it against the current YouTube algorithm. Return JSON with a score, \
             an analysis, strengths and weaknesses, action items, and a short analysis of \
             likely competitors in this niche."
        );
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "score": { "type": "NUMBER" },
                "analysis": { "type": "STRING" },
                "actionItems": { "type": "ARRAY", "items": { "type": "STRING" } },
                "strengths": { "type": "ARRAY", "items": { "type": "STRING" } },
                "weaknesses": { "type": "ARRAY", "items": { "type": "STRING" } },
                "competitorAnalysis": { "type": "STRING" }
            },
            "required": ["score", "analysis", "actionItems", "strengths", "weaknesses"]
        });
        self.generate_json(key, prompt, schema).await
    }

    async fn thumbnail_ideas(
        &self,
        key: &Credential,
        title: &str,
        script_excerpt: &str,
        style: &str,
    ) -> GenResult<Vec<String>> {
        let prompt = format!(
            "You are a YouTube thumbnail designer.\n\
             Suggest 3 high-CTR thumbnail concepts for this video.\n\
             Title: \"{title}\"\n\
             Summary: \"{script_excerpt}...\"\n\
             Art style: \"{style}\"\n\n\
             Each concept is one detailed English prompt for an image model, strictly in the \
             \"{style}\" style, covering subject, facial expression, background, dominant colours \
             and lighting. No text in the image.\n\
             Return JSON: {{ \"prompts\": [\"...\", \"...\", \"...\"] }}"
        );
        let schema = json!({
            "type": "OBJECT",
            "properties": { "prompts": { "type": "ARRAY", "items": { "type": "STRING" } } },
            "required": ["prompts"]
        });
        let payload: PromptsPayload = self.generate_json(key, prompt, schema).await?;
        if payload.prompts.is_empty() {
            return Err(GenerationError::malformed("no thumbnail prompts"));
        }
        Ok(payload.prompts)
    }

    async fn thumbnail_image(
        &self,
        key: &Credential,
        prompt: &str,
        style: Option<&str>,
    ) -> GenResult<ThumbnailImage> {
        let body = json!({
            "instances": [{ "prompt": compose_image_prompt(prompt, style) }],
            "parameters": {
                "sampleCount": 1,
                "aspectRatio": "16:9",
                "outputOptions": { "mimeType": "image/jpeg" }
            }
        });
        let url = self.endpoint(&self.settings.image_model, "predict");
        let raw = self.post(key, &url, &body).await?;
        let response: PredictResponse = parse_payload(&raw)?;
        decode_prediction(response)
    }

    async fn social_posts(
        &self,
        key: &Credential,
        title: &str,
        description_excerpt: &str,
    ) -> GenResult<SocialPosts> {
        let prompt = format!(
            "You are a social media marketer. Write 3 posts promoting this YouTube video.\n\
             Video title: \"{title}\"\n\
             Summary: \"{description_excerpt}...\"\n\n\
             1. Facebook: friendly, emoji, an engagement question, a [LINK] placeholder.\n\
             2. Twitter (X): short and punchy, trending hashtags, short thread form.\n\
             3. LinkedIn: professional, focused on the lesson or value.\n\n\
             Return JSON."
        );
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "facebook": { "type": "STRING" },
                "twitter": { "type": "STRING" },
                "linkedin": { "type": "STRING" }
            }
        });
        let posts: SocialPosts = self.generate_json(key, prompt, schema).await?;
        if posts.is_empty() {
            return Err(GenerationError::malformed("no social posts"));
        }
        Ok(posts)
    }

    async fn trending_ideas(&self, key: &Credential, niche: &str) -> GenResult<TrendReport> {
        let prompt = format!(
            "Search for 5 YouTube trends or video topics that are hot right now related to: \
             \"{niche}\". Use the latest information from Google.\n\
             Present the result as a short numbered list (1., 2., 3., ...), \
             one catchy title line per idea."
        );
        // JSON モードは検索ツールと併用できない
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "tools": [{ "google_search": {} }]
        });
        let url = self.endpoint(&self.settings.text_model, "generateContent");
        let raw = self.post(key, &url, &body).await?;
        let response: GenerateContentResponse = parse_payload(&raw)?;
        let text = extract_text(&response)?;
        Ok(TrendReport {
            ideas: parse_trend_ideas(&text),
            sources: extract_sources(&response),
        })
    }
}

fn content_prompt(request: &ContentRequest) -> String {
    let ContentRequest {
        topic,
        tone,
        format,
        related_video_id,
    } = request;

    let reference = related_video_id
        .as_deref()
        .map(|id| {
            format!(
                "\nREFERENCE VIDEO: YouTube video id \"{id}\". Treat the result as a remix, \
                 reaction or upgraded take on that video, better than the original."
            )
        })
        .unwrap_or_default();

    match format {
        VideoFormat::Short => format!(
            "You are a TikTok / YouTube Shorts expert.\n\
             Task: write a short video script (under 60s) for the topic: \"{topic}\".\n\
             Tone: {tone}.{reference}\n\n\
             Requirements:\n\
             1. A very short, surprising or curious title.\n\
             2. Hook (first 3s) that holds the viewer immediately.\n\
             3. Main content: tight, straight to the point, split into fast scenes.\n\
             4. A short call to action.\n\
             Fill seoScore (0-100) with the topic's potential."
        ),
        VideoFormat::Long => format!(
            "You are a YouTube optimization expert (like VidIQ / TubeBuddy).\n\
             Task: create long-form video content for the topic: \"{topic}\".\n\
             Tone: {tone}.{reference}\n\n\
             Requirements:\n\
             1. A highly clickable but honest title containing SEO keywords.\n\
             2. An SEO description; the first 3 lines matter most.\n\
             3. Outline split into Intro, Body (main points) and Conclusion.\n\
             4. Score the topic's SEO potential (seoScore, 0-100)."
        ),
    }
}

// ========================================
// Wire types
// ========================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    title: Option<String>,
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DescriptionPayload {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct PromptsPayload {
    #[serde(default)]
    prompts: Vec<String>,
}

// ========================================
// Pure helpers
// ========================================

fn classify_status(status: u16, body: &str) -> ErrorKind {
    if status == 401 || status == 403 || body.contains("API_KEY_INVALID") {
        return ErrorKind::Auth;
    }
    if status == 429 || body.contains("RESOURCE_EXHAUSTED") {
        return ErrorKind::Quota;
    }
    ErrorKind::Unknown
}

fn classify_transport(err: &reqwest::Error) -> ErrorKind {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        ErrorKind::Network
    } else if err.is_decode() {
        ErrorKind::MalformedResponse
    } else {
        ErrorKind::Unknown
    }
}

/// Model output text, or the reason there is none.
fn extract_text(response: &GenerateContentResponse) -> GenResult<String> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return Err(GenerationError::new(
            ErrorKind::Safety,
            format!("prompt blocked: {reason}"),
        ));
    }

    let Some(candidate) = response.candidates.first() else {
        return Err(GenerationError::malformed("no candidates"));
    };

    if candidate.finish_reason.as_deref() == Some("SAFETY") {
        return Err(GenerationError::new(ErrorKind::Safety, "finish reason SAFETY"));
    }

    let text: String = candidate
        .content
        .iter()
        .flat_map(|c| c.parts.iter())
        .filter_map(|p| p.text.as_deref())
        .collect();

    if text.trim().is_empty() {
        return Err(GenerationError::malformed("empty response text"));
    }
    Ok(text)
}

fn extract_sources(response: &GenerateContentResponse) -> Vec<TrendSource> {
    response
        .candidates
        .first()
        .and_then(|c| c.grounding_metadata.as_ref())
        .map(|m| {
            m.grounding_chunks
                .iter()
                .filter_map(|chunk| chunk.web.as_ref())
                .filter_map(|web| {
                    let uri = web.uri.clone()?;
                    Some(TrendSource {
                        title: web.title.clone().unwrap_or_else(|| uri.clone()),
                        uri,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn decode_prediction(response: PredictResponse) -> GenResult<ThumbnailImage> {
    let prediction = response
        .predictions
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::malformed("no image returned"))?;
    let encoded = prediction
        .bytes_base64_encoded
        .ok_or_else(|| GenerationError::malformed("image payload missing"))?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| GenerationError::malformed(format!("image payload is not base64: {e}")))?;
    Ok(ThumbnailImage {
        mime_type: prediction
            .mime_type
            .unwrap_or_else(|| "image/jpeg".to_string()),
        bytes,
    })
}

/// JSON として読む。コードフェンスで包まれていても許す。
fn parse_payload<T: DeserializeOwned>(text: &str) -> GenResult<T> {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(unfenced.trim()).map_err(|e| {
        GenerationError::malformed(format!("{e}. Response: {}", truncate(text, 200)))
    })
}

fn non_empty(value: String, what: &str) -> GenResult<String> {
    if value.trim().is_empty() {
        Err(GenerationError::malformed(format!("empty {what}")))
    } else {
        Ok(value)
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    crate::domain::content::excerpt(text, max_chars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(401, "", ErrorKind::Auth)]
    #[case(403, "", ErrorKind::Auth)]
    #[case(400, r#"{"error":{"details":[{"reason":"API_KEY_INVALID"}]}}"#, ErrorKind::Auth)]
    #[case(429, "", ErrorKind::Quota)]
    #[case(400, "RESOURCE_EXHAUSTED", ErrorKind::Quota)]
    #[case(500, "internal", ErrorKind::Unknown)]
    fn status_classification(#[case] status: u16, #[case] body: &str, #[case] kind: ErrorKind) {
        assert_eq!(classify_status(status, body), kind);
    }

    #[test]
    fn text_is_joined_from_parts() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":"},{"text":"1}"}]},"finishReason":"STOP"}]}"#;
        let response: GenerateContentResponse = parse_payload(raw).unwrap();
        assert_eq!(extract_text(&response).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn blocked_prompt_is_a_safety_error() {
        let raw = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let response: GenerateContentResponse = parse_payload(raw).unwrap();
        assert_eq!(extract_text(&response).unwrap_err().kind, ErrorKind::Safety);

        let raw = r#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        let response: GenerateContentResponse = parse_payload(raw).unwrap();
        assert_eq!(extract_text(&response).unwrap_err().kind, ErrorKind::Safety);
    }

    #[test]
    fn empty_candidates_are_malformed() {
        let response: GenerateContentResponse = parse_payload("{}").unwrap();
        assert_eq!(
            extract_text(&response).unwrap_err().kind,
            ErrorKind::MalformedResponse
        );
    }

    #[test]
    fn fenced_json_is_accepted() {
        let opt: RowOptimization =
            parse_payload("```json\n{\"optimizedTitle\":\"T\",\"seoScore\":70}\n```").unwrap();
        assert_eq!(opt.optimized_title, "T");
        assert!(parse_payload::<RowOptimization>("not json").is_err());
    }

    #[test]
    fn grounding_sources_are_extracted() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"1. A"}]},
            "groundingMetadata":{"groundingChunks":[
                {"web":{"title":"News","uri":"https://example.com/a"}},
                {"retrievedContext":{}},
                {"web":{"uri":"https://example.com/b"}}]}}]}"#;
        let response: GenerateContentResponse = parse_payload(raw).unwrap();
        let sources = extract_sources(&response);
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].title, "News");
        assert_eq!(sources[1].title, "https://example.com/b");
    }

    #[test]
    fn prediction_is_decoded() {
        let raw = r#"{"predictions":[{"bytesBase64Encoded":"/9g=","mimeType":"image/jpeg"}]}"#;
        let response: PredictResponse = parse_payload(raw).unwrap();
        let image = decode_prediction(response).unwrap();
        assert_eq!(image.bytes, vec![0xff, 0xd8]);

        let empty: PredictResponse = parse_payload(r#"{"predictions":[]}"#).unwrap();
        assert_eq!(
            decode_prediction(empty).unwrap_err().kind,
            ErrorKind::MalformedResponse
        );
    }

    #[test]
    fn short_prompt_mentions_reference_video() {
        let mut request = ContentRequest::new("sourdough", "calm", VideoFormat::Short);
        request.related_video_id = Some("dQw4w9WgXcQ".into());
        let prompt = content_prompt(&request);
        assert!(prompt.contains("Shorts"));
        assert!(prompt.contains("dQw4w9WgXcQ"));
    }

    #[tokio::test]
    async fn empty_key_fails_before_any_request() {
        let generator = GeminiGenerator::new(GeminiSettings::default()).unwrap();
        let err = generator
            .optimize_row(&Credential::default(), "topic")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Auth);
    }
}
