use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::analysis::{ImageAnalysis, Vocabulary};
use crate::utils::ImageInput;

/// Vision model used when none is configured.
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o-mini";

/// Completion budget for the analysis answer.
const MAX_TOKENS: u32 = 500;

/// A model that answers a text prompt about an image.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Return the model's raw text answer
    async fn complete(&self, image: &ImageInput, prompt: &str) -> Result<String>;
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiVision {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiVision {
    /// Create a new vision client
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl VisionModel for OpenAiVision {
    async fn complete(&self, image: &ImageInput, prompt: &str) -> Result<String> {
        let data_url = format!("data:{};base64,{}", image.mime(), STANDARD.encode(image.bytes()));

        let body = serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": { "url": data_url } },
                ],
            }],
            "max_tokens": MAX_TOKENS,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "vision API returned {}: {}",
                status, text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("malformed completion response: {}", e)))?;

        json.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::Upstream("vision API returned no content".to_string()))
    }
}

/// Build the instruction sent alongside the image.
pub fn build_prompt(vocabulary: &Vocabulary) -> String {
    let categories = serde_json::to_string(&vocabulary.categories).unwrap_or_default();
    let genders = vocabulary.genders.join(", ");

    format!(
        r#"Given an image of an item of clothing, analyze the item and generate a JSON output with the following fields: "items", "category", and "gender".
Use your understanding of fashion trends, styles, and gender preferences to provide accurate and relevant suggestions for how to complete the outfit.
The items field should be a list of items that would go well with the item in the picture. Each item should represent a title of an item of clothing that contains the style, color, and gender of the item.
The category needs to be chosen between the types in this list: {categories}.
You have to choose between the genders in this list: [{genders}]
Do not include the description of the item in the picture. Return only the JSON object, without markdown or a ```json code fence.

Example Input: An image representing a black leather jacket.

Example Output: {{"items": ["Fitted White Women's T-shirt", "White Canvas Sneakers", "Women's Black Skinny Jeans"], "category": "Jackets", "gender": "Women"}}"#
    )
}

/// Remove a surrounding markdown code fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") up to the first newline
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    body.trim_end().trim_end_matches("```").trim()
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    items: Vec<String>,
    category: String,
    gender: String,
}

/// Parse and validate a model answer.
pub fn parse_analysis(text: &str, vocabulary: &Vocabulary) -> Result<ImageAnalysis> {
    let json = strip_code_fence(text);
    let raw: RawAnalysis = serde_json::from_str(json).map_err(|e| {
        log::warn!("Unparseable analysis from vision model: {}", text);
        AppError::Parse(format!("invalid analysis format: {}", e))
    })?;

    ImageAnalysis::new(raw.items, &raw.category, &raw.gender, vocabulary)
}

/// Ask `model` for complementary items and return the validated analysis.
pub async fn describe(
    model: &dyn VisionModel,
    image: &ImageInput,
    vocabulary: &Vocabulary,
) -> Result<ImageAnalysis> {
    let prompt = build_prompt(vocabulary);
    let answer = model.complete(image, &prompt).await?;
    let analysis = parse_analysis(&answer, vocabulary)?;

    log::info!(
        "Vision model classified garment as {} / {} with {} suggestions",
        analysis.category(),
        analysis.gender(),
        analysis.items().len()
    );
    Ok(analysis)
}
