//! The LLM advisory agent.
//!
//! A thin chat-completions client. The missing-key case is a configuration
//! error raised here, at invocation time - callers that can degrade (the
//! candidate pipeline) catch it like any other advisory failure; callers
//! that cannot (listing copy) surface it to the operator.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::Product;
use crate::error::{MekikiError, Result};
use crate::evaluator::projector::Projection;
use crate::evaluator::Grade;

use super::Advisor;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Structured refinement returned by the advisory model. Every field is
/// optional in spirit: whatever is absent keeps its rule-based value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvisoryOverride {
    pub japan_fit_score: Option<f64>,
    pub grade: Option<Grade>,
    #[serde(default)]
    pub risk_notes: Vec<String>,
    #[serde(default)]
    pub jp_bullets: Vec<String>,
}

pub struct AdvisoryAgent {
    api_key: Option<String>,
    model: String,
    client: Client,
}

impl AdvisoryAgent {
    pub fn new(api_key: Option<String>, model: String, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            api_key,
            model,
            client,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// One chat round-trip; returns the assistant message text.
    pub async fn chat(&self, system: &str, user: &str, temperature: f64) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            MekikiError::config_error("OPENAI_API_KEY is not set; advisory calls are unavailable")
        })?;

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature,
        };

        debug!("Sending advisory request to model {}", self.model);
        let response = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(MekikiError::advisory_error(format!(
                "chat API returned HTTP {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|e| MekikiError::advisory_error(format!("chat API response was not JSON: {}", e)))?;

        payload
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| MekikiError::advisory_error("chat API returned no choices"))
    }
}

#[async_trait]
impl Advisor for AdvisoryAgent {
    async fn evaluate_candidate(
        &self,
        product: &Product,
        projection: &Projection,
        directions: &[String],
    ) -> Result<AdvisoryOverride> {
        info!("Requesting advisory evaluation for {}", product.offer_id);

        let prompt = build_evaluation_prompt(product, projection, directions);
        let content = self
            .chat(
                "You are a cross-border e-commerce advisor for Japanese Rakuten sellers \
                 sourcing from 1688. Answer with JSON only.",
                &prompt,
                0.3,
            )
            .await?;

        parse_override(&content)
    }
}

/// Builds the evaluation prompt: product facts, the projected economics,
/// the operator's directions, and the exact JSON shape expected back.
fn build_evaluation_prompt(
    product: &Product,
    projection: &Projection,
    directions: &[String],
) -> String {
    let directions = if directions.is_empty() {
        "未指定".to_string()
    } else {
        directions.join("、")
    };

    format!(
        "以下の1688商品が日本の楽天市場での販売に適しているか評価してください。\n\
         \n\
         【商品情報】\n\
         - 中文标题: {title}\n\
         - 进货价 (CNY): {price}\n\
         - 建议售价 (JPY): {suggested:.0}\n\
         - 预估毛利率: {margin:.3}\n\
         - 标签: {tags}\n\
         - 经营方向: {directions}\n\
         \n\
         次のJSONだけを出力してください:\n\
         {{\n\
           \"japan_fit_score\": 0.0,\n\
           \"grade\": \"A\",\n\
           \"risk_notes\": [\"...\"],\n\
           \"jp_bullets\": [\"...\", \"...\"]\n\
         }}",
        title = product.title,
        price = product.price_cny,
        suggested = projection.suggested_price_jpy,
        margin = projection.margin_rate,
        tags = product.tags.join(", "),
        directions = directions,
    )
}

/// Parses the model's reply into an override. Code fences are tolerated;
/// anything else malformed is an advisory error for the caller to absorb.
pub fn parse_override(content: &str) -> Result<AdvisoryOverride> {
    let cleaned = strip_reply_fences(content);

    #[derive(Deserialize)]
    struct Wire {
        japan_fit_score: Option<f64>,
        grade: Option<String>,
        #[serde(default)]
        risk_notes: Vec<String>,
        #[serde(default)]
        jp_bullets: Vec<String>,
    }

    let wire: Wire = serde_json::from_str(cleaned).map_err(|e| {
        MekikiError::advisory_error(format!("model reply was not the expected JSON: {}", e))
    })?;

    Ok(AdvisoryOverride {
        japan_fit_score: wire.japan_fit_score.filter(|s| s.is_finite()),
        grade: wire.grade.and_then(|g| g.parse().ok()),
        risk_notes: wire.risk_notes,
        jp_bullets: wire.jp_bullets,
    })
}

/// Models often wrap JSON in ``` fences despite instructions; unwrap them.
pub fn strip_reply_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}
