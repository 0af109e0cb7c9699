//! Japanese listing-copy generation.
//!
//! Unlike the candidate pipeline, there is no rule-based fallback for prose.
//! Failures still never crash the invocation: the operator gets an empty
//! copy payload carrying a structured error instead.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::agent::{strip_reply_fences, AdvisoryAgent};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingCopyRequest {
    /// Source (Chinese) listing title.
    pub title_cn: String,
    #[serde(default)]
    pub desc_cn: String,
    /// Japanese keywords to work into the copy.
    #[serde(default)]
    pub keywords_jp: Vec<String>,
    /// Desired register, e.g. シンプル / カジュアル / 高級感.
    #[serde(default = "default_tone")]
    pub shop_tone: String,
}

fn default_tone() -> String {
    "シンプル".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingCopy {
    pub title_jp: String,
    #[serde(default)]
    pub bullets_jp: Vec<String>,
    pub description_jp: String,
    #[serde(default)]
    pub search_keywords_jp: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ListingCopyError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingCopyError {
    pub code: String,
    /// Operator-facing message, Japanese like the rest of the surface.
    pub message_ja: String,
    pub debug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

const SYSTEM_PROMPT: &str = "あなたは日本の楽天市場のプロの運営担当者です。\
    中国輸入商品の元情報（中国語）をもとに、楽天向けの商品ページ用テキストを作成します。\
    薬機法・景表法に抵触しないように、誇大広告は避けてください。\
    出力は必ずJSONのみで返してください。";

/// Generates Rakuten listing copy for one product.
pub async fn generate_listing_copy(agent: &AdvisoryAgent, req: &ListingCopyRequest) -> ListingCopy {
    info!("Generating listing copy for {:?}", req.title_cn);

    let keywords = if req.keywords_jp.is_empty() {
        "（特になし）".to_string()
    } else {
        req.keywords_jp.join("、")
    };
    let desc = if req.desc_cn.is_empty() {
        "（説明文なし）"
    } else {
        req.desc_cn.as_str()
    };

    let prompt = format!(
        "1688の商品情報をもとに、楽天市場向けの日本語の商品ページ文案を作ってください。\n\
         \n\
         [中国語タイトル]\n{title}\n\n\
         [中国語説明文]\n{desc}\n\n\
         [優先キーワード（日文）]\n{keywords}\n\n\
         [文体]\n{tone}\n\
         \n\
         注意:\n\
         - タイトルは全角60〜80文字程度を目安にしてください。\n\
         - 箇条書きは4〜6個にしてください。\n\
         - 説明文は400〜800文字を目安に、読みやすい段落にしてください。\n\
         \n\
         次のJSON形式で回答してください:\n\
         {{\n\
           \"title_jp\": \"...\",\n\
           \"bullets_jp\": [\"...\", \"...\"],\n\
           \"description_jp\": \"...\",\n\
           \"search_keywords_jp\": [\"...\", \"...\"]\n\
         }}",
        title = req.title_cn,
        desc = desc,
        keywords = keywords,
        tone = req.shop_tone,
    );

    let content = match agent.chat(SYSTEM_PROMPT, &prompt, 0.5).await {
        Ok(content) => content,
        Err(e) => {
            warn!("Listing copy generation failed: {}", e);
            return ListingCopy {
                error: Some(ListingCopyError {
                    code: "ADVISOR_CALL_ERROR".to_string(),
                    message_ja: "現在AI文案生成が一時的に利用しづらい状態です。\
                        時間をおいて再度お試しください。"
                        .to_string(),
                    debug: e.to_string(),
                    raw_text: None,
                }),
                ..ListingCopy::default()
            };
        }
    };

    match serde_json::from_str::<ListingCopy>(strip_reply_fences(&content)) {
        Ok(copy) => copy,
        Err(e) => {
            warn!("Listing copy reply was not the expected JSON: {}", e);
            ListingCopy {
                error: Some(ListingCopyError {
                    code: "ADVISOR_JSON_ERROR".to_string(),
                    message_ja: "AIからの応答をうまく解析できませんでした。\
                        テキストをそのまま表示します。"
                        .to_string(),
                    debug: e.to_string(),
                    raw_text: Some(content),
                }),
                ..ListingCopy::default()
            }
        }
    }
}
