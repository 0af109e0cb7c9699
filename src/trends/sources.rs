//! Trend sources: where the "what is selling in Japan right now" signal
//! comes from.
//!
//! Each source is independent and allowed to fail; the selector decides
//! what to do when all of them do.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info};

use crate::error::{MekikiError, Result};

use super::rules::{BudgetBand, CategoryRule, RiskLevel};
use super::selector::{classify_titles, CategorySuggestion};

/// How many ranked item titles to pull from a ranking page per query.
pub const DEFAULT_TITLE_LIMIT: usize = 80;

#[async_trait]
pub trait TrendSource: Send + Sync {
    fn name(&self) -> &str;

    /// Produces category suggestions, typically by classifying observed
    /// item titles against the rule table.
    async fn suggestions(
        &self,
        rules: &[CategoryRule],
        title_limit: usize,
    ) -> Result<Vec<CategorySuggestion>>;
}

/// The Rakuten weekly overall ranking, scraped from the public page.
pub struct RakutenRanking {
    url: String,
    client: Client,
}

const RANKING_URL: &str = "https://ranking.rakuten.co.jp/weekly/";
const TREND_BOT_UA: &str = "Mozilla/5.0 (compatible; MekikiTrendBot/0.1)";

impl RakutenRanking {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(TREND_BOT_UA)
            .build()?;
        Ok(Self {
            url: RANKING_URL.to_string(),
            client,
        })
    }

    async fn fetch_item_titles(&self, limit: usize) -> Result<Vec<String>> {
        info!("Fetching Rakuten weekly ranking from {}", self.url);
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MekikiError::trend_source_error(format!(
                "Rakuten ranking page returned HTTP {}",
                status
            )));
        }

        let html = response.text().await?;
        Ok(extract_ranking_titles(&html, limit))
    }
}

/// Pulls item names out of the ranking page: anchor text of links into
/// item pages, skipping review-count links and duplicates.
pub fn extract_ranking_titles(html: &str, limit: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let anchor_sel = Selector::parse("a[href]").unwrap();

    let mut names: Vec<String> = Vec::new();
    for anchor in document.select(&anchor_sel) {
        let href = anchor.value().attr("href").unwrap_or_default();
        if !href.contains("item.rakuten.co.jp") {
            continue;
        }

        let text = anchor.text().collect::<String>().trim().to_string();
        if text.is_empty() || text.contains("レビュー") {
            continue;
        }
        if names.iter().any(|n| n == &text) {
            continue;
        }

        names.push(text);
        if names.len() >= limit {
            break;
        }
    }

    debug!("Extracted {} item titles from ranking page", names.len());
    names
}

#[async_trait]
impl TrendSource for RakutenRanking {
    fn name(&self) -> &str {
        "rakuten"
    }

    async fn suggestions(
        &self,
        rules: &[CategoryRule],
        title_limit: usize,
    ) -> Result<Vec<CategorySuggestion>> {
        let titles = self.fetch_item_titles(title_limit).await?;
        Ok(classify_titles(&titles, rules, self.name()))
    }
}

/// Curated Amazon.co.jp trend entries with preset hit scores.
///
/// The real Amazon trend API never landed; these are the perennially strong
/// categories there, kept distinct from the Rakuten rule table.
pub struct AmazonTrends;

impl AmazonTrends {
    pub fn new() -> Self {
        Self
    }

    fn curated() -> Vec<CategorySuggestion> {
        vec![
            CategorySuggestion {
                source: "amazon".to_string(),
                category: "Amazon｜PC・周辺機器（USBハブ・ドッキングステーション）".to_string(),
                scene: "在宅ワーク・ゲーミング・マルチモニター需要".to_string(),
                budget_band: BudgetBand::Low,
                risk_level: RiskLevel::Low,
                risk_notes: "PSE対象のACアダプタ内蔵製品は慎重に。まずはバスパワーのUSBハブやケーブル中心。"
                    .to_string(),
                suggested_keywords: vec![
                    "usb 集线器".to_string(),
                    "type-c 扩展坞".to_string(),
                    "hdmi 转接线".to_string(),
                ],
                hits: 7,
            },
            CategorySuggestion {
                source: "amazon".to_string(),
                category: "Amazon｜スマホアクセサリ（保護フィルム・ケース）".to_string(),
                scene: "スマホ買い替え・機種変更需要＋消耗品需要".to_string(),
                budget_band: BudgetBand::Low,
                risk_level: RiskLevel::Low,
                risk_notes: "機種対応のミスに注意。まずは汎用タイプや人気機種に絞る。".to_string(),
                suggested_keywords: vec![
                    "手机 壳".to_string(),
                    "钢化膜".to_string(),
                    "手机 支架".to_string(),
                ],
                hits: 6,
            },
            CategorySuggestion {
                source: "amazon".to_string(),
                category: "Amazon｜生活家電（スティック掃除機・小型クリーナー）".to_string(),
                scene: "一人暮らし・共働き家庭の省スペース家電需要".to_string(),
                budget_band: BudgetBand::Mid,
                risk_level: RiskLevel::Mid,
                risk_notes: "電気用品安全法（PSE）に注意。電源直結品は避け、小型USB給電品から試す。"
                    .to_string(),
                suggested_keywords: vec![
                    "无线 吸尘器".to_string(),
                    "桌面 吸尘器".to_string(),
                    "车载 吸尘器".to_string(),
                ],
                hits: 5,
            },
            CategorySuggestion {
                source: "amazon".to_string(),
                category: "Amazon｜オフィス・文房具（ノート・ペン・整理グッズ）".to_string(),
                scene: "在宅ワーク・勉強用のロングテール消耗品".to_string(),
                budget_band: BudgetBand::Low,
                risk_level: RiskLevel::Low,
                risk_notes: "ブランド模倣品は避ける。無地・シンプルデザインのOEM寄りが安全。".to_string(),
                suggested_keywords: vec![
                    "笔记本 文具".to_string(),
                    "中性笔".to_string(),
                    "桌面 收纳 办公".to_string(),
                ],
                hits: 4,
            },
        ]
    }
}

impl Default for AmazonTrends {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrendSource for AmazonTrends {
    fn name(&self) -> &str {
        "amazon"
    }

    async fn suggestions(
        &self,
        _rules: &[CategoryRule],
        _title_limit: usize,
    ) -> Result<Vec<CategorySuggestion>> {
        Ok(Self::curated())
    }
}
