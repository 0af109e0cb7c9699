//! The category rule table: which Japanese market categories we know how to
//! recognize in ranking data, and what to search for on 1688 when one is
//! hot.
//!
//! Like the scoring rule book, this is editorial configuration - compiled-in
//! defaults, JSON-overridable, immutable at runtime. Fresh/frozen food
//! categories are deliberately absent (no cold chain).

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetBand {
    Low,
    Mid,
    High,
    /// Wildcard: matches every requested band.
    All,
}

impl BudgetBand {
    /// Band filter semantics: a rule matches the requested band exactly,
    /// or either side is the `all` wildcard.
    pub fn matches(&self, requested: BudgetBand) -> bool {
        *self == requested || *self == BudgetBand::All || requested == BudgetBand::All
    }
}

impl FromStr for BudgetBand {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "mid" => Ok(Self::Mid),
            "high" => Ok(Self::High),
            "all" => Ok(Self::All),
            other => Err(format!("unknown budget band {:?} (low|mid|high|all)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Mid,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Japanese-side category label.
    pub category: String,
    /// The demand scene behind the category.
    pub scene: String,
    /// Title keywords that count as a hit for this category.
    pub triggers: Vec<String>,
    pub budget_band: BudgetBand,
    pub risk_level: RiskLevel,
    pub risk_notes: String,
    /// Chinese keywords to feed into 1688 search for this category.
    pub suggested_keywords: Vec<String>,
}

pub fn default_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule {
            category: "収納・整理グッズ（インテリア・寝具・収納）".to_string(),
            scene: "家の省スペース化・片付け需要".to_string(),
            triggers: to_strings(&["収納", "ラック", "ボックス", "ケース", "整理", "クローゼット"]),
            budget_band: BudgetBand::Low,
            risk_level: RiskLevel::Low,
            risk_notes: "大型家具・ガラス製品は送料と破損リスクが高いため避ける。".to_string(),
            suggested_keywords: to_strings(&["收纳盒", "收纳篮", "抽屉收纳", "墙挂收纳"]),
        },
        CategoryRule {
            category: "キッチン用品・小型調理グッズ".to_string(),
            scene: "時短料理・お弁当・在宅ごはん需要".to_string(),
            triggers: to_strings(&["フライパン", "鍋", "保存容器", "キッチン", "まな板", "お弁当箱"]),
            budget_band: BudgetBand::Low,
            risk_level: RiskLevel::Low,
            risk_notes: "食品衛生法対応（食品接触材質）に注意。素材表示が明確な商品を選ぶ。".to_string(),
            suggested_keywords: to_strings(&["厨房小工具", "厨房收纳", "便当盒", "料理模具"]),
        },
        CategoryRule {
            category: "ペット用品（ケア・おもちゃ）".to_string(),
            scene: "少子高齢化＋ペット家族化で継続需要".to_string(),
            triggers: to_strings(&["ペット", "犬", "猫", "トイレシート", "キャットタワー", "ケア"]),
            budget_band: BudgetBand::Low,
            risk_level: RiskLevel::Mid,
            risk_notes: "ペットフード・サプリは規制が重いので避ける。ブラシ・おもちゃ中心。".to_string(),
            suggested_keywords: to_strings(&["宠物梳", "宠物玩具", "宠物窝", "猫抓板"]),
        },
        CategoryRule {
            category: "美容雑貨・コスメ収納".to_string(),
            scene: "コスメ好き層＋SNS映えニーズ".to_string(),
            triggers: to_strings(&["コスメ", "メイク", "ミラー", "ドレッサー", "コスメボックス"]),
            budget_band: BudgetBand::Low,
            risk_level: RiskLevel::Mid,
            risk_notes: "化粧品本体は薬機法が重いので避けて、ツール・収納中心に。".to_string(),
            suggested_keywords: to_strings(&["化妆刷", "化妆收纳盒", "化妆镜", "收纳化妆包"]),
        },
        CategoryRule {
            category: "スポーツ・アウトドア小物".to_string(),
            scene: "健康志向＋週末レジャー需要".to_string(),
            triggers: to_strings(&["ヨガ", "ダンベル", "トレーニング", "アウトドア", "キャンプ"]),
            budget_band: BudgetBand::Mid,
            risk_level: RiskLevel::Mid,
            risk_notes: "安全性に直結する防護具は慎重に。まずはヨガ・筋トレ小物中心。".to_string(),
            suggested_keywords: to_strings(&["瑜伽垫", "弹力带", "健身小器材", "户外折叠椅"]),
        },
    ]
}

/// Loads a rule-table override when one is configured, defaults otherwise.
pub fn load_rules(path: Option<&Path>) -> Result<Vec<CategoryRule>> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            let rules = serde_json::from_str(&raw)?;
            Ok(rules)
        }
        None => Ok(default_rules()),
    }
}

fn to_strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_matching_with_wildcard() {
        assert!(BudgetBand::Low.matches(BudgetBand::Low));
        assert!(!BudgetBand::Mid.matches(BudgetBand::Low));
        assert!(BudgetBand::All.matches(BudgetBand::Low));
        assert!(BudgetBand::Mid.matches(BudgetBand::All));
    }

    #[test]
    fn band_parses_from_cli_strings() {
        assert_eq!("low".parse::<BudgetBand>().unwrap(), BudgetBand::Low);
        assert_eq!(" High ".parse::<BudgetBand>().unwrap(), BudgetBand::High);
        assert!("luxury".parse::<BudgetBand>().is_err());
    }

    #[test]
    fn default_rules_have_triggers_and_keywords() {
        let rules = default_rules();
        assert_eq!(rules.len(), 5);
        for rule in &rules {
            assert!(!rule.triggers.is_empty());
            assert!(!rule.suggested_keywords.is_empty());
        }
    }
}
