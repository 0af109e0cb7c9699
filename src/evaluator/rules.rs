//! The scoring rule book: keyword sets and thresholds behind the heuristic
//! sub-scorers.
//!
//! These are editorial choices, not algorithm constants - which brands are
//! risky, which product themes sell in Japan. They ship as compiled-in
//! defaults, can be replaced wholesale from a JSON file, and are immutable
//! once the process is up: scoring functions borrow the book and never
//! write to it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleBook {
    /// Chinese title keywords for product themes that sell well in Japan.
    pub japan_fit_keywords: Vec<String>,
    /// Supplier shop score at or above which we trust the shop.
    pub high_reputation_threshold: f64,
    /// Monthly sales above which demand is considered proven.
    pub proven_sales_threshold: u32,
    /// Unit weight above which international shipping gets painful.
    pub heavy_weight_kg: f64,
    /// Unit volume above which international shipping gets painful.
    pub bulky_volume_cm3: f64,
    /// Brand/IP terms that make a listing unsellable; substring match
    /// against the uppercased title.
    pub brand_denylist: Vec<String>,
    /// Penalty applied when a denylist term matches.
    pub denylist_penalty: f64,
    /// Broader keyword set for the quick relevance screen.
    pub relevance_keywords: Vec<String>,
}

impl Default for RuleBook {
    fn default() -> Self {
        Self {
            japan_fit_keywords: to_strings(&["收纳", "整理", "宠物", "猫", "狗"]),
            high_reputation_threshold: 4.7,
            proven_sales_threshold: 100,
            heavy_weight_kg: 2.0,
            bulky_volume_cm3: 40_000.0,
            brand_denylist: to_strings(&["迪士尼", "耐克", "阿迪达斯", "LV", "GUCCI", "香奈儿"]),
            denylist_penalty: 0.7,
            relevance_keywords: to_strings(&["收纳", "宠物", "北欧", "简约", "厨房", "生活", "整理"]),
        }
    }
}

impl RuleBook {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let book = serde_json::from_str(&raw)?;
        Ok(book)
    }

    /// Loads the override file when one is configured, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

fn to_strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_book_matches_shipped_rules() {
        let book = RuleBook::default();
        assert!(book.japan_fit_keywords.iter().any(|k| k == "宠物"));
        assert_eq!(book.denylist_penalty, 0.7);
        assert_eq!(book.high_reputation_threshold, 4.7);
    }

    #[test]
    fn json_override_round_trips() {
        let book = RuleBook::default();
        let dir = std::env::temp_dir().join("mekiki_rules_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rules.json");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(serde_json::to_string(&book).unwrap().as_bytes())
            .unwrap();
        drop(f);

        let loaded = RuleBook::load(Some(&path)).unwrap();
        assert_eq!(loaded.brand_denylist, book.brand_denylist);

        std::fs::remove_file(&path).ok();
    }
}
