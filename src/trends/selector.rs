//! The trend category selector: classify observed titles, merge sources,
//! filter by the operator's constraints, rank, and degrade to the static
//! table when the outside world is unavailable.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Sourced;

use super::rules::{BudgetBand, CategoryRule, RiskLevel};
use super::sources::{TrendSource, DEFAULT_TITLE_LIMIT};

/// One recommended category, with the evidence that put it on the list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySuggestion {
    /// Which marketplace signal produced this entry.
    pub source: String,
    pub category: String,
    pub scene: String,
    pub budget_band: BudgetBand,
    pub risk_level: RiskLevel,
    pub risk_notes: String,
    pub suggested_keywords: Vec<String>,
    /// How many observed titles hit this category's triggers; 0 for static
    /// fallback entries, which carry no observation.
    pub hits: u32,
}

#[derive(Debug, Clone)]
pub struct TrendQuery {
    pub budget: BudgetBand,
    /// Categories the operator wants to stay away from; substring match
    /// over the category name and its suggested keywords.
    pub avoid: Vec<String>,
    pub top_k: usize,
}

/// Counts trigger hits per rule over the observed titles. Rules nobody hit
/// do not appear; rule-table order breaks nothing because the selector
/// sorts by hits later.
pub fn classify_titles(
    titles: &[String],
    rules: &[CategoryRule],
    source: &str,
) -> Vec<CategorySuggestion> {
    let mut suggestions: Vec<CategorySuggestion> = Vec::new();

    for title in titles {
        for rule in rules {
            if !rule.triggers.iter().any(|t| title.contains(t.as_str())) {
                continue;
            }
            match suggestions.iter_mut().find(|s| s.category == rule.category) {
                Some(existing) => existing.hits += 1,
                None => suggestions.push(CategorySuggestion {
                    source: source.to_string(),
                    category: rule.category.clone(),
                    scene: rule.scene.clone(),
                    budget_band: rule.budget_band,
                    risk_level: rule.risk_level,
                    risk_notes: rule.risk_notes.clone(),
                    suggested_keywords: rule.suggested_keywords.clone(),
                    hits: 1,
                }),
            }
        }
    }

    suggestions
}

pub struct TrendSelector<'a> {
    rules: &'a [CategoryRule],
    sources: Vec<Box<dyn TrendSource>>,
}

impl<'a> TrendSelector<'a> {
    pub fn new(rules: &'a [CategoryRule], sources: Vec<Box<dyn TrendSource>>) -> Self {
        Self { rules, sources }
    }

    /// Produces up to `top_k` category suggestions.
    ///
    /// Sources are queried independently (they share nothing) and their
    /// candidate lists concatenated before one final sort and truncate.
    /// When every source fails or nothing survives classification, the
    /// static rule table stands in - budget and avoid filters still apply,
    /// and the caller sees the degradation.
    pub async fn suggest(&self, query: &TrendQuery) -> Sourced<Vec<CategorySuggestion>> {
        let fetches = self
            .sources
            .iter()
            .map(|source| source.suggestions(self.rules, DEFAULT_TITLE_LIMIT));
        let outcomes = join_all(fetches).await;

        let mut candidates: Vec<CategorySuggestion> = Vec::new();
        let mut failures: Vec<String> = Vec::new();
        for (source, outcome) in self.sources.iter().zip(outcomes) {
            match outcome {
                Ok(suggestions) => {
                    info!("{} produced {} category candidates", source.name(), suggestions.len());
                    candidates.extend(suggestions);
                }
                Err(e) => {
                    warn!("Trend source {} failed: {}", source.name(), e);
                    failures.push(format!("{}: {}", source.name(), e));
                }
            }
        }

        let filtered = apply_filters(candidates, query);

        if filtered.is_empty() {
            let reason = if failures.is_empty() {
                "trend sources yielded no matching categories".to_string()
            } else {
                format!("trend sources failed ({})", failures.join("; "))
            };
            let fallback = apply_filters(static_suggestions(self.rules), query);
            return Sourced::degraded(rank_and_truncate(fallback, query.top_k), reason);
        }

        Sourced::Fresh(rank_and_truncate(filtered, query.top_k))
    }
}

/// The rule table itself as zero-hit suggestions, for when no live signal
/// is available.
fn static_suggestions(rules: &[CategoryRule]) -> Vec<CategorySuggestion> {
    rules
        .iter()
        .map(|rule| CategorySuggestion {
            source: "static".to_string(),
            category: rule.category.clone(),
            scene: rule.scene.clone(),
            budget_band: rule.budget_band,
            risk_level: rule.risk_level,
            risk_notes: rule.risk_notes.clone(),
            suggested_keywords: rule.suggested_keywords.clone(),
            hits: 0,
        })
        .collect()
}

fn apply_filters(candidates: Vec<CategorySuggestion>, query: &TrendQuery) -> Vec<CategorySuggestion> {
    candidates
        .into_iter()
        .filter(|c| c.budget_band.matches(query.budget))
        .filter(|c| {
            let haystack = format!("{} {}", c.category, c.suggested_keywords.join(" "));
            !query
                .avoid
                .iter()
                .any(|term| !term.is_empty() && haystack.contains(term.as_str()))
        })
        .collect()
}

fn rank_and_truncate(mut candidates: Vec<CategorySuggestion>, top_k: usize) -> Vec<CategorySuggestion> {
    candidates.sort_by(|a, b| b.hits.cmp(&a.hits));
    candidates.truncate(top_k);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MekikiError, Result};
    use crate::trends::rules::default_rules;
    use async_trait::async_trait;

    struct TitleSource {
        titles: Vec<String>,
    }

    #[async_trait]
    impl TrendSource for TitleSource {
        fn name(&self) -> &str {
            "stub"
        }

        async fn suggestions(
            &self,
            rules: &[CategoryRule],
            _title_limit: usize,
        ) -> Result<Vec<CategorySuggestion>> {
            Ok(classify_titles(&self.titles, rules, self.name()))
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl TrendSource for BrokenSource {
        fn name(&self) -> &str {
            "broken"
        }

        async fn suggestions(
            &self,
            _rules: &[CategoryRule],
            _title_limit: usize,
        ) -> Result<Vec<CategorySuggestion>> {
            Err(MekikiError::trend_source_error("connection refused"))
        }
    }

    fn titles(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn classification_counts_hits_per_category() {
        let rules = default_rules();
        let observed = titles(&["収納ラック", "収納ボックス", "キッチン鍋"]);
        let suggestions = classify_titles(&observed, &rules, "rakuten");

        let storage = suggestions.iter().find(|s| s.category.contains("収納")).unwrap();
        let kitchen = suggestions.iter().find(|s| s.category.contains("キッチン")).unwrap();
        assert_eq!(storage.hits, 2);
        assert_eq!(kitchen.hits, 1);
    }

    #[tokio::test]
    async fn storage_category_ranks_first_for_the_observed_week() {
        let rules = default_rules();
        let selector = TrendSelector::new(
            &rules,
            vec![Box::new(TitleSource {
                titles: titles(&["収納ラック", "収納ボックス", "キッチン鍋"]),
            })],
        );
        let query = TrendQuery {
            budget: BudgetBand::Low,
            avoid: vec![],
            top_k: 5,
        };

        let outcome = selector.suggest(&query).await;
        assert!(!outcome.is_degraded());
        let suggestions = outcome.data();
        assert!(suggestions[0].category.contains("収納"));
        assert_eq!(suggestions[0].hits, 2);
    }

    #[tokio::test]
    async fn avoid_terms_filter_by_name_and_keywords() {
        let rules = default_rules();
        let selector = TrendSelector::new(
            &rules,
            vec![Box::new(TitleSource {
                titles: titles(&["収納ラック", "ペットのトイレシート"]),
            })],
        );
        let query = TrendQuery {
            budget: BudgetBand::Low,
            avoid: vec!["ペット".to_string()],
            top_k: 5,
        };

        let outcome = selector.suggest(&query).await;
        let suggestions = outcome.data();
        assert!(suggestions.iter().all(|s| !s.category.contains("ペット")));
        assert!(suggestions.iter().any(|s| s.category.contains("収納")));
    }

    #[tokio::test]
    async fn budget_band_filters_candidates() {
        let rules = default_rules();
        let selector = TrendSelector::new(
            &rules,
            vec![Box::new(TitleSource {
                titles: titles(&["収納ラック", "ヨガマット", "キャンプ チェア"]),
            })],
        );
        let query = TrendQuery {
            budget: BudgetBand::Mid,
            avoid: vec![],
            top_k: 5,
        };

        let outcome = selector.suggest(&query).await;
        let suggestions = outcome.data();
        assert!(suggestions.iter().all(|s| s.budget_band == BudgetBand::Mid));
        assert!(suggestions.iter().any(|s| s.category.contains("アウトドア")));
    }

    #[tokio::test]
    async fn source_failure_degrades_to_the_static_table() {
        let rules = default_rules();
        let selector = TrendSelector::new(&rules, vec![Box::new(BrokenSource)]);
        let query = TrendQuery {
            budget: BudgetBand::Low,
            avoid: vec![],
            top_k: 3,
        };

        let outcome = selector.suggest(&query).await;
        assert!(outcome.is_degraded());
        assert!(outcome.reason().unwrap_or_default().contains("broken"));
        let suggestions = outcome.data();
        assert!(!suggestions.is_empty());
        assert!(suggestions.len() <= 3);
        assert!(suggestions.iter().all(|s| s.source == "static" && s.hits == 0));
    }

    #[tokio::test]
    async fn multiple_sources_are_concatenated_before_ranking() {
        let rules = default_rules();
        let selector = TrendSelector::new(
            &rules,
            vec![
                Box::new(TitleSource {
                    titles: titles(&["キッチン鍋"]),
                }),
                Box::new(TitleSource {
                    titles: titles(&["収納ラック", "収納ケース", "収納ボックス"]),
                }),
            ],
        );
        let query = TrendQuery {
            budget: BudgetBand::All,
            avoid: vec![],
            top_k: 5,
        };

        let outcome = selector.suggest(&query).await;
        let suggestions = outcome.data();
        assert!(suggestions[0].category.contains("収納"));
        assert_eq!(suggestions[0].hits, 3);
        assert!(suggestions.iter().any(|s| s.category.contains("キッチン")));
    }
}
