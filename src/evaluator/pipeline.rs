//! The candidate evaluation pipeline: projection, sub-scores, grade,
//! marketing bullets, and the optional advisory override.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::advisor::Advisor;
use crate::catalog::{PricingRequest, Product};

use super::grader::{grade_candidate, grade_screen, Grade};
use super::projector;
use super::rules::RuleBook;
use super::scorer;
use super::ScoreBreakdown;

const MAX_BULLETS: usize = 4;

/// A fully evaluated candidate, ready for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult {
    pub product: Product,
    pub breakdown: ScoreBreakdown,
    pub total_cost_jpy: f64,
    /// Suggested Rakuten-side price, rounded to whole yen.
    pub suggested_price_jpy: f64,
    pub grade: Grade,
    /// Japanese marketing bullets for the listing draft.
    pub bullets: Vec<String>,
    /// Why the sub-scores moved; developer/operator observability.
    pub reasons: Vec<String>,
    pub risk_notes: Vec<String>,
    /// True when an advisory override was applied on top of the rules.
    pub advisory_applied: bool,
}

/// A quick-screen row for keyword search results: relevance score, price
/// projection and the screen-policy grade, nothing more.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenedItem {
    pub offer_id: String,
    pub title: String,
    pub price_cny: f64,
    pub score: f64,
    pub suggested_price_jpy: f64,
    pub margin_rate: f64,
    pub grade: Grade,
}

pub struct CandidatePipeline<'a> {
    rules: &'a RuleBook,
    advisor: Option<&'a dyn Advisor>,
}

impl<'a> CandidatePipeline<'a> {
    pub fn new(rules: &'a RuleBook) -> Self {
        Self {
            rules,
            advisor: None,
        }
    }

    pub fn with_advisor(mut self, advisor: &'a dyn Advisor) -> Self {
        self.advisor = Some(advisor);
        self
    }

    /// Evaluates one product against one pricing request.
    ///
    /// Steps: margin projection, the three sub-scorers, grade, bullets,
    /// then the optional advisory refinement. Advisory failure of any kind
    /// keeps the rule-based result and leaves a note; it never aborts.
    pub async fn evaluate(
        &self,
        product: Product,
        pricing: &PricingRequest,
        directions: &[String],
    ) -> CandidateResult {
        let projection = projector::project(product.price_cny, pricing);

        let (market_fit, fit_reasons) = scorer::market_fit(&product, self.rules);
        let (logistics, logistics_reasons) = scorer::logistics_feasibility(&product, self.rules);
        let (risk_penalty, mut risk_notes) = scorer::risk_penalty(&product, self.rules);

        let mut breakdown = ScoreBreakdown {
            market_fit,
            logistics,
            risk_penalty,
            margin_rate: projection.margin_rate,
            total_score: ScoreBreakdown::total_of(
                market_fit,
                projection.margin_rate,
                logistics,
                risk_penalty,
            ),
        };

        let mut grade = grade_candidate(breakdown.total_score, breakdown.margin_rate, risk_penalty);
        let mut bullets = build_bullets(&product, directions);
        let mut reasons = fit_reasons;
        reasons.extend(logistics_reasons);

        let mut advisory_applied = false;
        if let Some(advisor) = self.advisor {
            match advisor
                .evaluate_candidate(&product, &projection, directions)
                .await
            {
                Ok(advice) => {
                    advisory_applied = true;
                    if let Some(fit) = advice.japan_fit_score {
                        breakdown.market_fit = fit.clamp(0.0, 1.0);
                        breakdown.total_score = ScoreBreakdown::total_of(
                            breakdown.market_fit,
                            breakdown.margin_rate,
                            breakdown.logistics,
                            breakdown.risk_penalty,
                        );
                        grade = grade_candidate(
                            breakdown.total_score,
                            breakdown.margin_rate,
                            breakdown.risk_penalty,
                        );
                    }
                    if let Some(advised_grade) = advice.grade {
                        grade = advised_grade;
                    }
                    if !advice.jp_bullets.is_empty() {
                        bullets = advice.jp_bullets;
                        bullets.truncate(MAX_BULLETS);
                    }
                    risk_notes.extend(advice.risk_notes);
                    debug!("Advisory override applied for {}", product.offer_id);
                }
                Err(e) => {
                    warn!("Advisory call failed for {}: {}", product.offer_id, e);
                    risk_notes.push(format!(
                        "AI評価に失敗したため、ルールベースで算出しました。(error: {})",
                        e
                    ));
                }
            }
        }

        CandidateResult {
            product,
            breakdown,
            total_cost_jpy: projection.total_cost_jpy,
            suggested_price_jpy: projection.suggested_price_jpy.round(),
            grade,
            bullets,
            reasons,
            risk_notes,
            advisory_applied,
        }
    }

    /// Evaluates a batch and returns it sorted by score, best first.
    /// The sort is stable, so equal scores keep their input order.
    pub async fn evaluate_all(
        &self,
        products: Vec<Product>,
        pricing: &PricingRequest,
        directions: &[String],
    ) -> Vec<CandidateResult> {
        let mut results = Vec::with_capacity(products.len());
        for product in products {
            results.push(self.evaluate(product, pricing, directions).await);
        }
        results.sort_by(|a, b| b.breakdown.total_score.total_cmp(&a.breakdown.total_score));
        results
    }
}

/// Quick screen for keyword-search candidates: price-band filter, relevance
/// score, projection, screen-policy grade. Sorted by score, best first.
pub fn screen(
    products: Vec<Product>,
    min_price_cny: f64,
    max_price_cny: f64,
    directions: &[String],
    pricing: &PricingRequest,
    rules: &RuleBook,
) -> Vec<ScreenedItem> {
    let mut items: Vec<ScreenedItem> = products
        .into_iter()
        .filter(|p| p.price_cny >= min_price_cny && p.price_cny <= max_price_cny)
        .map(|p| {
            let score = scorer::relevance_screen(&p, min_price_cny, max_price_cny, directions, rules);
            let projection = projector::project(p.price_cny, pricing);
            ScreenedItem {
                offer_id: p.offer_id,
                title: p.title,
                price_cny: p.price_cny,
                score: round3(score),
                suggested_price_jpy: projection.suggested_price_jpy.round(),
                margin_rate: round3(projection.margin_rate),
                grade: grade_screen(score, projection.margin_rate),
            }
        })
        .collect();

    items.sort_by(|a, b| b.score.total_cmp(&a.score));
    items
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

/// Template-based Japanese marketing bullets: one generic line, category
/// lines triggered by title keywords, one line per direction keyword,
/// capped at four.
fn build_bullets(product: &Product, directions: &[String]) -> Vec<String> {
    let title = product.title.as_str();
    let mut bullets = vec!["中国工場から直送されるコストパフォーマンスの高いアイテムです。".to_string()];

    if title.contains("宠物") {
        bullets.push("ペットとの暮らしで役立つ実用的なアイテムです。".to_string());
    }
    if title.contains("除毛") || title.contains("粘毛") {
        bullets.push("ソファや服についた抜け毛を手軽にお手入れできます。".to_string());
    }
    if title.contains("厨房") || title.contains("キッチン") {
        bullets.push("キッチン周りの小物を省スペースでスッキリ収納できます。".to_string());
    }
    if title.contains("收纳") || title.contains("收納") {
        bullets.push("限られたスペースでも整理しやすい収納デザインです。".to_string());
    }

    for direction in directions {
        if bullets.len() >= MAX_BULLETS {
            break;
        }
        if !direction.is_empty() {
            bullets.push(format!("{}用途としても活用いただけます。", direction));
        }
    }

    bullets.truncate(MAX_BULLETS);
    bullets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::AdvisoryOverride;
    use crate::catalog::demo::demo_products;
    use crate::error::{MekikiError, Result};
    use crate::evaluator::projector::Projection;
    use async_trait::async_trait;

    struct FixedAdvisor {
        advice: AdvisoryOverride,
    }

    #[async_trait]
    impl Advisor for FixedAdvisor {
        async fn evaluate_candidate(
            &self,
            _product: &Product,
            _projection: &Projection,
            _directions: &[String],
        ) -> Result<AdvisoryOverride> {
            Ok(self.advice.clone())
        }
    }

    struct FailingAdvisor;

    #[async_trait]
    impl Advisor for FailingAdvisor {
        async fn evaluate_candidate(
            &self,
            _product: &Product,
            _projection: &Projection,
            _directions: &[String],
        ) -> Result<AdvisoryOverride> {
            Err(MekikiError::advisory_error("request timed out"))
        }
    }

    fn pet_brush() -> Product {
        demo_products().into_iter().next().unwrap()
    }

    #[tokio::test]
    async fn rule_based_evaluation_of_the_pet_brush() {
        let rules = RuleBook::default();
        let pipeline = CandidatePipeline::new(&rules);
        let pricing = PricingRequest::default();

        let result = pipeline
            .evaluate(pet_brush(), &pricing, &["宠物".to_string()])
            .await;

        assert!((result.breakdown.market_fit - 0.9).abs() < 1e-12);
        assert!((result.breakdown.logistics - 0.7).abs() < 1e-12);
        assert_eq!(result.breakdown.risk_penalty, 0.0);
        assert!((result.breakdown.margin_rate - 0.2).abs() < 1e-9);
        // 0.4*0.9 + 0.4*0.2 + 0.2*0.7 = 0.58
        assert!((result.breakdown.total_score - 0.58).abs() < 1e-9);
        assert_eq!(result.grade, Grade::B);
        assert_eq!(result.suggested_price_jpy, 1345.0);
        assert!(!result.advisory_applied);
        assert!(!result.bullets.is_empty());
        assert!(result.bullets.len() <= 4);
    }

    #[tokio::test]
    async fn denylisted_title_is_graded_c() {
        let rules = RuleBook::default();
        let pipeline = CandidatePipeline::new(&rules);
        let pricing = PricingRequest::default();
        let mut product = pet_brush();
        product.title = "GUCCI风 宠物项圈".to_string();

        let result = pipeline.evaluate(product, &pricing, &[]).await;
        assert_eq!(result.breakdown.risk_penalty, 0.7);
        assert_eq!(result.grade, Grade::C);
        assert!(!result.risk_notes.is_empty());
    }

    #[tokio::test]
    async fn advisory_failure_keeps_rule_result_and_leaves_a_note() {
        let rules = RuleBook::default();
        let advisor = FailingAdvisor;
        let pipeline = CandidatePipeline::new(&rules).with_advisor(&advisor);
        let pricing = PricingRequest::default();

        let plain = CandidatePipeline::new(&rules)
            .evaluate(pet_brush(), &pricing, &[])
            .await;
        let with_failed_advice = pipeline.evaluate(pet_brush(), &pricing, &[]).await;

        assert_eq!(plain.grade, with_failed_advice.grade);
        assert!(
            (plain.breakdown.total_score - with_failed_advice.breakdown.total_score).abs() < 1e-12
        );
        assert!(!with_failed_advice.advisory_applied);
        assert!(with_failed_advice
            .risk_notes
            .iter()
            .any(|n| n.contains("ルールベース")));
    }

    #[tokio::test]
    async fn advisory_override_replaces_fit_and_grade() {
        let rules = RuleBook::default();
        let advisor = FixedAdvisor {
            advice: AdvisoryOverride {
                japan_fit_score: Some(1.0),
                grade: Some(Grade::A),
                risk_notes: vec!["模倣品の出品に注意".to_string()],
                jp_bullets: vec!["ペットの抜け毛対策にぴったりです。".to_string()],
            },
        };
        let pipeline = CandidatePipeline::new(&rules).with_advisor(&advisor);
        let pricing = PricingRequest::default();

        let result = pipeline.evaluate(pet_brush(), &pricing, &[]).await;
        assert!(result.advisory_applied);
        assert_eq!(result.breakdown.market_fit, 1.0);
        assert_eq!(result.grade, Grade::A);
        assert_eq!(result.bullets.len(), 1);
        assert!(result.risk_notes.iter().any(|n| n.contains("模倣品")));
    }

    #[tokio::test]
    async fn batches_sort_descending_and_are_idempotent() {
        let rules = RuleBook::default();
        let pipeline = CandidatePipeline::new(&rules);
        let pricing = PricingRequest::default();

        let first = pipeline
            .evaluate_all(demo_products(), &pricing, &[])
            .await;
        let second = pipeline
            .evaluate_all(demo_products(), &pricing, &[])
            .await;

        assert!(first
            .windows(2)
            .all(|w| w[0].breakdown.total_score >= w[1].breakdown.total_score));
        let ids: Vec<_> = first.iter().map(|r| r.product.offer_id.clone()).collect();
        let ids_again: Vec<_> = second.iter().map(|r| r.product.offer_id.clone()).collect();
        assert_eq!(ids, ids_again);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.grade, b.grade);
            assert_eq!(a.suggested_price_jpy, b.suggested_price_jpy);
        }
    }

    #[test]
    fn screen_filters_band_scores_and_grades() {
        let rules = RuleBook::default();
        let pricing = PricingRequest::default();
        let items = screen(demo_products(), 5.0, 20.0, &["宠物".to_string()], &pricing, &rules);

        // The 25-yuan headset is out of band.
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.price_cny <= 20.0));
        // Pet brush: in band (+0.4), theme (+0.4), direction (+0.2).
        assert_eq!(items[0].offer_id, "p1");
        assert!((items[0].score - 1.0).abs() < 1e-12);
        assert_eq!(items[0].grade, Grade::B);
        assert!(items[0].score >= items[1].score);
    }

    #[test]
    fn bullets_are_capped_at_four() {
        let product = Product::new("b1", "宠物除毛刷 厨房收纳两用", 9.0).unwrap();
        let directions = vec!["宠物".to_string(), "厨房".to_string(), "收纳".to_string()];
        let bullets = build_bullets(&product, &directions);
        assert_eq!(bullets.len(), 4);
        assert!(bullets[0].contains("中国工場"));
    }
}
