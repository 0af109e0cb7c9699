//! Heuristic sub-scorers.
//!
//! Each scorer is a pure function of a product and the rule book, returning
//! a score plus the reasons that moved it - the reasons travel into the
//! output payload so the operator can see why a candidate ranked where it
//! did.

use crate::catalog::Product;

use super::rules::RuleBook;

/// Fit with the Japanese market based on title themes, supplier reputation
/// and demonstrated demand. Clamped to [0,1].
pub fn market_fit(product: &Product, rules: &RuleBook) -> (f64, Vec<String>) {
    let mut score: f64 = 0.5;
    let mut reasons = Vec::new();

    if rules
        .japan_fit_keywords
        .iter()
        .any(|k| product.title.contains(k.as_str()))
    {
        score += 0.2;
        reasons.push("title matches a Japan-friendly product theme".to_string());
    }

    if let Some(shop_score) = product.shop_score {
        if shop_score >= rules.high_reputation_threshold {
            score += 0.1;
            reasons.push("supplier shop score is high".to_string());
        }
    }

    if let Some(sales) = product.monthly_sales {
        if sales > rules.proven_sales_threshold {
            score += 0.1;
            reasons.push("monthly sales show proven demand".to_string());
        }
    }

    (score.clamp(0.0, 1.0), reasons)
}

/// Cross-border logistics feasibility. Heavy or bulky units eat the margin
/// in shipping. Clamped to [0,1].
pub fn logistics_feasibility(product: &Product, rules: &RuleBook) -> (f64, Vec<String>) {
    let mut score: f64 = 0.7;
    let mut reasons = Vec::new();

    if let Some(weight) = product.weight_kg {
        if weight > rules.heavy_weight_kg {
            score -= 0.2;
            reasons.push("unit weight is high for international shipping".to_string());
        }
    }

    if let Some(volume) = product.volume_cm3 {
        if volume > rules.bulky_volume_cm3 {
            score -= 0.2;
            reasons.push("unit volume is high for international shipping".to_string());
        }
    }

    (score.clamp(0.0, 1.0), reasons)
}

/// Brand/IP risk. A denylist hit is a single fixed penalty - one counterfeit
/// complaint can close the shop, so there is no partial credit. Not clamped.
pub fn risk_penalty(product: &Product, rules: &RuleBook) -> (f64, Vec<String>) {
    let mut penalty = 0.0;
    let mut notes = Vec::new();

    let title_upper = product.title.to_uppercase();
    if rules
        .brand_denylist
        .iter()
        .any(|w| title_upper.contains(&w.to_uppercase()))
    {
        penalty += rules.denylist_penalty;
        notes.push("title matches a brand/IP denylist entry".to_string());
    }

    (penalty, notes)
}

/// Quick relevance screen for keyword-search results, where only a title
/// and a price are reliably present: price band fit, Japan-friendly theme,
/// and overlap with the operator's direction keywords.
pub fn relevance_screen(
    product: &Product,
    min_price_cny: f64,
    max_price_cny: f64,
    directions: &[String],
    rules: &RuleBook,
) -> f64 {
    let mut score = 0.0;

    if product.price_cny >= min_price_cny && product.price_cny <= max_price_cny {
        score += 0.4;
    }

    if rules
        .relevance_keywords
        .iter()
        .any(|k| product.title.contains(k.as_str()))
    {
        score += 0.4;
    }

    if directions
        .iter()
        .any(|d| !d.is_empty() && product.title.contains(d.as_str()))
    {
        score += 0.2;
    }

    score
}
