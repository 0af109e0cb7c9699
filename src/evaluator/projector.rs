//! Landed-cost and margin projection.
//!
//! Pure arithmetic, total over its domain: the one degenerate input
//! (commission + target margin eating the whole price) is handled by a
//! fallback denominator instead of an error.

use serde::{Deserialize, Serialize};

use crate::catalog::PricingRequest;

/// Fixed per-unit domestic (China-side) shipping, in CNY.
pub const DOMESTIC_SHIPPING_CNY: f64 = 5.0;

/// Margin floor used when the requested commission + margin is infeasible.
const FALLBACK_MARGIN_RATE: f64 = 0.05;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Projection {
    /// Landed cost in JPY: unit + domestic shipping converted, plus
    /// international shipping.
    pub total_cost_jpy: f64,
    pub suggested_price_jpy: f64,
    /// Margin realized at the suggested price. Equals the target unless the
    /// fallback denominator kicked in.
    pub margin_rate: f64,
}

/// Projects a suggested sale price and realized margin for one unit.
///
/// The price solves `P * (1 - commission) - total_cost = target_margin * P`;
/// when `1 - commission - target_margin <= 0` we price for a 5% margin
/// instead so the result stays positive and finite.
pub fn project(price_cny: f64, pricing: &PricingRequest) -> Projection {
    let base_cost_jpy = (price_cny + DOMESTIC_SHIPPING_CNY) * pricing.fx_rate;
    let total_cost_jpy = base_cost_jpy + pricing.intl_shipping_jpy;

    let mut denom = 1.0 - pricing.commission_rate - pricing.target_margin_rate;
    if denom <= 0.0 {
        denom = 1.0 - pricing.commission_rate - FALLBACK_MARGIN_RATE;
    }

    let suggested_price_jpy = total_cost_jpy / denom;

    let margin_rate = (suggested_price_jpy * (1.0 - pricing.commission_rate) - total_cost_jpy)
        / suggested_price_jpy;

    Projection {
        total_cost_jpy,
        suggested_price_jpy,
        margin_rate,
    }
}

// ---------------------------------------------------------------------------
// Batch profit simulation for listings that already have a sale price.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimItem {
    pub product_id: String,
    pub title: String,
    /// 1688 purchase price.
    pub cost_cny: f64,
    /// Estimated unit shipping China -> Japan, in CNY.
    #[serde(default)]
    pub shipping_cny: f64,
    /// Planned tax-included sale price on the marketplace.
    pub sell_price_jpy: f64,
    /// Other fixed costs per unit (packaging, warehouse handling), in JPY.
    #[serde(default)]
    pub other_fee_jpy: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimResult {
    pub product_id: String,
    pub title: String,
    pub total_cost_jpy: f64,
    pub platform_fee_jpy: f64,
    pub gross_profit_jpy: f64,
    pub margin_rate: f64,
    /// Operator-facing advice, tiered by margin.
    pub advice: String,
}

/// Simulates the profit of one priced listing.
pub fn simulate(item: &SimItem, fx_rate: f64, fee_rate: f64) -> SimResult {
    let total_cost_jpy = (item.cost_cny + item.shipping_cny) * fx_rate + item.other_fee_jpy;
    let platform_fee_jpy = item.sell_price_jpy * fee_rate;
    let gross_profit_jpy = item.sell_price_jpy - total_cost_jpy - platform_fee_jpy;
    let margin_rate = if item.sell_price_jpy > 0.0 {
        gross_profit_jpy / item.sell_price_jpy
    } else {
        0.0
    };

    let advice = if gross_profit_jpy <= 0.0 {
        "赤字。仕入価格または販売価格を見直してください。"
    } else if margin_rate < 0.1 {
        "利益率が低め（10％未満）。セット販売・まとめ買いなどを検討。"
    } else if margin_rate < 0.25 {
        "標準的な利益率。広告費をどこまで乗せられるか試算してください。"
    } else {
        "高めの利益率。優先的にテスト出品候補。"
    };

    SimResult {
        product_id: item.product_id.clone(),
        title: item.title.clone(),
        total_cost_jpy: total_cost_jpy.round(),
        platform_fee_jpy: platform_fee_jpy.round(),
        gross_profit_jpy: gross_profit_jpy.round(),
        margin_rate: (margin_rate * 1000.0).round() / 1000.0,
        advice: advice.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pricing(fx: f64, ship: f64, r: f64, m: f64) -> PricingRequest {
        PricingRequest::new(fx, ship, r, m).unwrap()
    }

    #[test]
    fn worked_example_from_the_field() {
        // 12 CNY unit, 22 JPY/CNY, 500 JPY shipping, 15% fee, 20% margin.
        let p = project(12.0, &pricing(22.0, 500.0, 0.15, 0.2));
        assert_eq!(p.total_cost_jpy, (12.0 + 5.0) * 22.0 + 500.0); // 874
        assert!((p.suggested_price_jpy - 874.0 / 0.65).abs() < 1e-9);
        assert_eq!(p.suggested_price_jpy.round(), 1345.0);
        assert!((p.margin_rate - 0.2).abs() < 1e-9);
    }

    #[test]
    fn infeasible_target_falls_back_to_five_percent() {
        // 60% commission + 60% target margin cannot both hold.
        let p = project(10.0, &pricing(22.0, 500.0, 0.6, 0.6));
        assert!(p.suggested_price_jpy > 0.0);
        assert!((p.margin_rate - 0.05).abs() < 1e-9);
    }

    #[test]
    fn boundary_denominator_also_falls_back() {
        // r + m == 1.0 exactly.
        let p = project(10.0, &pricing(22.0, 0.0, 0.5, 0.5));
        assert!(p.suggested_price_jpy.is_finite());
        assert!(p.suggested_price_jpy > 0.0);
        assert!((p.margin_rate - 0.05).abs() < 1e-9);
    }

    proptest! {
        /// Whenever the target is feasible, the realized margin equals it.
        #[test]
        fn realized_margin_hits_feasible_target(
            price_cny in 0.01f64..10_000.0,
            fx in 1.0f64..200.0,
            ship in 0.0f64..5_000.0,
            r in 0.0f64..0.5,
            m in 0.0f64..0.45,
        ) {
            prop_assume!(r + m < 0.95);
            let p = project(price_cny, &pricing(fx, ship, r, m));
            prop_assert!((p.margin_rate - m).abs() < 1e-6);
            prop_assert!(p.suggested_price_jpy > 0.0);
        }
    }

    #[test]
    fn simulation_tiers_advice_by_margin() {
        let loss = simulate(
            &SimItem {
                product_id: "p1".into(),
                title: "宠物除毛刷".into(),
                cost_cny: 50.0,
                shipping_cny: 10.0,
                sell_price_jpy: 800.0,
                other_fee_jpy: 0.0,
            },
            21.0,
            0.15,
        );
        assert!(loss.gross_profit_jpy <= 0.0);
        assert!(loss.advice.contains("赤字"));

        let healthy = simulate(
            &SimItem {
                product_id: "p2".into(),
                title: "收纳盒".into(),
                cost_cny: 10.0,
                shipping_cny: 2.0,
                sell_price_jpy: 1500.0,
                other_fee_jpy: 50.0,
            },
            21.0,
            0.15,
        );
        assert!(healthy.margin_rate >= 0.25);
        assert!(healthy.advice.contains("テスト出品"));
    }

    #[test]
    fn zero_sell_price_does_not_divide_by_zero() {
        let r = simulate(
            &SimItem {
                product_id: "p0".into(),
                title: "x".into(),
                cost_cny: 1.0,
                shipping_cny: 0.0,
                sell_price_jpy: 0.0,
                other_fee_jpy: 0.0,
            },
            21.0,
            0.15,
        );
        assert_eq!(r.margin_rate, 0.0);
    }
}
