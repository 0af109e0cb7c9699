use serde::{Deserialize, Serialize};

use crate::error::{MekikiError, Result};

/// A candidate supplier product as returned by the 1688 side.
///
/// Immutable once constructed; the evaluation pipeline owns the instances it
/// fetched and never writes back into them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub offer_id: String,
    /// Source-language (Chinese) listing title.
    pub title: String,
    pub price_cny: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_sales: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_cm3: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Product {
    pub fn new(offer_id: impl Into<String>, title: impl Into<String>, price_cny: f64) -> Result<Self> {
        let offer_id = offer_id.into();
        let title = title.into();

        if offer_id.trim().is_empty() {
            return Err(MekikiError::validation_error("product offer_id is empty"));
        }
        if title.trim().is_empty() {
            return Err(MekikiError::validation_error(format!(
                "product {} has an empty title",
                offer_id
            )));
        }
        if !price_cny.is_finite() || price_cny < 0.0 {
            return Err(MekikiError::validation_error(format!(
                "product {} has invalid price {}",
                offer_id, price_cny
            )));
        }

        Ok(Self {
            offer_id,
            title,
            price_cny,
            shop_score: None,
            monthly_sales: None,
            weight_kg: None,
            volume_cm3: None,
            tags: Vec::new(),
        })
    }
}

/// Per-invocation pricing parameters supplied by the operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingRequest {
    /// CNY -> JPY conversion rate.
    pub fx_rate: f64,
    /// Average international shipping per unit, in JPY.
    pub intl_shipping_jpy: f64,
    /// Platform commission as a fraction of the sale price.
    pub commission_rate: f64,
    /// Target gross margin as a fraction of the sale price.
    pub target_margin_rate: f64,
}

impl PricingRequest {
    pub fn new(
        fx_rate: f64,
        intl_shipping_jpy: f64,
        commission_rate: f64,
        target_margin_rate: f64,
    ) -> Result<Self> {
        if !fx_rate.is_finite() || fx_rate <= 0.0 {
            return Err(MekikiError::validation_error(format!(
                "fx_rate must be positive, got {}",
                fx_rate
            )));
        }
        if !intl_shipping_jpy.is_finite() || intl_shipping_jpy < 0.0 {
            return Err(MekikiError::validation_error(format!(
                "intl_shipping_jpy must be non-negative, got {}",
                intl_shipping_jpy
            )));
        }
        if !(0.0..1.0).contains(&commission_rate) {
            return Err(MekikiError::validation_error(format!(
                "commission_rate must be in [0,1), got {}",
                commission_rate
            )));
        }
        if !(0.0..1.0).contains(&target_margin_rate) {
            return Err(MekikiError::validation_error(format!(
                "target_margin_rate must be in [0,1), got {}",
                target_margin_rate
            )));
        }

        Ok(Self {
            fx_rate,
            intl_shipping_jpy,
            commission_rate,
            target_margin_rate,
        })
    }
}

impl Default for PricingRequest {
    /// Rough defaults for a Rakuten seller sourcing from 1688: 22 JPY to the
    /// yuan, 500 JPY shipping per unit, 15% platform fee, 20% target margin.
    fn default() -> Self {
        Self {
            fx_rate: 22.0,
            intl_shipping_jpy: 500.0,
            commission_rate: 0.15,
            target_margin_rate: 0.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_rejects_empty_id_and_bad_price() {
        assert!(Product::new("", "宠物梳", 12.0).is_err());
        assert!(Product::new("p1", "  ", 12.0).is_err());
        assert!(Product::new("p1", "宠物梳", -1.0).is_err());
        assert!(Product::new("p1", "宠物梳", f64::NAN).is_err());
        assert!(Product::new("p1", "宠物梳", 12.0).is_ok());
    }

    #[test]
    fn pricing_request_bounds() {
        assert!(PricingRequest::new(22.0, 500.0, 0.15, 0.2).is_ok());
        assert!(PricingRequest::new(0.0, 500.0, 0.15, 0.2).is_err());
        assert!(PricingRequest::new(22.0, -1.0, 0.15, 0.2).is_err());
        assert!(PricingRequest::new(22.0, 500.0, 1.0, 0.2).is_err());
        assert!(PricingRequest::new(22.0, 500.0, 0.15, 1.0).is_err());
        // A commission + margin sum over 1.0 is legal input; the projector
        // applies its fallback denominator instead of rejecting it.
        assert!(PricingRequest::new(22.0, 500.0, 0.6, 0.6).is_ok());
    }
}
