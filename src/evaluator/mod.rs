pub mod rules;
pub mod projector;
pub mod scorer;
pub mod grader;
pub mod pipeline;

pub use grader::Grade;
pub use pipeline::{CandidatePipeline, CandidateResult};
pub use rules::RuleBook;

use serde::{Deserialize, Serialize};

/// Weights of the fixed linear combination behind `total_score`.
pub const MARKET_FIT_WEIGHT: f64 = 0.4;
pub const MARGIN_WEIGHT: f64 = 0.4;
pub const LOGISTICS_WEIGHT: f64 = 0.2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Fit with the Japanese market, clamped to [0,1].
    pub market_fit: f64,
    /// Cross-border logistics feasibility, clamped to [0,1].
    pub logistics: f64,
    /// Brand/IP risk penalty; 0 unless a denylist rule fired.
    pub risk_penalty: f64,
    /// Realized margin at the suggested price; may be negative.
    pub margin_rate: f64,
    pub total_score: f64,
}

impl ScoreBreakdown {
    pub fn total_of(market_fit: f64, margin_rate: f64, logistics: f64, risk_penalty: f64) -> f64 {
        MARKET_FIT_WEIGHT * market_fit + MARGIN_WEIGHT * margin_rate
            + LOGISTICS_WEIGHT * logistics
            - risk_penalty
    }
}
