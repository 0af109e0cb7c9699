pub mod rules;
pub mod sources;
pub mod selector;

pub use rules::{BudgetBand, CategoryRule, RiskLevel};
pub use selector::{CategorySuggestion, TrendQuery, TrendSelector};
pub use sources::{AmazonTrends, RakutenRanking, TrendSource};
