//! Tabular output.
//!
//! Candidate lists flatten into one row per candidate with a fixed column
//! order; multi-valued fields are joined with " / ". A UTF-8 BOM is
//! prepended so Excel opens the Japanese/Chinese text correctly.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::evaluator::pipeline::ScreenedItem;
use crate::evaluator::{CandidateResult, Grade};
use crate::trends::RiskLevel;

const BOM: &str = "\u{feff}";
const JOIN: &str = " / ";

/// One flattened row of `market-auto-select` output: the category that was
/// hot, the keyword we fed into 1688, and the screened item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketRow {
    pub category: String,
    pub scene: String,
    pub risk_level: RiskLevel,
    pub search_keyword: String,
    pub offer_id: String,
    pub title: String,
    pub price_cny: f64,
    pub score: f64,
    pub grade: Grade,
}

pub fn candidates_to_csv(results: &[CandidateResult]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "offer_id",
        "title",
        "price_cny",
        "market_fit",
        "logistics",
        "risk_penalty",
        "margin_rate",
        "total_score",
        "suggested_price_jpy",
        "grade",
        "bullets",
        "risk_notes",
    ])?;

    for result in results {
        writer.write_record([
            result.product.offer_id.clone(),
            result.product.title.clone(),
            result.product.price_cny.to_string(),
            round3(result.breakdown.market_fit).to_string(),
            round3(result.breakdown.logistics).to_string(),
            round3(result.breakdown.risk_penalty).to_string(),
            round3(result.breakdown.margin_rate).to_string(),
            round3(result.breakdown.total_score).to_string(),
            result.suggested_price_jpy.to_string(),
            result.grade.to_string(),
            result.bullets.join(JOIN),
            result.risk_notes.join(JOIN),
        ])?;
    }

    finish(writer)
}

pub fn screened_to_csv(items: &[ScreenedItem]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "offer_id",
        "title",
        "price_cny",
        "score",
        "suggested_price_jpy",
        "margin_rate",
        "grade",
    ])?;

    for item in items {
        writer.write_record([
            item.offer_id.clone(),
            item.title.clone(),
            item.price_cny.to_string(),
            item.score.to_string(),
            item.suggested_price_jpy.to_string(),
            item.margin_rate.to_string(),
            item.grade.to_string(),
        ])?;
    }

    finish(writer)
}

pub fn market_rows_to_csv(rows: &[MarketRow]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "category",
        "scene",
        "risk_level",
        "search_keyword",
        "offer_id",
        "title",
        "price_cny",
        "score",
        "grade",
    ])?;

    for row in rows {
        writer.write_record([
            row.category.clone(),
            row.scene.clone(),
            risk_level_label(row.risk_level).to_string(),
            row.search_keyword.clone(),
            row.offer_id.clone(),
            row.title.clone(),
            row.price_cny.to_string(),
            row.score.to_string(),
            row.grade.to_string(),
        ])?;
    }

    finish(writer)
}

fn risk_level_label(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => "low",
        RiskLevel::Mid => "mid",
        RiskLevel::High => "high",
    }
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| crate::error::MekikiError::Io(e.into_error()))?;
    let body = String::from_utf8_lossy(&bytes).into_owned();
    Ok(format!("{}{}", BOM, body))
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::demo::demo_products;
    use crate::catalog::PricingRequest;
    use crate::evaluator::{pipeline, CandidatePipeline, RuleBook};

    #[tokio::test]
    async fn candidate_csv_has_fixed_header_and_bom() {
        let rules = RuleBook::default();
        let results = CandidatePipeline::new(&rules)
            .evaluate_all(demo_products(), &PricingRequest::default(), &[])
            .await;

        let csv_text = candidates_to_csv(&results).unwrap();
        assert!(csv_text.starts_with('\u{feff}'));
        let header = csv_text.trim_start_matches('\u{feff}').lines().next().unwrap();
        assert_eq!(
            header,
            "offer_id,title,price_cny,market_fit,logistics,risk_penalty,\
             margin_rate,total_score,suggested_price_jpy,grade,bullets,risk_notes"
        );
        // Header plus one row per candidate.
        assert_eq!(csv_text.trim_end().lines().count(), 1 + results.len());
    }

    #[test]
    fn screened_csv_round_trips_through_a_reader() {
        let rules = RuleBook::default();
        let items = pipeline::screen(
            demo_products(),
            5.0,
            40.0,
            &[],
            &PricingRequest::default(),
            &rules,
        );
        let csv_text = screened_to_csv(&items).unwrap();

        let mut reader = csv::Reader::from_reader(
            csv_text.trim_start_matches('\u{feff}').as_bytes(),
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), items.len());
        assert_eq!(&rows[0][0], items[0].offer_id.as_str());
    }

    #[test]
    fn market_rows_keep_column_order() {
        let rows = vec![MarketRow {
            category: "ペット用品（ケア・おもちゃ）".to_string(),
            scene: "ペット家族化".to_string(),
            risk_level: RiskLevel::Mid,
            search_keyword: "宠物梳".to_string(),
            offer_id: "p1".to_string(),
            title: "宠物除毛刷".to_string(),
            price_cny: 12.0,
            score: 0.8,
            grade: Grade::B,
        }];
        let csv_text = market_rows_to_csv(&rows).unwrap();
        let header = csv_text.trim_start_matches('\u{feff}').lines().next().unwrap();
        assert_eq!(
            header,
            "category,scene,risk_level,search_keyword,offer_id,title,price_cny,score,grade"
        );
        assert!(csv_text.contains("宠物梳"));
        assert!(csv_text.contains(",mid,"));
    }
}
