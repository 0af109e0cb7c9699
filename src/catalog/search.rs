//! 1688 keyword search via the Onebound gateway.
//!
//! Every failure mode - missing key, network, bad status, bad JSON, an
//! error payload, an empty result - degrades to the demo catalog so the
//! rest of the pipeline always has candidates to evaluate.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{MekikiError, Result, Sourced};

use super::demo::demo_products_in_band;
use super::Product;

pub struct SearchClient {
    host: String,
    api_key: Option<String>,
    client: Client,
}

impl SearchClient {
    pub fn new(host: String, api_key: Option<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            host,
            api_key,
            client,
        })
    }

    /// Searches 1688 for `keyword` inside a CNY price band.
    ///
    /// Returns `Fresh` items from the live API, or the price-filtered demo
    /// catalog as `Degraded` when the call cannot be made or yields nothing.
    pub async fn search(
        &self,
        keyword: &str,
        min_price_cny: f64,
        max_price_cny: f64,
        max_items: usize,
    ) -> Sourced<Vec<Product>> {
        match self
            .search_live(keyword, min_price_cny, max_price_cny, max_items)
            .await
        {
            Ok(items) if !items.is_empty() => {
                info!("1688 search returned {} items for {:?}", items.len(), keyword);
                Sourced::Fresh(items)
            }
            Ok(_) => {
                warn!("1688 search returned no items for {:?}, using demo data", keyword);
                Sourced::degraded(
                    demo_products_in_band(min_price_cny, max_price_cny, max_items),
                    format!("1688 search returned no items for {:?}", keyword),
                )
            }
            Err(e) => {
                warn!("1688 search failed for {:?}: {}, using demo data", keyword, e);
                Sourced::degraded(
                    demo_products_in_band(min_price_cny, max_price_cny, max_items),
                    format!("1688 search failed: {}", e),
                )
            }
        }
    }

    async fn search_live(
        &self,
        keyword: &str,
        min_price_cny: f64,
        max_price_cny: f64,
        max_items: usize,
    ) -> Result<Vec<Product>> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            MekikiError::config_error("ONEBOUND_API_KEY is not set; cannot search 1688")
        })?;

        let url = format!("{}/1688/item_search", self.host);
        let page_size = max_items.to_string();
        let min_price = min_price_cny.to_string();
        let max_price = max_price_cny.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("key", api_key),
                ("q", keyword),
                ("page", "1"),
                ("page_size", page_size.as_str()),
                ("min_price", min_price.as_str()),
                ("max_price", max_price.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MekikiError::search_error(format!(
                "Onebound HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| MekikiError::search_error(format!("Onebound returned invalid JSON: {}", e)))?;

        parse_search_payload(&payload)
    }
}

/// Normalizes an Onebound search payload into products.
///
/// The gateway reports failures in-band (`success == 0` with a reason), and
/// the item list sits either at `items.item` or directly under `items`.
/// Malformed entries are skipped rather than failing the batch.
pub fn parse_search_payload(payload: &Value) -> Result<Vec<Product>> {
    let success = match payload.get("success") {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
        _ => false,
    };
    if !success {
        let reason = payload
            .get("reason")
            .or_else(|| payload.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        let code = payload
            .get("error_code")
            .and_then(Value::as_str)
            .unwrap_or("N/A");
        return Err(MekikiError::search_error(format!(
            "Onebound error (code={}): {}",
            code, reason
        )));
    }

    let raw_items: Vec<Value> = match payload.get("items") {
        Some(Value::Object(block)) => block
            .get("item")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        Some(Value::Array(list)) => list.clone(),
        _ => Vec::new(),
    };

    let mut products = Vec::new();
    for item in &raw_items {
        let Some(obj) = item.as_object() else {
            continue;
        };

        let offer_id = ["item_id", "num_iid", "offer_id"]
            .iter()
            .find_map(|k| obj.get(*k))
            .map(value_to_string)
            .unwrap_or_default();
        let title = obj
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let price = obj.get("price").map(value_to_f64).unwrap_or(0.0);

        match Product::new(offer_id, title, price) {
            Ok(mut product) => {
                if let Some(sales) = obj.get("sales").and_then(Value::as_u64) {
                    product.monthly_sales = Some(sales as u32);
                }
                products.push(product);
            }
            Err(e) => {
                debug!("Skipping malformed search item: {}", e);
                continue;
            }
        }
    }

    Ok(products)
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn value_to_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}
