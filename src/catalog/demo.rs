//! Built-in demo catalog and the local CSV catalog loader.
//!
//! The demo products are the permanent fallback: whenever the 1688 search
//! collaborator fails or a local catalog is missing or empty, the pipeline
//! still has something to evaluate.

use std::path::Path;

use tracing::warn;

use crate::error::Result;

use super::Product;

/// The three canned candidates used when nothing better is available.
pub fn demo_products() -> Vec<Product> {
    vec![
        Product {
            offer_id: "p1".to_string(),
            title: "宠物除毛刷 北欧风 软硅胶".to_string(),
            price_cny: 12.0,
            shop_score: Some(4.8),
            monthly_sales: Some(150),
            weight_kg: Some(0.3),
            volume_cm3: Some(500.0),
            tags: vec!["宠物".to_string(), "除毛".to_string(), "家用".to_string()],
        },
        Product {
            offer_id: "p2".to_string(),
            title: "厨房调料收纳架 多层 收纳".to_string(),
            price_cny: 18.0,
            shop_score: Some(4.6),
            monthly_sales: Some(90),
            weight_kg: Some(1.1),
            volume_cm3: Some(8000.0),
            tags: vec!["厨房".to_string(), "收纳".to_string()],
        },
        Product {
            offer_id: "p3".to_string(),
            title: "七彩发光耳机 炫酷 电竞".to_string(),
            price_cny: 25.0,
            shop_score: Some(4.2),
            monthly_sales: Some(40),
            weight_kg: Some(0.4),
            volume_cm3: Some(1500.0),
            tags: vec!["发光".to_string(), "电竞".to_string()],
        },
    ]
}

#[derive(Debug, serde::Deserialize)]
struct CatalogRow {
    #[serde(default)]
    offer_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    price_cny: String,
    #[serde(default)]
    tags: String,
}

/// Loads the operator's local catalog CSV (`offer_id,title,price_cny,tags`).
///
/// Unparsable price cells become 0.0 and rows without an id or title are
/// skipped; a missing or effectively empty file yields the demo products.
pub fn load_catalog(path: &Path) -> Result<Vec<Product>> {
    if !path.exists() {
        return Ok(demo_products());
    }

    let mut reader = csv::Reader::from_path(path)?;
    let mut products = Vec::new();

    for row in reader.deserialize::<CatalogRow>() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!("Skipping malformed catalog row: {}", e);
                continue;
            }
        };

        let price = row.price_cny.trim().parse::<f64>().unwrap_or(0.0);
        let tags: Vec<String> = row
            .tags
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        match Product::new(row.offer_id, row.title, price.max(0.0)) {
            Ok(mut product) => {
                product.tags = tags;
                products.push(product);
            }
            Err(e) => warn!("Skipping invalid catalog row: {}", e),
        }
    }

    if products.is_empty() {
        return Ok(demo_products());
    }

    Ok(products)
}

/// Price-band filter over the demo set, sorted cheap-first so the most
/// sourceable candidates surface when we are running blind.
pub fn demo_products_in_band(min_price_cny: f64, max_price_cny: f64, max_items: usize) -> Vec<Product> {
    let mut items: Vec<Product> = demo_products()
        .into_iter()
        .filter(|p| p.price_cny >= min_price_cny && p.price_cny <= max_price_cny)
        .collect();
    items.sort_by(|a, b| a.price_cny.total_cmp(&b.price_cny));
    items.truncate(max_items);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn demo_band_filter_and_truncate() {
        let items = demo_products_in_band(10.0, 20.0, 10);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].offer_id, "p1");
        assert_eq!(items[1].offer_id, "p2");

        let one = demo_products_in_band(0.0, 100.0, 1);
        assert_eq!(one.len(), 1);
    }

    #[test]
    fn missing_file_falls_back_to_demo() {
        let products = load_catalog(Path::new("/nonexistent/products.csv")).unwrap();
        assert_eq!(products.len(), 3);
        assert_eq!(products[0].offer_id, "p1");
    }

    #[test]
    fn csv_rows_are_parsed_and_bad_cells_tolerated() {
        let dir = std::env::temp_dir().join("mekiki_catalog_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("catalog.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "offer_id,title,price_cny,tags").unwrap();
        writeln!(f, "x1,猫抓板 瓦楞纸,9.5,\"宠物,猫\"").unwrap();
        writeln!(f, "x2,收纳盒 透明,not-a-number,收纳").unwrap();
        writeln!(f, ",没有ID的行,3.0,").unwrap();
        drop(f);

        let products = load_catalog(&path).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].offer_id, "x1");
        assert_eq!(products[0].tags, vec!["宠物", "猫"]);
        assert_eq!(products[1].price_cny, 0.0);

        std::fs::remove_file(&path).ok();
    }
}
