//! Scrapes a single 1688 product page into a structured record.
//!
//! Page markup shifts often; this is best-effort extraction and fields come
//! back as `None` when nothing matched. A bot-check interstitial is reported
//! as a parse error so the operator knows to open the page in a browser.

use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{MekikiError, Result};

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const MAX_IMAGES: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedPage {
    pub url: String,
    pub title: Option<String>,
    pub price_cny: Option<f64>,
    pub images: Vec<String>,
}

pub struct PageParser {
    client: Client,
}

impl PageParser {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(BROWSER_UA)
            .build()?;
        Ok(Self { client })
    }

    pub async fn parse_url(&self, url: &str) -> Result<ParsedPage> {
        if !url.contains("1688.com") {
            return Err(MekikiError::parse_error(
                "only 1688.com product URLs are supported",
            ));
        }

        info!("Fetching 1688 product page: {}", url);
        let response = self
            .client
            .get(url)
            .header("Accept-Language", "zh-CN,zh;q=0.9,en;q=0.8,ja;q=0.7")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MekikiError::parse_error(format!(
                "1688 page request failed with HTTP {}",
                status
            )));
        }

        let html = response.text().await?;
        parse_product_html(url, &html)
    }
}

/// Pure extraction over the fetched HTML, separated out for testing.
pub fn parse_product_html(url: &str, html: &str) -> Result<ParsedPage> {
    if html.contains("sufei-punish") || html.contains("<punish-component") {
        return Err(MekikiError::parse_error(
            "1688 served a bot-check page; open the URL in a browser and enter the item manually",
        ));
    }

    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let price = extract_price(&document, html);
    let images = extract_images(&document);

    Ok(ParsedPage {
        url: url.to_string(),
        title,
        price_cny: price,
        images,
    })
}

fn extract_title(document: &Html) -> Option<String> {
    let og_title = Selector::parse("meta[property='og:title']").unwrap();
    if let Some(meta) = document.select(&og_title).next() {
        if let Some(content) = meta.value().attr("content") {
            let trimmed = content.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }

    let title_sel = Selector::parse("title").unwrap();
    if let Some(title) = document.select(&title_sel).next() {
        let text = title.text().collect::<String>();
        let cleaned = text.replace("- 阿里巴巴1688.com", "");
        let cleaned = cleaned.trim();
        if !cleaned.is_empty() {
            return Some(cleaned.to_string());
        }
    }

    None
}

fn extract_price(document: &Html, html: &str) -> Option<f64> {
    let meta_price = Selector::parse("meta[property='og:product:price']").unwrap();
    if let Some(meta) = document.select(&meta_price).next() {
        if let Some(price) = meta.value().attr("content").and_then(|c| c.trim().parse().ok()) {
            return Some(price);
        }
    }

    let itemprop = Selector::parse("[itemprop='price']").unwrap();
    if let Some(tag) = document.select(&itemprop).next() {
        let text = tag
            .value()
            .attr("content")
            .map(str::to_string)
            .unwrap_or_else(|| tag.text().collect::<String>());
        if let Some(price) = first_number(&text) {
            return Some(price);
        }
    }

    // Last resort: dig "price":"123.45" (or unitPrice) out of the inline JS.
    let js_price = Regex::new(r#""price"\s*:\s*"(\d+(?:\.\d+)?)""#).unwrap();
    let js_unit_price = Regex::new(r#""unitPrice"\s*:\s*"(\d+(?:\.\d+)?)""#).unwrap();
    for re in [&js_price, &js_unit_price] {
        if let Some(caps) = re.captures(html) {
            if let Ok(price) = caps[1].parse() {
                return Some(price);
            }
        }
    }

    None
}

fn first_number(text: &str) -> Option<f64> {
    let re = Regex::new(r"\d+(?:\.\d+)?").unwrap();
    re.find(text).and_then(|m| m.as_str().parse().ok())
}

fn extract_images(document: &Html) -> Vec<String> {
    let mut images: Vec<String> = Vec::new();

    let og_image = Selector::parse("meta[property='og:image']").unwrap();
    if let Some(meta) = document.select(&og_image).next() {
        if let Some(content) = meta.value().attr("content") {
            images.push(content.to_string());
        }
    }

    // Gallery/detail images, guessed by class name.
    let img_sel = Selector::parse("img").unwrap();
    for img in document.select(&img_sel) {
        let class = img.value().attr("class").unwrap_or_default().to_lowercase();
        if !["image", "gallery", "detail", "img"]
            .iter()
            .any(|k| class.contains(k))
        {
            continue;
        }
        let src = img
            .value()
            .attr("src")
            .or_else(|| img.value().attr("data-lazy-src"))
            .or_else(|| img.value().attr("data-src"));
        if let Some(src) = src {
            if src.starts_with("http") && !images.iter().any(|u| u == src) {
                images.push(src.to_string());
            }
        }
        if images.len() >= MAX_IMAGES {
            break;
        }
    }

    images.truncate(MAX_IMAGES);
    images
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_title_price_and_images() {
        let html = r#"
            <html><head>
              <meta property="og:title" content="宠物除毛刷 北欧风" />
              <meta property="og:image" content="https://img.example.com/a.jpg" />
              <title>宠物除毛刷 北欧风 - 阿里巴巴1688.com</title>
            </head><body>
              <span itemprop="price" content="12.5"></span>
              <img class="detail-img" src="https://img.example.com/b.jpg" />
              <img class="nav-logo" src="https://img.example.com/logo.png" />
            </body></html>
        "#;
        let page = parse_product_html("https://detail.1688.com/offer/1.html", html).unwrap();
        assert_eq!(page.title.as_deref(), Some("宠物除毛刷 北欧风"));
        assert_eq!(page.price_cny, Some(12.5));
        assert_eq!(
            page.images,
            vec![
                "https://img.example.com/a.jpg".to_string(),
                "https://img.example.com/b.jpg".to_string(),
            ]
        );
    }

    #[test]
    fn falls_back_to_inline_js_price() {
        let html = r#"<html><head><title>收纳盒</title></head>
            <body><script>var data = {"sku":{"unitPrice":"18.80"}};</script></body></html>"#;
        let page = parse_product_html("https://detail.1688.com/offer/2.html", html).unwrap();
        assert_eq!(page.price_cny, Some(18.8));
    }

    #[test]
    fn bot_check_page_is_an_error() {
        let html = "<html><body><div class=\"sufei-punish\"></div></body></html>";
        let err = parse_product_html("https://detail.1688.com/offer/3.html", html).unwrap_err();
        assert!(err.to_string().contains("bot-check"));
    }

    #[test]
    fn non_1688_url_is_rejected_without_fetch() {
        // Domain check happens before any network call; exercised through
        // parse_url's guard by constructing the parser and checking the error.
        let parser = PageParser::new(5).unwrap();
        let err = futures::executor::block_on(parser.parse_url("https://example.com/item"))
            .unwrap_err();
        assert!(err.to_string().contains("1688.com"));
    }
}
