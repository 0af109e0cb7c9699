use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub onebound_api_host: String,
    pub onebound_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: String,

    /// Fixed timeout applied to every outbound HTTP call, in seconds.
    pub http_timeout_secs: u64,

    /// Local product catalog used by `select` when no search is involved.
    pub products_csv: PathBuf,
    pub log_dir: PathBuf,

    /// Optional JSON file overriding the built-in scoring rule book.
    pub rules_path: Option<PathBuf>,
    /// Optional JSON file overriding the built-in trend category rules.
    pub category_rules_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            onebound_api_host: "https://api.onebound.cn".to_string(),
            onebound_api_key: None,
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            http_timeout_secs: 10,
            products_csv: PathBuf::from("1688_products.csv"),
            log_dir: PathBuf::from("./logs"),
            rules_path: None,
            category_rules_path: None,
        }
    }
}

pub fn load_config() -> Config {
    let mut config = Config::default();

    // Override defaults with environment variables
    if let Ok(host) = env::var("ONEBOUND_API_HOST") {
        config.onebound_api_host = host;
    }

    if let Ok(key) = env::var("ONEBOUND_API_KEY") {
        if !key.trim().is_empty() {
            config.onebound_api_key = Some(key.trim().to_string());
        }
    }

    if let Ok(key) = env::var("OPENAI_API_KEY") {
        if !key.trim().is_empty() {
            config.openai_api_key = Some(key.trim().to_string());
        }
    }

    if let Ok(model) = env::var("OPENAI_MODEL") {
        config.openai_model = model;
    }

    if let Ok(timeout) = env::var("ONEBOUND_TIMEOUT_SECS") {
        match timeout.parse::<u64>() {
            Ok(secs) if secs > 0 => config.http_timeout_secs = secs,
            _ => warn!("Ignoring invalid ONEBOUND_TIMEOUT_SECS={}", timeout),
        }
    }

    if let Ok(path) = env::var("MEKIKI_PRODUCTS_CSV") {
        config.products_csv = PathBuf::from(path);
    }

    if let Ok(dir) = env::var("MEKIKI_LOG_DIR") {
        config.log_dir = PathBuf::from(dir);
    }

    if let Ok(path) = env::var("MEKIKI_RULES_JSON") {
        config.rules_path = Some(PathBuf::from(path));
    }

    if let Ok(path) = env::var("MEKIKI_CATEGORY_RULES_JSON") {
        config.category_rules_path = Some(PathBuf::from(path));
    }

    config
}

/// Sanity-checks the configuration for `mekiki init`.
///
/// Nothing here is fatal: a missing credential only matters once the
/// collaborator that needs it is actually invoked, so we report and move on.
pub async fn initialize_config(config: &Config) -> Result<()> {
    info!("Checking mekiki configuration...");

    match &config.onebound_api_key {
        Some(key) => info!("Onebound API key configured ({} chars)", key.len()),
        None => warn!(
            "ONEBOUND_API_KEY not set - 1688 search will fall back to demo data"
        ),
    }

    match &config.openai_api_key {
        Some(key) => info!(
            "OpenAI API key configured ({} chars), model {}",
            key.len(),
            config.openai_model
        ),
        None => warn!(
            "OPENAI_API_KEY not set - advisory refinement and listing copy are unavailable"
        ),
    }

    if config.products_csv.exists() {
        info!("Local catalog found at {}", config.products_csv.display());
    } else {
        warn!(
            "No local catalog at {} - `select` will use the built-in demo products",
            config.products_csv.display()
        );
    }

    if let Some(rules) = &config.rules_path {
        if rules.exists() {
            info!("Rule book override: {}", rules.display());
        } else {
            warn!("MEKIKI_RULES_JSON points at {} but the file does not exist", rules.display());
        }
    }

    info!("Configuration check complete");
    Ok(())
}
