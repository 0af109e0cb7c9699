mod advisor;
mod catalog;
mod config;
mod error;
mod evaluator;
mod report;
mod trends;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use advisor::{generate_listing_copy, AdvisoryAgent, ListingCopyRequest};
use catalog::{demo, PageParser, PricingRequest, SearchClient};
use config::Config;
use evaluator::{pipeline, projector, CandidatePipeline, RuleBook};
use report::{export, MarketRow, RunLog, RunRecord};
use trends::{rules as trend_rules, AmazonTrends, BudgetBand, RakutenRanking, TrendQuery, TrendSelector, TrendSource};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the local catalog (or demo data) through the full pipeline
    Select {
        /// Catalog CSV path; defaults to MEKIKI_PRODUCTS_CSV
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Direction keywords, e.g. 宠物,厨房收纳
        #[arg(long, value_delimiter = ',')]
        directions: Vec<String>,
        /// Skip the LLM advisory refinement even when a key is configured
        #[arg(long)]
        no_advisor: bool,
        #[command(flatten)]
        pricing: PricingArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Search 1688 by keyword and run the quick relevance screen
    AutoSelect {
        /// Chinese search keyword (a category or a product term)
        #[arg(long)]
        category: String,
        #[arg(long, default_value_t = 20)]
        max_items: usize,
        #[arg(long, default_value_t = 0.0)]
        min_price_cny: f64,
        #[arg(long, default_value_t = 9999.0)]
        max_price_cny: f64,
        #[command(flatten)]
        pricing: PricingArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Recommend hot Japanese market categories from trend signals
    MarketSuggest {
        #[arg(long, default_value = "low")]
        budget: BudgetBand,
        /// Category terms to avoid, e.g. ベビー,食品
        #[arg(long, value_delimiter = ',')]
        avoid: Vec<String>,
        #[arg(long, default_value_t = 5)]
        top_k: usize,
        /// Trend sources to query: rakuten, amazon
        #[arg(long, value_delimiter = ',', default_value = "rakuten")]
        sources: Vec<String>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// End-to-end: trend categories -> 1688 search -> quick screen
    MarketAutoSelect {
        #[arg(long, default_value = "low")]
        budget: BudgetBand,
        #[arg(long, value_delimiter = ',')]
        avoid: Vec<String>,
        #[arg(long, default_value_t = 5)]
        top_k_categories: usize,
        #[arg(long, default_value_t = 30)]
        max_items_per_category: usize,
        #[arg(long, default_value_t = 5.0)]
        min_price_cny: f64,
        #[arg(long, default_value_t = 40.0)]
        max_price_cny: f64,
        #[command(flatten)]
        pricing: PricingArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Simulate profit for already-priced listings from a JSON file
    ProfitSim {
        /// JSON array of items: product_id, title, cost_cny, shipping_cny,
        /// sell_price_jpy, other_fee_jpy
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value_t = 21.0)]
        fx_rate: f64,
        #[arg(long, default_value_t = 0.15)]
        fee_rate: f64,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Scrape one 1688 product page into a structured record
    ParseUrl {
        url: String,
    },
    /// Generate Japanese listing copy for one product via the advisory model
    ListingCopy {
        #[arg(long)]
        title_cn: String,
        #[arg(long, default_value = "")]
        desc_cn: String,
        #[arg(long, value_delimiter = ',')]
        keywords_jp: Vec<String>,
        #[arg(long, default_value = "シンプル")]
        tone: String,
    },
    /// Check configuration and collaborator credentials
    Init,
}

#[derive(Args)]
struct PricingArgs {
    /// CNY -> JPY conversion rate
    #[arg(long, default_value_t = 22.0)]
    fx_rate: f64,
    /// International shipping per unit, JPY
    #[arg(long, default_value_t = 500.0)]
    intl_shipping_jpy: f64,
    /// Platform commission rate, fraction of the sale price
    #[arg(long, default_value_t = 0.15)]
    commission_rate: f64,
    /// Target gross margin rate, fraction of the sale price
    #[arg(long, default_value_t = 0.2)]
    target_margin: f64,
}

impl PricingArgs {
    fn to_request(&self) -> Result<PricingRequest> {
        PricingRequest::new(
            self.fx_rate,
            self.intl_shipping_jpy,
            self.commission_rate,
            self.target_margin,
        )
        .context("invalid pricing parameters")
    }
}

#[derive(Args)]
struct OutputArgs {
    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,
    /// Write to a file instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let cli = Cli::parse();
    let config = config::load_config();

    match &cli.command {
        Some(Commands::Select {
            catalog,
            directions,
            no_advisor,
            pricing,
            output,
        }) => {
            run_select(&config, catalog.as_deref(), directions, *no_advisor, pricing, output).await?;
        }
        Some(Commands::AutoSelect {
            category,
            max_items,
            min_price_cny,
            max_price_cny,
            pricing,
            output,
        }) => {
            run_auto_select(
                &config,
                category,
                *max_items,
                *min_price_cny,
                *max_price_cny,
                pricing,
                output,
            )
            .await?;
        }
        Some(Commands::MarketSuggest {
            budget,
            avoid,
            top_k,
            sources,
            output,
        }) => {
            run_market_suggest(&config, *budget, avoid, *top_k, sources, output).await?;
        }
        Some(Commands::MarketAutoSelect {
            budget,
            avoid,
            top_k_categories,
            max_items_per_category,
            min_price_cny,
            max_price_cny,
            pricing,
            output,
        }) => {
            run_market_auto_select(
                &config,
                *budget,
                avoid,
                *top_k_categories,
                *max_items_per_category,
                *min_price_cny,
                *max_price_cny,
                pricing,
                output,
            )
            .await?;
        }
        Some(Commands::ProfitSim {
            input,
            fx_rate,
            fee_rate,
            out,
        }) => {
            run_profit_sim(&config, input, *fx_rate, *fee_rate, out.as_deref())?;
        }
        Some(Commands::ParseUrl { url }) => {
            run_parse_url(&config, url).await?;
        }
        Some(Commands::ListingCopy {
            title_cn,
            desc_cn,
            keywords_jp,
            tone,
        }) => {
            run_listing_copy(&config, title_cn, desc_cn, keywords_jp, tone).await?;
        }
        Some(Commands::Init) => {
            config::initialize_config(&config).await?;
        }
        None => {
            info!("No command specified. Use --help for available commands.");
        }
    }

    Ok(())
}

async fn run_select(
    config: &Config,
    catalog_path: Option<&std::path::Path>,
    directions: &[String],
    no_advisor: bool,
    pricing: &PricingArgs,
    output: &OutputArgs,
) -> Result<()> {
    let pricing = pricing.to_request()?;
    let rules = RuleBook::load(config.rules_path.as_deref()).context("loading scoring rule book")?;
    let products = demo::load_catalog(catalog_path.unwrap_or(&config.products_csv))
        .context("loading product catalog")?;
    info!("Evaluating {} catalog products", products.len());

    let advisor = AdvisoryAgent::new(
        config.openai_api_key.clone(),
        config.openai_model.clone(),
        config.http_timeout_secs,
    )?;
    let mut pipeline = CandidatePipeline::new(&rules);
    if !no_advisor && advisor.is_configured() {
        pipeline = pipeline.with_advisor(&advisor);
    } else if !no_advisor {
        info!("No OPENAI_API_KEY configured; running rule-based only");
    }

    let results = pipeline.evaluate_all(products, &pricing, directions).await;

    RunLog::new(config.log_dir.clone()).record(&RunRecord::now(
        "select",
        format!("directions={}", directions.join("、")),
        results.len(),
    ));

    let text = match output.format {
        OutputFormat::Json => serde_json::to_string_pretty(&results)?,
        OutputFormat::Csv => export::candidates_to_csv(&results)?,
    };
    emit(text, output.out.as_deref())
}

async fn run_auto_select(
    config: &Config,
    category: &str,
    max_items: usize,
    min_price_cny: f64,
    max_price_cny: f64,
    pricing: &PricingArgs,
    output: &OutputArgs,
) -> Result<()> {
    if min_price_cny > max_price_cny {
        // An inverted band is operator input error, but it is recoverable:
        // nothing matches, which the demo fallback then papers over. Warn
        // instead of refusing.
        warn!(
            "Price band is inverted ({} > {}); results will come from fallback data",
            min_price_cny, max_price_cny
        );
    }

    let pricing = pricing.to_request()?;
    let rules = RuleBook::load(config.rules_path.as_deref()).context("loading scoring rule book")?;
    let search = SearchClient::new(
        config.onebound_api_host.clone(),
        config.onebound_api_key.clone(),
        config.http_timeout_secs,
    )?;

    let outcome = search
        .search(category, min_price_cny, max_price_cny, max_items)
        .await;
    let degraded = outcome.reason().map(str::to_string);
    let directions = vec![category.to_string()];
    let items = pipeline::screen(
        outcome.into_data(),
        min_price_cny,
        max_price_cny,
        &directions,
        &pricing,
        &rules,
    );

    RunLog::new(config.log_dir.clone()).record(
        &RunRecord::now("auto-select", format!("keyword={}", category), items.len())
            .with_degraded(degraded.as_deref()),
    );

    let text = match output.format {
        OutputFormat::Json => serde_json::to_string_pretty(&items)?,
        OutputFormat::Csv => export::screened_to_csv(&items)?,
    };
    emit(text, output.out.as_deref())
}

async fn run_market_suggest(
    config: &Config,
    budget: BudgetBand,
    avoid: &[String],
    top_k: usize,
    source_names: &[String],
    output: &OutputArgs,
) -> Result<()> {
    let category_rules = trend_rules::load_rules(config.category_rules_path.as_deref())
        .context("loading trend category rules")?;
    let sources = build_trend_sources(source_names, config)?;
    let selector = TrendSelector::new(&category_rules, sources);

    let query = TrendQuery {
        budget,
        avoid: avoid.to_vec(),
        top_k,
    };
    let outcome = selector.suggest(&query).await;
    if let Some(reason) = outcome.reason() {
        warn!("Trend suggestions degraded: {}", reason);
    }
    let degraded = outcome.reason().map(str::to_string);
    let suggestions = outcome.into_data();

    RunLog::new(config.log_dir.clone()).record(
        &RunRecord::now(
            "market-suggest",
            format!("budget={:?} top_k={}", budget, top_k),
            suggestions.len(),
        )
        .with_degraded(degraded.as_deref()),
    );

    // Category suggestions are a nested structure; CSV output flattens to
    // one row per suggestion only in market-auto-select.
    let text = serde_json::to_string_pretty(&suggestions)?;
    emit(text, output.out.as_deref())
}

#[allow(clippy::too_many_arguments)]
async fn run_market_auto_select(
    config: &Config,
    budget: BudgetBand,
    avoid: &[String],
    top_k_categories: usize,
    max_items_per_category: usize,
    min_price_cny: f64,
    max_price_cny: f64,
    pricing: &PricingArgs,
    output: &OutputArgs,
) -> Result<()> {
    let pricing = pricing.to_request()?;
    let rules = RuleBook::load(config.rules_path.as_deref()).context("loading scoring rule book")?;
    let category_rules = trend_rules::load_rules(config.category_rules_path.as_deref())
        .context("loading trend category rules")?;

    // Default to both marketplaces for the end-to-end run.
    let sources = build_trend_sources(&["rakuten".to_string(), "amazon".to_string()], config)?;
    let selector = TrendSelector::new(&category_rules, sources);
    let query = TrendQuery {
        budget,
        avoid: avoid.to_vec(),
        top_k: top_k_categories,
    };

    let trend_outcome = selector.suggest(&query).await;
    let mut degradations: Vec<String> = trend_outcome.reason().map(str::to_string).into_iter().collect();
    let suggestions = trend_outcome.into_data();

    let search = SearchClient::new(
        config.onebound_api_host.clone(),
        config.onebound_api_key.clone(),
        config.http_timeout_secs,
    )?;

    let mut rows: Vec<MarketRow> = Vec::new();
    for suggestion in &suggestions {
        // Feed the first suggested keyword into 1688; fall back to the
        // category name when the rule has none.
        let keyword = suggestion
            .suggested_keywords
            .first()
            .cloned()
            .unwrap_or_else(|| suggestion.category.clone());

        let outcome = search
            .search(&keyword, min_price_cny, max_price_cny, max_items_per_category)
            .await;
        if let Some(reason) = outcome.reason() {
            degradations.push(format!("{}: {}", keyword, reason));
        }

        let directions = vec![keyword.clone()];
        let items = pipeline::screen(
            outcome.into_data(),
            min_price_cny,
            max_price_cny,
            &directions,
            &pricing,
            &rules,
        );

        for item in items {
            rows.push(MarketRow {
                category: suggestion.category.clone(),
                scene: suggestion.scene.clone(),
                risk_level: suggestion.risk_level,
                search_keyword: keyword.clone(),
                offer_id: item.offer_id,
                title: item.title,
                price_cny: item.price_cny,
                score: item.score,
                grade: item.grade,
            });
        }
    }

    let degraded = if degradations.is_empty() {
        None
    } else {
        Some(degradations.join("; "))
    };
    RunLog::new(config.log_dir.clone()).record(
        &RunRecord::now(
            "market-auto-select",
            format!("budget={:?} categories={}", budget, suggestions.len()),
            rows.len(),
        )
        .with_degraded(degraded.as_deref()),
    );

    let text = match output.format {
        OutputFormat::Json => serde_json::to_string_pretty(&rows)?,
        OutputFormat::Csv => export::market_rows_to_csv(&rows)?,
    };
    emit(text, output.out.as_deref())
}

fn run_profit_sim(
    config: &Config,
    input: &std::path::Path,
    fx_rate: f64,
    fee_rate: f64,
    out: Option<&std::path::Path>,
) -> Result<()> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("reading profit-sim input {}", input.display()))?;
    let items: Vec<projector::SimItem> =
        serde_json::from_str(&raw).context("profit-sim input must be a JSON array of items")?;

    let results: Vec<projector::SimResult> = items
        .iter()
        .map(|item| projector::simulate(item, fx_rate, fee_rate))
        .collect();

    RunLog::new(config.log_dir.clone()).record(&RunRecord::now(
        "profit-sim",
        format!("fx_rate={} fee_rate={}", fx_rate, fee_rate),
        results.len(),
    ));

    let text = serde_json::to_string_pretty(&results)?;
    emit(text, out)
}

async fn run_parse_url(config: &Config, url: &str) -> Result<()> {
    let parser = PageParser::new(config.http_timeout_secs)?;
    let page = parser.parse_url(url).await?;
    let text = serde_json::to_string_pretty(&page)?;
    emit(text, None)
}

async fn run_listing_copy(
    config: &Config,
    title_cn: &str,
    desc_cn: &str,
    keywords_jp: &[String],
    tone: &str,
) -> Result<()> {
    let agent = AdvisoryAgent::new(
        config.openai_api_key.clone(),
        config.openai_model.clone(),
        config.http_timeout_secs,
    )?;

    let request = ListingCopyRequest {
        title_cn: title_cn.to_string(),
        desc_cn: desc_cn.to_string(),
        keywords_jp: keywords_jp.to_vec(),
        shop_tone: tone.to_string(),
    };

    let copy = generate_listing_copy(&agent, &request).await;
    let text = serde_json::to_string_pretty(&copy)?;
    emit(text, None)
}

fn build_trend_sources(names: &[String], config: &Config) -> Result<Vec<Box<dyn TrendSource>>> {
    let mut sources: Vec<Box<dyn TrendSource>> = Vec::new();
    for name in names {
        match name.trim().to_lowercase().as_str() {
            "rakuten" => sources.push(Box::new(RakutenRanking::new(config.http_timeout_secs)?)),
            "amazon" => sources.push(Box::new(AmazonTrends::new())),
            other => warn!("Unknown trend source {:?}, skipping", other),
        }
    }
    Ok(sources)
}

fn emit(text: String, out: Option<&std::path::Path>) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, &text).with_context(|| format!("writing {}", path.display()))?;
            info!("Wrote output to {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}
