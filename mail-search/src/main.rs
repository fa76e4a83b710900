//! mail-search: command line search client
//!
//! Runs one search against the configured endpoint and prints the page.
//!
//! # Usage
//!
//! ```bash
//! # Mails mentioning both words, newest first
//! mail-search --query "gas pipeline" --type and --order desc
//!
//! # Second page of 20, sent before 2001-10-01
//! mail-search --query enron --limit 20 --page 2 --date 2001-10-01 --operator "<"
//!
//! # Use a config file, print JSON
//! mail-search --config mail-search.toml --query lay --json
//! ```

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::Parser;
use mail_search::config::LoggingConfig;
use mail_search::sanitize::{MarkupSanitizer, Sanitizer};
use mail_search::{
    ClientConfig, Combinator, Comparator, DateFilter, HttpTransport, SearchController, Settlement,
    SortOrder,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mail-search")]
#[command(about = "Search a mail archive through its HTTP API", long_about = None)]
struct Cli {
    /// Config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Free-text query
    #[arg(short, long, default_value = "")]
    query: String,

    /// How terms combine: AND or OR
    #[arg(short = 't', long = "type")]
    combinator: Option<Combinator>,

    /// Sort order: asc or desc
    #[arg(short, long)]
    order: Option<SortOrder>,

    /// Page number
    #[arg(short, long)]
    page: Option<i64>,

    /// Page size
    #[arg(short, long)]
    limit: Option<i64>,

    /// Date to compare against (RFC 3339 or YYYY-MM-DD)
    #[arg(short, long, value_parser = parse_date)]
    date: Option<DateTime<Utc>>,

    /// Date operator: >, >=, <, <=
    #[arg(long, default_value = "<=")]
    operator: Comparator,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

fn parse_date(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Ok(date.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|day| Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN)))
        .map_err(|e| format!("invalid date '{}': {}", value, e))
}

fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("mail_search={}", logging.level).into());
    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ClientConfig::load(cli.config.as_deref())?;
    init_logging(&config.logging);

    info!("Starting mail-search v{}", env!("CARGO_PKG_VERSION"));
    info!("Search endpoint: {}", config.search_url()?);

    let transport = Arc::new(HttpTransport::new(config.timeout())?);
    let mut controller = SearchController::from_config(&config, transport)?;
    let sanitizer = MarkupSanitizer::new();

    // Each change supersedes the previous ticket; page goes last because
    // filter and size changes reset it.
    let mut ticket = controller.set_free_text(sanitizer.sanitize(&cli.query));
    if let Some(combinator) = cli.combinator {
        ticket = controller.set_combinator(combinator).or(ticket);
    }
    if let Some(order) = cli.order {
        ticket = controller.set_sort_order(order).or(ticket);
    }
    if let Some(date) = cli.date {
        let filter = DateFilter::new(Some(date), cli.operator);
        ticket = controller.set_date_filter(Some(filter)).or(ticket);
    }
    if let Some(limit) = cli.limit {
        ticket = controller.set_page_size(limit).or(ticket);
    }
    if let Some(page) = cli.page {
        ticket = controller.set_page(page).or(ticket);
    }
    let ticket = ticket.unwrap_or_else(|| controller.refresh());

    if let Settlement::Failed { message } = controller.run(ticket).await {
        eprintln!("Error: {}", message);
        std::process::exit(1);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(controller.records())?);
        return Ok(());
    }

    for mail in controller.records() {
        println!(
            "{:<26} {:<32} {}",
            truncate(&mail.date, 26),
            truncate(&mail.from, 32),
            truncate(&mail.subject, 60)
        );
    }
    println!(
        "page {}/{} (total {})",
        controller.query().page(),
        controller.max_page(),
        controller.total()
    );

    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut short: String = text.chars().take(width.saturating_sub(1)).collect();
    short.push('…');
    short
}
