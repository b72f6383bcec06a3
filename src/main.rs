use anyhow::Result;
use clap::Parser;
use quiz_scrape::quiz_zone::{QuizScraperBuilder, QUESTIONS_DIR, QUIZ_ZONE};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Scrape quiz-zone.co.uk trivia questions into one JSON file per category.
#[derive(Debug, Parser)]
struct Args {
    /// Directory the per-category JSON files are written to
    #[arg(long, default_value = QUESTIONS_DIR)]
    out_dir: PathBuf,
    /// Site root to crawl
    #[arg(long, default_value = QUIZ_ZONE)]
    base_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let scraper = QuizScraperBuilder::default()
        .base_url(args.base_url)
        .out_dir(args.out_dir)
        .build()?;

    scraper.scrape().await
}
