//! CLI entry point for the verification-tools crawler.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use vtools_core::storage::{DataDirs, ToolStore};
use vtools_core::{AppConfig, Database, Pipeline, stats};

mod cli;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let config = AppConfig::load(args.config.as_deref())?;
    debug!(?config, "configuration resolved");

    match args.command.unwrap_or_default() {
        Command::Run { live, issue } => run(&config, live, issue).await,
        Command::Crawl => {
            let pipeline = Pipeline::from_config(&config).await?;
            let report = pipeline.run_crawl().await;
            println!("Crawled {} records", report.hits.len());
            for (category, count) in &report.attribution {
                println!("  {category}: {count}");
            }
            Ok(())
        }
        Command::Quick => {
            let pipeline = Pipeline::from_config(&config).await?;
            let outcome = pipeline.run_quick().await?;
            println!("Quick crawl: {} records, {} tools", outcome.crawled, outcome.parsed);
            println!("  JSON: {}", outcome.json_path.display());
            println!("  CSV: {}", outcome.csv_path.display());
            Ok(())
        }
        Command::Stats => {
            let store = open_store(&config.data_dirs()).await?;
            let summary = stats::aggregate(store.database()).await?;
            println!("\nDatabase Statistics:");
            print!("{summary}");
            Ok(())
        }
        Command::Query { category, limit } => {
            let store = open_store(&config.data_dirs()).await?;
            let tools = store.query_by_category(category, limit).await?;
            println!("\nFound {} tools in category '{category}':", tools.len());
            for tool in &tools {
                let preview: String = tool.description().chars().take(60).collect();
                println!("  - {}: {preview}...", tool.name());
            }
            Ok(())
        }
        Command::Backup => {
            let dirs = config.data_dirs();
            let store = open_store(&dirs).await?;
            let path = store.backup(&dirs.backup_dir()).await?;
            println!("Backup written to {}", path.display());
            Ok(())
        }
        Command::RepoStatus => {
            let pipeline = Pipeline::from_config(&config).await?;
            if let Some((rate, access)) = pipeline.repository_status().await {
                println!("Repository: {}", config.github_repo);
                println!("  API remaining: {}/{} (resets at {})", rate.remaining, rate.limit, rate.reset);
                println!("  Access: {}", if access { "yes" } else { "no" });
            }
            Ok(())
        }
    }
}

async fn run(config: &AppConfig, live: bool, issue: bool) -> Result<()> {
    let pipeline = Pipeline::from_config(config).await?;
    let report = pipeline.run_full(!live).await?;

    println!("\nPipeline Results:");
    println!("  Crawled: {} records", report.crawled);
    println!("  Parsed: {} tools", report.parsed);
    println!("  Stored: {} new records in DB", report.storage.inserted);
    if let Some(path) = &report.upload.uploaded_path {
        println!("  Uploaded: {path}");
    }
    if let Some(url) = &report.upload.pull_request {
        println!("  Pull request: {url}");
    }

    if issue && let Some(url) = pipeline.open_summary_issue(&report).await {
        info!(url = %url, "summary issue opened");
        println!("  Issue: {url}");
    }
    Ok(())
}

async fn open_store(dirs: &DataDirs) -> Result<ToolStore> {
    dirs.ensure()?;
    let db = Database::new(&dirs.db_path())
        .await
        .with_context(|| format!("Failed to open database {}", dirs.db_path().display()))?;
    Ok(ToolStore::new(db))
}
