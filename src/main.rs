//! Command-line entry point for the website analysis engine.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::warn;

use site_insights::config::DEFAULT_USER_AGENT;
use site_insights::status_server::{start_status_server, StatusState};
use site_insights::storage::{init_db_pool_with_path, run_migrations};
use site_insights::{
    init_logger_with, AnalysisReport, EngineConfig, LinkToggles, LogFormat, LogLevel, RunManager,
};

#[derive(Parser, Debug)]
#[command(
    name = "site_insights",
    about = "Crawl a website, validate its links, classify its pages, and store the results"
)]
struct Cli {
    /// Seed URL to analyze
    url: String,

    /// Maximum BFS depth from the seed (1-5)
    #[arg(long, default_value_t = 2)]
    depth: u32,

    /// Maximum number of pages to fetch (10-1000)
    #[arg(long, default_value_t = 100)]
    max_pages: u32,

    /// Maximum number of links to validate (10-2000, >= 2x max-pages)
    #[arg(long, default_value_t = 200)]
    max_links: u32,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Maximum concurrent crawl requests
    #[arg(long, default_value_t = 20)]
    concurrency: usize,

    /// Retries on transport errors and 5xx responses
    #[arg(long, default_value_t = 3)]
    retries: u32,

    /// HTTP User-Agent header
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Also extract dynamic (JavaScript) links
    #[arg(long)]
    extract_dynamic: bool,

    /// Also extract resource links (images, scripts, stylesheets)
    #[arg(long)]
    extract_resources: bool,

    /// Also extract external links
    #[arg(long)]
    extract_external: bool,

    /// SQLite database path
    #[arg(long, default_value = "./site_insights.db")]
    db_path: PathBuf,

    /// Wall-clock ceiling for the run in seconds
    #[arg(long)]
    max_run_seconds: Option<u64>,

    /// Serve a JSON progress endpoint on this localhost port
    #[arg(long)]
    status_port: Option<u16>,

    /// Application id to attribute the run to
    #[arg(long)]
    application_id: Option<String>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain")]
    log_format: LogFormat,
}

impl Cli {
    fn into_config(self) -> (EngineConfig, String, Option<String>) {
        let config = EngineConfig {
            max_crawl_depth: self.depth,
            max_pages_to_crawl: self.max_pages,
            max_links_to_validate: self.max_links,
            link_toggles: LinkToggles {
                static_html: true,
                dynamic_js: self.extract_dynamic,
                resource: self.extract_resources,
                external: self.extract_external,
            },
            request_timeout_seconds: self.timeout,
            max_concurrent_requests: self.concurrency,
            retry_attempts: self.retries,
            user_agent: self.user_agent,
            db_path: self.db_path,
            max_run_seconds: self.max_run_seconds,
            status_port: self.status_port,
            log_level: self.log_level,
            log_format: self.log_format,
        };
        (config, self.url, self.application_id)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger_with(cli.log_level.clone().into(), cli.log_format.clone())
        .context("Failed to initialize logger")?;

    let (config, url, application_id) = cli.into_config();
    config.validate().context("Invalid configuration")?;

    let pool = init_db_pool_with_path(&config.db_path)
        .await
        .context("Failed to initialize database pool")?;
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let manager = RunManager::new(pool.clone());
    let status_port = config.status_port;
    let handle = manager
        .start_run(application_id.as_deref(), &url, config.clone())
        .context("Failed to start analysis run")?;

    if let Some(port) = status_port {
        if let Some(progress) = manager.progress(&handle) {
            let state = StatusState {
                run_id: handle.run_id.clone(),
                progress,
            };
            tokio::spawn(async move {
                if let Err(e) = start_status_server(port, state).await {
                    warn!("Status server error: {e}");
                }
            });
        }
    }

    manager.join(&handle).await;

    let bundle = site_insights::get_run(&pool, &handle.run_id)
        .await
        .context("Failed to load run results")?;

    if bundle.run.status == site_insights::RunState::Failed {
        anyhow::bail!(
            "Analysis failed: {}",
            bundle.run.error_message.as_deref().unwrap_or("unknown error")
        );
    }

    print_summary(&AnalysisReport {
        run_id: bundle.run.run_id.clone(),
        seed_url: bundle.run.seed_url.clone().unwrap_or_default(),
        total_pages: bundle.run.pages_analyzed as usize,
        total_links: bundle.run.links_found as usize,
        broken_links: bundle.run.broken_links_count as usize,
        blank_pages: bundle.run.blank_pages_count as usize,
        content_pages: bundle.run.content_pages_count as usize,
        overall_score: bundle.run.overall_score,
        elapsed_seconds: bundle
            .run
            .completed_at_ms
            .zip(bundle.run.started_at_ms)
            .map(|(end, start)| (end - start) as f64 / 1000.0)
            .unwrap_or(0.0),
        db_path: config.db_path.clone(),
    });

    Ok(())
}

fn print_summary(report: &AnalysisReport) {
    println!();
    println!("================================================================");
    println!("WEBSITE ANALYSIS SUMMARY");
    println!("================================================================");
    println!("Website:        {}", report.seed_url);
    println!("Run id:         {}", report.run_id);
    println!("Overall score:  {:.0}/100", report.overall_score);
    println!();
    println!("Pages analyzed: {}", report.total_pages);
    println!("Links found:    {}", report.total_links);
    println!("Broken links:   {}", report.broken_links);
    println!("Blank pages:    {}", report.blank_pages);
    println!("Content pages:  {}", report.content_pages);
    println!();
    println!("Elapsed:        {:.1}s", report.elapsed_seconds);
    println!("Database:       {}", report.db_path.display());
    println!("================================================================");
}
