use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use proxy_harvest::{
    config::AppConfig,
    proxy::{
        writer, ContentSource, FileSource, HttpSource, Pipeline, PipelineOutcome, ProxyRecord,
    },
};
use std::path::PathBuf;

/// Collects proxies from subscription feeds and keeps the reachable ones
#[derive(Parser)]
#[command(name = "proxy-harvest")]
#[command(about = "Collects proxies from subscription feeds and keeps the reachable ones")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,
}

/// Command-line values that take precedence over the configuration file
#[derive(Args)]
struct Overrides {
    /// Number of concurrent checks
    #[arg(short = 'n', long, global = true)]
    concurrency: Option<usize>,
    /// Transport check timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,
    /// Skip the HTTP check through forward proxies
    #[arg(long, global = true)]
    no_http_check: bool,
    /// URL to test forward proxies against
    #[arg(long, global = true)]
    test_url: Option<String>,
    /// Keep only the fastest N proxies
    #[arg(long, global = true)]
    top: Option<usize>,
    /// Directory for the output files
    #[arg(short, long, global = true)]
    output_dir: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the configured sources, check them and write the results
    Run {
        /// Subscription URLs to use instead of the configured ones
        #[arg(short, long)]
        url: Vec<String>,
    },
    /// Check proxies from local subscription files and write the results
    Check {
        /// Input files with subscription content
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Decode and deduplicate proxies from local files without checking them
    Parse {
        /// Input files with subscription content
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output file for the decoded descriptors
        #[arg(short = 'w', long)]
        write: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    apply_overrides(&mut config, &cli.overrides);

    match cli.command {
        Commands::Run { url } => {
            if !url.is_empty() {
                config.sources = url;
            }
            println!("Fetching {} sources", config.sources.len());
            let source = HttpSource::with_config(config.sources.clone(), config.fetch_config())?;
            check_and_write(&config, &source).await?;
        }
        Commands::Check { inputs } => {
            let source = FileSource::new(inputs);
            check_and_write(&config, &source).await?;
        }
        Commands::Parse { inputs, write } => {
            let pipeline = Pipeline::from_config(&config);
            let contents = FileSource::new(inputs).fetch().await;
            let records = pipeline.collect(&contents);

            println!("Decoded {} unique proxies", records.len());

            if let Some(path) = write {
                writer::write_plain_text(&records, &path)?;
                println!("Saved descriptors to {:?}", path);
            } else {
                for record in &records {
                    println!("{}", record.raw);
                }
            }
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut AppConfig, overrides: &Overrides) {
    if let Some(concurrency) = overrides.concurrency {
        config.max_concurrent_checks = concurrency;
    }
    if let Some(timeout) = overrides.timeout {
        config.check_timeout_secs = timeout;
    }
    if overrides.no_http_check {
        config.enable_http_check = false;
    }
    if let Some(url) = &overrides.test_url {
        config.test_url = url.clone();
    }
    if let Some(top) = overrides.top {
        config.top_n = Some(top);
    }
    if let Some(dir) = &overrides.output_dir {
        config.output.dir = dir.clone();
    }
}

async fn check_and_write<S: ContentSource>(config: &AppConfig, source: &S) -> Result<()> {
    println!(
        "Checking with {} concurrent checks, timeout: {}s",
        config.max_concurrent_checks, config.check_timeout_secs
    );
    if config.enable_http_check {
        println!("Test URL: {}", config.test_url);
    }
    println!();

    let pipeline = Pipeline::from_config(config);
    let records = match pipeline.run_source(source).await {
        PipelineOutcome::Ranked(records) => records,
        PipelineOutcome::Empty(stage) => {
            println!("Nothing to write: {}", stage);
            return Ok(());
        }
    };

    let output = config.output_writer();
    output.write_all(&records)?;
    println!("Saved {} working proxies to {}", records.len(), config.output.dir);

    println!("\nFastest proxies:");
    for record in records.iter().take(10) {
        print_record(record);
    }
    Ok(())
}

fn print_record(record: &ProxyRecord) {
    if let Some(latency) = record.latency_ms {
        println!("  {} ({}ms)", record, latency);
    }
}
