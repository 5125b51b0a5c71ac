use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use deepr_core::{PageFetcher, CATALOG, DEFAULT_MODEL};
use deepr_providers::OpenRouterProvider;
use deepr_research::{Capabilities, ResearchRequest, Researcher};
use deepr_web::{DirectFetcher, JinaReader, SerpApiSearch};

mod config;
mod render;
mod setup;

use config::{mask_key, resolve_model, Config, ReaderBackend, MAX_ITERATIONS_LIMIT};
use render::{EventRenderer, OutputMode};

/// Log level for tracing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Most verbose: every request and parse step
    Trace,
    /// Verbose: per-link and per-completion detail
    Debug,
    /// Standard: iteration milestones
    Info,
    /// Quiet: absorbed failures and errors
    Warn,
    /// Minimal: only errors
    Error,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Parser)]
#[command(name = "deepr")]
#[command(author, version, about = "deepr: iterative web research from the terminal", long_about = None)]
pub struct Cli {
    /// Research query
    pub query: Vec<String>,

    /// Maximum search/plan iterations (1-20, overrides config)
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..=MAX_ITERATIONS_LIMIT as i64))]
    pub max_iterations: Option<u32>,

    /// Model to use, by catalog name or identifier (overrides config)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Config file to use instead of ~/.config/deepr/config.toml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print every event as a JSON line on stdout
    #[arg(long)]
    pub json: bool,

    /// Also write the final report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_enum, default_value = "warn")]
    pub log_level: LogLevel,

    /// Enable debug logging (shorthand for --log-level debug)
    #[arg(short, long)]
    pub debug: bool,

    /// Write logs to file (JSON-lines format)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the supported models
    Models,
    /// Show current configuration
    Config,
    /// Initialize the configuration file in ~/.config/deepr
    Setup,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Resolve log level: --debug overrides --log-level
    let log_level = if cli.debug {
        LogLevel::Debug
    } else {
        cli.log_level
    };

    let filter = EnvFilter::new(log_level.as_filter());

    if let Some(log_path) = &cli.log_file {
        let file = std::fs::File::create(log_path)
            .with_context(|| format!("Failed to create log file: {:?}", log_path))?;
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::sync::Mutex::new(file)))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    match &cli.command {
        Some(Commands::Setup) => return setup::run(),
        Some(Commands::Models) => return list_models(),
        _ => {}
    }

    // A missing .env is not an error
    let _ = dotenvy::dotenv();
    let config = Config::load(cli.config.as_deref())?;

    match &cli.command {
        Some(Commands::Config) => show_config(&config),
        _ => research_mode(&cli, &config).await,
    }
}

async fn research_mode(cli: &Cli, config: &Config) -> Result<()> {
    let query = cli.query.join(" ");
    let max_iterations = cli
        .max_iterations
        .unwrap_or(config.research.max_iterations);
    let model = cli
        .model
        .as_deref()
        .or(config.research.model.as_deref())
        .map(resolve_model)
        .transpose()?;

    let mut request = ResearchRequest::new(query, max_iterations)?;
    if let Some(model) = model {
        request = request.with_model(model);
    }

    // An empty query is answered without calling any capability.
    if !request.query().trim().is_empty() {
        config.llm_api_key()?;
        config.search_api_key()?;
    }

    let researcher = Researcher::new(build_capabilities(config)?);
    tracing::info!(
        max_iterations,
        model = model.map(|m| m.id).unwrap_or(config.llm.default_model.as_str()),
        "Starting research"
    );

    let mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };
    let mut renderer = EventRenderer::new(mode, std::io::stdout(), std::io::stderr());

    let mut report = String::new();
    let mut stream = researcher.run(request);
    while let Some(event) = stream.next().await {
        renderer.render(&event)?;
        if event.is_final() {
            report = event.report;
        }
    }

    if let Some(path) = &cli.output {
        if report.is_empty() {
            eprintln!("No report produced; {} was not written", path.display());
        } else {
            std::fs::write(path, &report)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            eprintln!("Report written to {}", path.display());
        }
    }

    Ok(())
}

/// One HTTP client for the whole run, shared by every capability.
fn build_capabilities(config: &Config) -> Result<Capabilities> {
    let client = deepr_web::build_client(
        Duration::from_secs(config.http.timeout_secs),
        config.http.user_agent.as_deref(),
    )
    .context("Failed to build HTTP client")?;

    let provider = OpenRouterProvider::new(
        client.clone(),
        config.llm.api_key.clone().unwrap_or_default(),
    )
    .with_base_url(&config.llm.base_url)
    .with_default_model(&config.llm.default_model)
    .with_app_title(&config.llm.app_title);

    let search = SerpApiSearch::new(
        client.clone(),
        config.search.api_key.clone().unwrap_or_default(),
    )
    .with_endpoint(&config.search.endpoint)
    .with_engine(&config.search.engine);

    let fetcher: Arc<dyn PageFetcher> = match config.reader.backend {
        ReaderBackend::Jina => {
            let mut reader = JinaReader::new(client).with_base_url(&config.reader.base_url);
            if let Some(key) = config.reader_api_key() {
                reader = reader.with_api_key(key);
            }
            Arc::new(reader)
        }
        ReaderBackend::Direct => Arc::new(DirectFetcher::new(client)),
    };

    Ok(Capabilities::new(
        Arc::new(provider),
        Arc::new(search),
        fetcher,
    ))
}

fn list_models() -> Result<()> {
    println!("Models:");
    let width = CATALOG.iter().map(|m| m.name.len()).max().unwrap_or(0);
    for model in CATALOG {
        let marker = if model.id == DEFAULT_MODEL.id {
            " (default)"
        } else {
            ""
        };
        println!("  {:width$}  {}{}", model.name, model.id, marker, width = width);
    }
    Ok(())
}

fn show_config(config: &Config) -> Result<()> {
    let key = |value: &Option<String>| match value.as_deref() {
        Some(k) if !k.trim().is_empty() => mask_key(k),
        _ => "(not set)".to_string(),
    };

    println!("Configuration:");

    println!("\nLLM:");
    println!("  API key: {}", key(&config.llm.api_key));
    println!("  Base URL: {}", config.llm.base_url);
    println!("  Default model: {}", config.llm.default_model);
    println!("  App title: {}", config.llm.app_title);

    println!("\nSearch:");
    println!("  API key: {}", key(&config.search.api_key));
    println!("  Endpoint: {}", config.search.endpoint);
    println!("  Engine: {}", config.search.engine);

    println!("\nReader:");
    println!("  Backend: {:?}", config.reader.backend);
    if config.reader.backend == ReaderBackend::Jina {
        println!("  API key: {}", key(&config.reader.api_key));
        println!("  Base URL: {}", config.reader.base_url);
    }

    println!("\nHTTP:");
    println!("  Timeout: {}s", config.http.timeout_secs);
    println!(
        "  User agent: {}",
        config
            .http
            .user_agent
            .as_deref()
            .unwrap_or(deepr_web::DEFAULT_USER_AGENT)
    );

    println!("\nResearch:");
    println!("  Max iterations: {}", config.research.max_iterations);
    println!(
        "  Model: {}",
        config.research.model.as_deref().unwrap_or("(provider default)")
    );
    Ok(())
}
