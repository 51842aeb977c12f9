//! Course Advisor - Main Entry Point

use clap::{Parser, Subcommand};
use course_advisor::cli::{display, run_repl};
use course_advisor::config::AdvisorConfig;
use course_advisor::llm::provider::LlmProvider;
use course_advisor::llm::providers::{GeminiConfig, GeminiProvider, OpenAiConfig, OpenAiProvider};
use course_advisor::observability::init_default_logging;
use course_advisor::scraper::{DirectFetchGateway, FirecrawlClient, FirecrawlConfig, ScrapeGateway};
use course_advisor::{build_coordinator, AdvisorServices};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Conversational assistant for university course and professor questions
#[derive(Parser)]
#[command(name = "course-advisor")]
#[command(about = "Routes course and professor questions to live-data agents")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "COURSE_ADVISOR_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat (default)
    Chat,
    /// Answer a single question and exit
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Validate configuration
    Config {
        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging(cli.verbose);

    info!("Starting course-advisor v{}", env!("CARGO_PKG_VERSION"));

    let config = match AdvisorConfig::discover(cli.config.as_deref()) {
        Ok((config, path)) => {
            match path {
                Some(path) => info!("Loaded configuration from {}", path.display()),
                None => info!("No configuration file found, using defaults"),
            }
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("{}", display::render_error(&e.to_string()));
            process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_chat(config).await,
        Commands::Ask { query } => run_ask(config, query.join(" ")).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        eprintln!("{}", display::render_error(&e.to_string()));
        process::exit(1);
    }
}

async fn run_chat(config: AdvisorConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut coordinator = build_coordinator(&config, build_services(&config)?)?;
    run_repl(&mut coordinator).await;
    Ok(())
}

async fn run_ask(config: AdvisorConfig, query: String) -> Result<(), Box<dyn std::error::Error>> {
    let mut coordinator = build_coordinator(&config, build_services(&config)?)?;
    let reply = coordinator.execute(&query).await;
    println!("{reply}");
    Ok(())
}

fn handle_config_command(config: &AdvisorConfig, show: bool) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("{}", config.to_toml_string()?);
    }

    match config.get_llm_api_key() {
        Ok(_) => println!("LLM key ({}) found", config.llm.api_key_env),
        Err(e) => println!("Warning: {e}"),
    }
    if config.get_scraper_api_key().is_none() {
        println!(
            "{} not set: instructor lookups disabled, courses fetched directly",
            config.scraper.api_key_env
        );
    }

    println!("Configuration is valid");
    Ok(())
}

/// Provider factory for creating LLM providers from configuration
struct LlmProviderFactory;

impl LlmProviderFactory {
    fn create_provider(
        config: &AdvisorConfig,
    ) -> Result<Arc<dyn LlmProvider>, Box<dyn std::error::Error>> {
        match config.llm.provider.as_str() {
            "gemini" => {
                let mut gemini_config = GeminiConfig {
                    api_key: config.get_llm_api_key()?,
                    timeout: config.llm_timeout(),
                    ..Default::default()
                };
                if let Some(base_url) = &config.llm.base_url {
                    gemini_config.base_url = base_url.clone();
                }
                Ok(Arc::new(GeminiProvider::new(gemini_config)?))
            }
            "openai" => {
                let mut openai_config = OpenAiConfig {
                    api_key: config.get_llm_api_key()?,
                    timeout: config.llm_timeout(),
                    ..Default::default()
                };
                if let Some(base_url) = &config.llm.base_url {
                    openai_config.base_url = base_url.clone();
                }
                Ok(Arc::new(OpenAiProvider::new(openai_config)?))
            }
            provider => Err(format!("Unsupported LLM provider: {provider}").into()),
        }
    }
}

/// Scraper factory; Firecrawl when a key is configured, direct HTTP otherwise
struct ScraperFactory;

impl ScraperFactory {
    fn create_scraper(
        config: &AdvisorConfig,
    ) -> Result<(Arc<dyn ScrapeGateway>, bool), Box<dyn std::error::Error>> {
        match config.get_scraper_api_key() {
            Some(api_key) => {
                let client = FirecrawlClient::new(FirecrawlConfig {
                    api_key,
                    base_url: config.scraper.base_url.clone(),
                    timeout: config.scraper_timeout(),
                })?;
                Ok((Arc::new(client), true))
            }
            None => {
                warn!(
                    "{} not set; using direct HTTP fetching without instructor lookups",
                    config.scraper.api_key_env
                );
                Ok((Arc::new(DirectFetchGateway::new(config.scraper_timeout())?), false))
            }
        }
    }
}

fn build_services(config: &AdvisorConfig) -> Result<AdvisorServices, Box<dyn std::error::Error>> {
    let provider = LlmProviderFactory::create_provider(config)?;
    let (scraper, instructor_enabled) = ScraperFactory::create_scraper(config)?;

    Ok(AdvisorServices {
        provider,
        scraper,
        instructor_enabled,
    })
}
