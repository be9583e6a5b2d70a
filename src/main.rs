//! DeFi Yield Ranker CLI
//!
//! Command-line interface for ranking vault yields and invoking agent tools.

use alloy::primitives::Address;
use clap::{Parser, Subcommand};
use defi_yield_ranker::{Config, Error, Network, Result, ToolRegistry, YieldRanker};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "yield-ranker")]
#[command(about = "Risk-adjusted ranking of DeFi lending vault yields")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank every yield option by risk-adjusted APY
    Rank {
        /// Network (base)
        #[arg(short, long, default_value = "base")]
        network: String,
    },

    /// List Morpho vaults for an asset
    Vaults {
        /// Network (base)
        #[arg(short, long, default_value = "base")]
        network: String,

        /// Asset symbol; defaults to the configured base asset
        #[arg(short, long)]
        asset: Option<String>,
    },

    /// Show DEX market data for a token
    Token {
        /// Token address
        #[arg(long)]
        address: String,

        /// Network (base)
        #[arg(short, long, default_value = "base")]
        network: String,
    },

    /// List available agent tools
    Tools,

    /// Invoke an agent tool
    Invoke {
        /// Tool name
        #[arg(short, long)]
        tool: String,

        /// Tool arguments as JSON
        #[arg(short, long)]
        args: Option<String>,
    },

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Rank { network } => run_rank(&config, &network).await?,
        Commands::Vaults { network, asset } => run_vaults(&config, &network, asset).await?,
        Commands::Token { address, network } => run_token(&config, &address, &network).await?,
        Commands::Tools => run_tools(&config)?,
        Commands::Invoke { tool, args } => run_invoke(&config, &tool, args).await?,
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn resolve_chain(config: &Config, network: &str) -> Result<u64> {
    let network: Network = network.parse()?;
    if !config.endpoints.supports(network) {
        return Err(Error::UnsupportedNetwork(network.name().to_string()));
    }
    Ok(network.chain_id())
}

async fn run_rank(config: &Config, network: &str) -> Result<()> {
    let chain_id = resolve_chain(config, network)?;
    let ranker = YieldRanker::from_config(config)?;
    let options = ranker.rank_yield_options(chain_id).await?;

    println!(
        "{:<40} {:>12} {:>10} {:>14}",
        "NAME", "TVL (USD)", "APY", "RISK-ADJ APY"
    );
    for option in &options {
        println!(
            "{:<40} {:>12.0} {:>10.4} {:>14.4}",
            option.name, option.total_deposits_usd, option.total_apy, option.risk_adjusted_apy
        );
    }
    Ok(())
}

async fn run_vaults(config: &Config, network: &str, asset: Option<String>) -> Result<()> {
    let chain_id = resolve_chain(config, network)?;
    let ranker = YieldRanker::from_config(config)?;
    let symbol = asset.unwrap_or_else(|| config.base_asset_symbol.clone());

    let repository = ranker.repository();
    let base_asset = repository.get_asset_by_symbol(chain_id, &symbol).await?;
    let vaults = repository.list_vaults(chain_id, base_asset.address).await?;

    println!("{}", serde_json::to_string_pretty(&vaults)?);
    Ok(())
}

async fn run_token(config: &Config, address: &str, network: &str) -> Result<()> {
    let chain_id = resolve_chain(config, network)?;
    let address: Address = address
        .parse()
        .map_err(|e| Error::InvalidArgument(format!("Invalid token address: {}", e)))?;

    let ranker = YieldRanker::from_config(config)?;
    let data = ranker.enricher().token(chain_id, address).await;

    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}

fn run_tools(config: &Config) -> Result<()> {
    let registry = ToolRegistry::with_yield_tools(Arc::new(YieldRanker::from_config(config)?));
    for tool in registry.tools() {
        println!("{}\n  {}", tool.name(), tool.description());
        println!(
            "  input: {}",
            serde_json::to_string(&tool.input_schema())?
        );
    }
    Ok(())
}

async fn run_invoke(config: &Config, tool: &str, args: Option<String>) -> Result<()> {
    let args = match args {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| Error::InvalidArgument(format!("Invalid --args JSON: {}", e)))?,
        None => serde_json::Value::Null,
    };

    let registry = ToolRegistry::with_yield_tools(Arc::new(YieldRanker::from_config(config)?));
    println!("{}", registry.invoke(tool, args).await?);
    Ok(())
}
