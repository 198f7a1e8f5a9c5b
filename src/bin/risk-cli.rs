//! Risk analysis CLI entry point.
//!
//! Thin wrapper over the library pipeline: reads API keys and service
//! endpoints from the environment, runs a single analysis, prints JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use defi_address_risk::core::validation::detect_chain;
use defi_address_risk::{RiskAnalyzer, RiskConfig};

#[derive(Parser)]
#[command(name = "risk-cli")]
#[command(about = "Crypto address risk analysis")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full two-phase (community + model) analysis for an address
    Analyze {
        /// Address to analyze (Bitcoin or Ethereum)
        address: String,
    },
    /// Extract and print the model feature vector for an address
    Features {
        /// Address to extract features for
        address: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let args = Args::parse();
    let config = RiskConfig::from_env();
    let analyzer = RiskAnalyzer::new(config);

    match args.command {
        Commands::Analyze { address } => {
            info!("Analyzing address: {}", address);
            let verdict = analyzer
                .analyze_address(&address)
                .await
                .with_context(|| format!("Analysis failed for {}", address))?;
            println!("{}", serde_json::to_string_pretty(&verdict)?);
        }
        Commands::Features { address } => {
            let chain = detect_chain(address.trim())
                .with_context(|| format!("Could not detect network for {}", address))?;
            info!("Extracting {} features for: {}", chain, address);
            let features = analyzer
                .extract_features(&address, chain)
                .await
                .with_context(|| format!("Feature extraction failed for {}", address))?;
            println!("{}", serde_json::to_string_pretty(&features)?);
        }
    }

    Ok(())
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}
