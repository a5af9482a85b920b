//! beacon — command-line companion to the beacon client libraries.
//!
//! # Usage
//!
//! ```text
//! beacon nrn parse nrn:beacon:acme:sys:api:1.0.0:blue::api
//! beacon init --tenant acme --name api --feature-instance nrn:beacon:acme:fin:api:1.0.0:blue::blue
//! beacon watch --source ./fin.json --interval 5s
//! beacon run --config beacon.toml
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "beacon",
    about = "Beacon — register systems, report expectations, watch feature instances",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and derive resource names.
    Nrn {
        #[command(subcommand)]
        action: NrnAction,
    },
    /// Write a beacon.toml scaffold.
    Init {
        /// Beacon service base URL.
        #[arg(long, default_value = "http://localhost:9005/")]
        base_url: String,
        #[arg(long)]
        tenant: String,
        /// Name of the root system.
        #[arg(long)]
        name: String,
        /// NRN of the feature instance the system belongs to.
        #[arg(long)]
        feature_instance: String,
        /// Output file.
        #[arg(short, long, default_value = "beacon.toml")]
        output: PathBuf,
    },
    /// Watch a feature-instance document and print every change.
    Watch {
        /// File path, file:// or http:// locator.
        #[arg(short, long)]
        source: String,
        /// Poll interval, e.g. "5s" or "500ms".
        #[arg(short, long, default_value = "30s")]
        interval: String,
    },
    /// Register the configured system and run its heartbeat until Ctrl-C.
    Run {
        #[arg(short, long, default_value = "beacon.toml")]
        config: PathBuf,
    },
}

#[derive(Subcommand)]
enum NrnAction {
    /// Parse an NRN and print its segments.
    Parse {
        nrn: String,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Derive a child system or expectation address.
    Child {
        nrn: String,
        /// Child system name.
        #[arg(long, conflicts_with = "expectation", required_unless_present = "expectation")]
        system: Option<String>,
        /// Child expectation name (parent must be a system).
        #[arg(long)]
        expectation: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,beacon=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Nrn { action } => match action {
            NrnAction::Parse { nrn, format } => commands::nrn::parse(&nrn, &format),
            NrnAction::Child {
                nrn,
                system,
                expectation,
            } => commands::nrn::child(&nrn, system.as_deref(), expectation.as_deref()),
        },
        Commands::Init {
            base_url,
            tenant,
            name,
            feature_instance,
            output,
        } => commands::init::init(&base_url, &tenant, &name, &feature_instance, &output),
        Commands::Watch { source, interval } => commands::watch::watch(&source, &interval).await,
        Commands::Run { config } => commands::run::run(&config).await,
    }
}
