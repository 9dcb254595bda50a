use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dyndns::config::{Credentials, Settings, ENV_API_EMAIL, ENV_API_KEY, ENV_ZONE_ID};
use dyndns::daemon;
use dyndns::dns::{ClientOptions, CloudflareProvider, DnsProvider};
use dyndns::ip::{EchoResolver, IpResolver};

#[derive(Parser)]
#[command(name = "dyndns")]
#[command(about = "Dynamic DNS updater - keeps Cloudflare A records pointed at the current public IPv4 address")]
#[command(version)]
struct Cli {
    /// Path to the settings file
    #[arg(long, global = true, env = "DYNDNS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon to keep A records in sync with the public IP (default)
    Daemon,

    /// Show the current public IP and the A records of the zone
    Check,

    /// Show a single DNS record
    Record {
        /// Record identifier
        id: String,
    },

    /// Show configuration file location and effective settings
    Config,
}

fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref());

    // Initialize logging with config level or default
    let log_level = settings
        .as_ref()
        .map(|s| s.daemon.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_logging(&log_level);

    match cli.command.unwrap_or(Commands::Daemon) {
        Commands::Daemon => {
            let result = match settings {
                Ok(settings) => start_daemon(settings).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                error!("{:#}", e);
                std::process::exit(1);
            }
        }

        Commands::Check => {
            check_status(settings?).await?;
        }

        Commands::Record { id } => {
            show_record(settings?, &id).await?;
        }

        Commands::Config => {
            show_config(cli.config, &settings?)?;
        }
    }

    Ok(())
}

async fn start_daemon(settings: Settings) -> Result<()> {
    let credentials = Credentials::from_env()?;
    info!("Starting dyndns daemon");
    daemon::run(settings, credentials).await
}

async fn check_status(settings: Settings) -> Result<()> {
    let credentials = Credentials::from_env()?;
    let resolver = EchoResolver::from_settings(&settings)?;

    println!("Checking public IP...\n");

    let public_ip = match resolver.resolve().await {
        Ok(ip) => {
            println!("Public IP: {}", ip);
            Some(ip.to_string())
        }
        Err(e) => {
            println!("Public IP: Error - {}", e);
            None
        }
    };

    println!("\nChecking DNS records...\n");

    let (provider, zone) =
        CloudflareProvider::connect(&credentials, ClientOptions::from(&settings)).await?;
    println!("Zone: {} ({})\n", zone.name, zone.id);

    let records = provider.list_records(&credentials.zone_id).await?;
    let a_records: Vec<_> = records.iter().filter(|r| r.is_a_record()).collect();

    if a_records.is_empty() {
        println!("No A records found.");
    }

    for record in a_records {
        let status = match &public_ip {
            Some(ip) if *ip == record.content => "up to date",
            Some(_) => "needs update",
            None => "unknown",
        };
        println!("{} -> {} ({})", record.name, record.content, status);
    }

    Ok(())
}

async fn show_record(settings: Settings, id: &str) -> Result<()> {
    let credentials = Credentials::from_env()?;
    let provider = CloudflareProvider::new(&credentials, ClientOptions::from(&settings))?;

    let record = provider.get_record(&credentials.zone_id, id).await?;

    println!("{}", serde_json::to_string_pretty(&record)?);

    Ok(())
}

fn show_config(path: Option<PathBuf>, settings: &Settings) -> Result<()> {
    let config_path = path.unwrap_or_else(Settings::config_path);

    println!("Configuration file location: {}", config_path.display());
    if !config_path.exists() {
        println!("(file not found, using defaults)");
    }

    println!("\nEffective configuration:\n");
    println!("{}", toml::to_string_pretty(settings)?);

    println!("Credentials:\n");
    for name in [ENV_API_EMAIL, ENV_API_KEY, ENV_ZONE_ID] {
        let state = match std::env::var(name) {
            Ok(v) if !v.trim().is_empty() => "set",
            _ => "not set",
        };
        println!("{}: {}", name, state);
    }

    Ok(())
}
