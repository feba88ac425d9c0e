//! logwatch - log ingestion with throttled email alerts
//!
//! Reads newline-delimited JSON log records from stdin or a file and raises
//! at most one alert per signal per cooldown window.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use logwatch::{Ingestor, ServiceConfig, spawn_sweeper};
use tokio::io::{AsyncBufRead, BufReader};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_FILTER: &str = "logwatch=info,logwatch_alerts=info";

#[derive(Parser)]
#[command(name = "logwatch")]
#[command(about = "Log ingestion with throttled email alerts")]
#[command(version)]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per event
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Process log records until end of input
    Run {
        /// Path to config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Input file, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Sender address for email alerts
        #[arg(long, env = "SENDER_EMAIL")]
        sender: Option<String>,

        /// Comma-separated recipient addresses
        #[arg(long, env = "RECEIVER_EMAIL")]
        receiver: Option<String>,

        /// SMTP password for the sender account
        #[arg(long, env = "EMAIL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Generate a default config file
    InitConfig {
        /// Path to write config
        #[arg(short, long, default_value = "logwatch.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::Run {
            config,
            input,
            sender,
            receiver,
            password,
        } => {
            let config = match config {
                Some(path) => ServiceConfig::load(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => ServiceConfig::default(),
            };
            let config = config.with_email_overrides(sender, receiver, password);
            run(config, &input).await?;
        }

        Commands::InitConfig { output } => {
            init_config(&output)?;
        }
    }

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

async fn run(config: ServiceConfig, input: &Path) -> anyhow::Result<()> {
    let manager = Arc::new(config.build_manager()?);
    let sweeper = spawn_sweeper(Arc::clone(&manager), config.sweep_interval());
    let ingestor = Ingestor::new(Arc::clone(&manager));

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = if input == Path::new("-") {
        info!("reading log records from stdin");
        Box::new(BufReader::new(tokio::io::stdin()))
    } else {
        info!(input = %input.display(), "reading log records");
        let file = tokio::fs::File::open(input)
            .await
            .with_context(|| format!("opening {}", input.display()))?;
        Box::new(BufReader::new(file))
    };

    let result = ingestor.run(reader).await;
    sweeper.abort();
    let summary = result?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn init_config(output: &Path) -> anyhow::Result<()> {
    ServiceConfig::default().save(output)?;

    println!("Config written to {}", output.display());
    println!();
    println!("Set SENDER_EMAIL, RECEIVER_EMAIL and EMAIL_PASSWORD, then run:");
    println!("  logwatch run --config {}", output.display());

    Ok(())
}
