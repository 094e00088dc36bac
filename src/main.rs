use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use hostwatch::cli::format::{parse_duration, parse_instant};
use hostwatch::cli::CliError;
use hostwatch::config::{load_or_default, OutputFormat, ReadStart};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hostwatch")]
#[command(about = "Host connection log indexer and monitor", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format, overriding the config file
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the hosts a host exchanged connections with in a time window
    Query {
        /// Log file to index
        file: PathBuf,
        /// Window start, ISO-8601 (e.g. 2021-01-01T00:00:00Z)
        #[arg(value_parser = parse_instant)]
        start: DateTime<Utc>,
        /// Window end, ISO-8601 (e.g. 2021-01-01T01:00:00Z)
        #[arg(value_parser = parse_instant)]
        end: DateTime<Utc>,
        /// Host to find connections for
        host: String,
    },
    /// Tail a growing log file and periodically report on a host
    Monitor {
        /// Log file being written
        file: PathBuf,
        /// Host to watch
        host: String,
        /// Only ingest lines appended after startup
        #[arg(long)]
        from_end: bool,
        /// Report interval, overriding the config file (e.g. 30m)
        #[arg(long, value_parser = parse_duration)]
        interval: Option<Duration>,
    },
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a starter config file
    Init {
        #[arg(long)]
        stdout: bool,
    },
}

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries query results and reports
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hostwatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = dispatch(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Query {
            file,
            start,
            end,
            host,
        } => {
            let config = load_or_default(cli.config.as_deref())?;
            let format = cli.format.unwrap_or(config.output.format);
            hostwatch::cli::query::run(&file, start, end, &host, format)
        }
        Commands::Monitor {
            file,
            host,
            from_end,
            interval,
        } => {
            let mut config = load_or_default(cli.config.as_deref())?;
            if from_end {
                config.monitor.start = ReadStart::End;
            }
            if let Some(interval) = interval {
                config.monitor.report_interval = interval;
            }
            let format = cli.format.unwrap_or(config.output.format);
            hostwatch::cli::monitor::run(&file, &host, config, format).await
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { stdout } => hostwatch::cli::config::init(stdout),
        },
    }
}
