use clap::{Parser, Subcommand};
use rscache_cli::{EnumArgs, ExtractArgs, InfoArgs, commands, load_config};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "rsct",
    about = "Inspect and extract RuneTek5 game caches",
    version,
    author,
    long_about = "A command-line tool for reading RuneTek5 cache directories: list categories, extract files into a directory tree and decode enums."
)]
struct Cli {
    /// Set the logging level
    #[arg(short, long, value_enum, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List categories and their file counts
    Info(InfoArgs),

    /// Extract files into {output}/extracted/{category}/
    Extract(ExtractArgs),

    /// Decode an enum from category 17 and print it as JSON
    Enum(EnumArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG takes precedence over --log-level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::from(cli.log_level).as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Info(args) => commands::info::handle(&args, &config)?,
        Commands::Extract(args) => commands::extract::handle(args, config).await?,
        Commands::Enum(args) => commands::enum_file::handle(args, config).await?,
    }

    Ok(())
}
