//! drive-print: list, print and delete the PDFs of one Google Drive folder.
//!
//! Every command builds a `CoreService` from the global options, runs one
//! operation and prints the outcome. `watch` keeps the process alive and
//! reports catalog changes until interrupted.

use anyhow::{Context as _, Result};
use bridge_desktop::JsonLinesLoggerSink;
use bridge_traits::{LogLevel, LoggerSink};
use clap::{Parser, Subcommand};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_service::{CoreConfig, CoreService, OAuthClientSecrets};
use std::path::PathBuf;
use std::sync::Arc;

mod commands;
mod output;

use commands::{
    auth::AuthCommand, delete::DeleteCommand, list::ListCommand, print::PrintCommand,
    settings::SettingsCommand, status::StatusCommand, watch::WatchCommand,
};
use output::{get_formatter, OutputFormat, OutputFormatter};

#[derive(Debug, Parser)]
#[command(
    name = "drive-print",
    version,
    about = "Print PDFs straight from a Google Drive folder"
)]
pub struct Cli {
    /// Drive folder holding the documents
    #[arg(long, global = true, env = "DRIVE_PRINT_FOLDER_ID")]
    folder_id: Option<String>,

    /// OAuth client credentials file (defaults to <data-dir>/credentials.json)
    #[arg(long, global = true, env = "DRIVE_PRINT_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Directory for the token, settings and download cache
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// PDF print program used for silent printing
    #[arg(long, global = true)]
    print_program: Option<PathBuf>,

    /// Also append log records as JSON lines to this file
    #[arg(long, global = true, env = "DRIVE_PRINT_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the PDFs in the folder
    List(ListCommand),
    /// Print one, several or all documents
    Print(PrintCommand),
    /// Delete documents from the folder
    Delete(DeleteCommand),
    /// Show or change print settings
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Check the connection to Drive
    Status(StatusCommand),
    /// Keep the file list fresh and report changes
    Watch(WatchCommand),
    /// Sign in again or sign out
    #[command(subcommand)]
    Auth(AuthCommand),
}

/// What every command receives.
pub struct Context {
    pub service: CoreService,
    pub format: OutputFormat,
    pub out: Box<dyn OutputFormatter>,
}

impl Cli {
    fn build_service(&self) -> Result<CoreService> {
        let folder_id = self
            .folder_id
            .clone()
            .context("No folder id given. Use --folder-id or set DRIVE_PRINT_FOLDER_ID.")?;
        let data_dir = self
            .data_dir
            .clone()
            .unwrap_or_else(bridge_desktop::default_data_dir);
        let credentials = self
            .credentials
            .clone()
            .unwrap_or_else(|| data_dir.join("credentials.json"));

        let secrets = OAuthClientSecrets::from_file(&credentials).with_context(|| {
            format!(
                "Failed to read OAuth client credentials from {}",
                credentials.display()
            )
        })?;

        let mut builder = CoreConfig::builder()
            .folder_id(folder_id)
            .data_dir(data_dir)
            .oauth(secrets);
        if let Some(program) = &self.print_program {
            builder = builder.print_program(program);
        }

        let config = builder.build().context("Invalid configuration")?;
        Ok(CoreService::new(config))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LogLevel::Warn,
        1 => LogLevel::Info,
        _ => LogLevel::Debug,
    };
    let mut logging = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(level)
        .with_target(false);
    let log_sink = cli
        .log_file
        .as_ref()
        .map(|path| Arc::new(JsonLinesLoggerSink::new(path).with_min_level(level)));
    if let Some(sink) = &log_sink {
        logging = logging.with_logger_sink(sink.clone());
    }
    init_logging(logging).context("Failed to initialise logging")?;

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let ctx = Context {
        service: cli.build_service()?,
        format,
        out: get_formatter(format),
    };

    let result = match &cli.command {
        Commands::List(cmd) => cmd.execute(&ctx).await,
        Commands::Print(cmd) => cmd.execute(&ctx).await,
        Commands::Delete(cmd) => cmd.execute(&ctx).await,
        Commands::Settings(cmd) => cmd.execute(&ctx).await,
        Commands::Status(cmd) => cmd.execute(&ctx).await,
        Commands::Watch(cmd) => cmd.execute(&ctx).await,
        Commands::Auth(cmd) => cmd.execute(&ctx).await,
    };

    if let Some(sink) = &log_sink {
        sink.flush().await.ok();
    }
    result
}
