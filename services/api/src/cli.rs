use crate::preview::{run_notify_preview, run_storage_health, NotifyPreviewArgs, StorageHealthArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use oisdrive::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "OISDRIVE contact service",
    about = "Run the OISDRIVE contact API or inspect its integrations from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect notification e-mails
    Notify {
        #[command(subcommand)]
        command: NotifyCommand,
    },
    /// Inspect attachment storage
    Storage {
        #[command(subcommand)]
        command: StorageCommand,
    },
}

#[derive(Subcommand, Debug)]
enum NotifyCommand {
    /// Render both contact e-mails for a sample submission
    Preview(NotifyPreviewArgs),
}

#[derive(Subcommand, Debug)]
enum StorageCommand {
    /// Probe the configured storage backend once and print the report
    Health(StorageHealthArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Notify {
            command: NotifyCommand::Preview(args),
        } => run_notify_preview(args),
        Command::Storage {
            command: StorageCommand::Health(args),
        } => run_storage_health(args).await,
    }
}
