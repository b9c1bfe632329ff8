//! Memo-keeper: voice memo recorder with a durable upload handoff.

mod app;
mod app_command;
mod cli;
mod config;
mod console_handler;
mod error;
mod folder_uploader;
mod logging;

pub(crate) use {
    app::App,
    app_command::AppCommand,
    console_handler::ConsoleHandler,
    error::{AppError, Result as AppResult},
    folder_uploader::FolderUploader,
};

use crate::{
    cli::{Cli, CliCommand, handle_pending_command, handle_send_command},
    config::Config,
};

use memo_keeper_core::RecordingFileStore;

use clap::Parser;
use tracing::{error, info};

/// Application entry point.
#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let data_dir = match config.data_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Failed to resolve data directory: {}", e);
            std::process::exit(1);
        }
    };

    // Keeps the non-blocking file writer alive until main returns.
    let _log_guard = match logging::init(&data_dir.join("logs"), cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialise logging: {}", e);
            std::process::exit(1);
        }
    };

    info!(data_dir = ?data_dir, owner_id = %config.account.owner_id, "Starting");

    let files = RecordingFileStore::new(&data_dir);

    let result = match cli.command.unwrap_or(CliCommand::Run) {
        CliCommand::Run => match App::build(config, files) {
            Ok(app) => app.run().await,
            Err(e) => Err(e),
        },
        CliCommand::Send(args) => handle_send_command(args, &files).await,
        CliCommand::Pending => handle_pending_command(&files, &config.account.owner_id).await,
    };

    if let Err(e) = result {
        error!(error = ?e, "Memo-keeper failed");
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
