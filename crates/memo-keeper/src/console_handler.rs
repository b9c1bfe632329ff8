//! Line-oriented console control.
//!
//! Reads commands from an async line source and forwards them to the main
//! application. End of input is treated as a shutdown request.

use crate::{AppCommand, AppError, AppResult};

use std::panic::Location;

use error_location::ErrorLocation;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::{mpsc, watch},
};
use tracing::{debug, info, instrument, warn};

/// Forwards console lines to the app as [`AppCommand`]s.
pub struct ConsoleHandler {
    command_tx: mpsc::Sender<AppCommand>,
}

impl ConsoleHandler {
    /// Create a handler that sends on `command_tx`.
    pub fn new(command_tx: mpsc::Sender<AppCommand>) -> Self {
        Self { command_tx }
    }

    /// Read commands until end of input, `quit`, or shutdown.
    #[instrument(skip_all)]
    pub async fn run<R>(&self, input: R, mut shutdown_rx: watch::Receiver<bool>) -> AppResult<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();

        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Console handler shutting down");
                        break;
                    }
                }
                line = lines.next_line() => {
                    let line = match line? {
                        Some(line) => line,
                        None => {
                            debug!("Console input closed");
                            self.send(AppCommand::Shutdown).await?;
                            break;
                        }
                    };

                    if line.trim().is_empty() {
                        continue;
                    }

                    match line.parse::<AppCommand>() {
                        Ok(command) => {
                            self.send(command).await?;
                            if command == AppCommand::Shutdown {
                                break;
                            }
                        }
                        Err(message) => {
                            warn!(input = %line.trim(), "Unrecognised console command");
                            eprintln!("{}", message);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    async fn send(&self, command: AppCommand) -> AppResult<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|e| AppError::ChannelSendFailed {
                message: format!("Failed to send {:?}: {}", command, e),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}
