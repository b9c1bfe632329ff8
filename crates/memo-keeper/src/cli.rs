use crate::AppResult;

use memo_keeper_core::{
    ControlAction, ControlMailbox, ControlMailboxEntry, FileMailbox, PendingUploadQueue,
    RecordingFileStore, RouteAction,
};

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "memo-keeper")]
#[command(about = "Record voice memos and hand them off for upload", long_about = None)]
pub struct Cli {
    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Run the recorder with console controls (default)
    Run,
    /// Ask a running recorder to pause, resume or stop
    Send(SendCliArgs),
    /// List recordings waiting for upload
    Pending,
}

#[derive(ClapArgs, Debug)]
pub struct SendCliArgs {
    /// Action to request
    #[arg(value_enum)]
    pub action: ControlArg,
    /// Screen to show after a stop
    #[arg(long, value_enum)]
    pub route: Option<RouteArg>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlArg {
    Pause,
    Resume,
    Stop,
}

impl From<ControlArg> for ControlAction {
    fn from(arg: ControlArg) -> Self {
        match arg {
            ControlArg::Pause => ControlAction::Pause,
            ControlArg::Resume => ControlAction::Resume,
            ControlArg::Stop => ControlAction::Stop,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteArg {
    ShowSaveConfirmation,
    ShowRecordings,
}

impl From<RouteArg> for RouteAction {
    fn from(arg: RouteArg) -> Self {
        match arg {
            RouteArg::ShowSaveConfirmation => RouteAction::ShowSaveConfirmation,
            RouteArg::ShowRecordings => RouteAction::ShowRecordings,
        }
    }
}

impl SendCliArgs {
    /// The mailbox entry these arguments describe.
    pub fn to_entry(&self) -> ControlMailboxEntry {
        let entry = ControlMailboxEntry::new(self.action.into());
        match self.route {
            Some(route) => entry.with_route(route.into()),
            None => entry,
        }
    }
}

/// Post a control request for the running recorder.
pub async fn handle_send_command(args: SendCliArgs, files: &RecordingFileStore) -> AppResult<()> {
    files.ensure_layout()?;

    let entry = args.to_entry();
    if entry.route_action.is_some() && entry.control_action != ControlAction::Stop {
        eprintln!("Note: --route is only honoured with stop");
    }

    FileMailbox::for_store(files).post(entry).await?;
    info!(action = %entry.control_action, "Control request sent");
    println!("Sent {}", entry.control_action);

    Ok(())
}

/// Print the owner's pending uploads.
pub async fn handle_pending_command(files: &RecordingFileStore, owner_id: &str) -> AppResult<()> {
    let queue = PendingUploadQueue::new(files.manifest_path());
    let entries = queue.load(owner_id).await;

    if entries.is_empty() {
        println!("No recordings waiting for upload.");
        return Ok(());
    }

    println!("{} recording(s) waiting for upload:", entries.len());
    for entry in entries {
        let minutes = entry
            .duration_minutes
            .map(|m| format!("{:.1} min", m))
            .unwrap_or_else(|| "unknown length".to_string());
        let present = if files.exists(&entry.local_file_path) {
            ""
        } else {
            " [file missing]"
        };
        println!(
            "  {}  {}  {}  {:?}{}",
            entry.id, entry.title, minutes, entry.upload_trigger, present
        );
    }

    Ok(())
}
