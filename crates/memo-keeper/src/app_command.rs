use std::str::FromStr;

/// Commands sent from the console handler to the main application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Start a new recording session.
    Start,
    /// Pause the active recording.
    Pause,
    /// Resume a paused recording.
    Resume,
    /// Stop and queue the recording for upload.
    Stop,
    /// Print the session status.
    Status,
    /// Request application shutdown.
    Shutdown,
}

impl FromStr for AppCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        match line.trim().to_ascii_lowercase().as_str() {
            "start" | "s" => Ok(AppCommand::Start),
            "pause" | "p" => Ok(AppCommand::Pause),
            "resume" | "r" => Ok(AppCommand::Resume),
            "stop" | "x" => Ok(AppCommand::Stop),
            "status" | "?" => Ok(AppCommand::Status),
            "quit" | "exit" | "q" => Ok(AppCommand::Shutdown),
            other => Err(format!(
                "Unknown command {:?} (start, pause, resume, stop, status, quit)",
                other
            )),
        }
    }
}
