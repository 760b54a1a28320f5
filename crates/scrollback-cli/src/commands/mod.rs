//! Slash commands for interactive mode

mod history;
mod status;

pub use history::HistoryCommand;
pub use status::StatusCommand;

use scrollback_core::ChatSnapshot;

/// Result of executing a slash command
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// Fetch older history
    LoadMore,
    /// Re-fetch the newest page
    Reload,
    /// Show a message to the user (not sent to the backend)
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command
pub fn execute_command(input: &str, snapshot: &ChatSnapshot) -> Option<CommandResult> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let parts: Vec<&str> = rest.splitn(2, ' ').collect();
    let command = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "more" | "m" => CommandResult::LoadMore,

        "reload" | "r" => CommandResult::Reload,

        "history" | "hist" => HistoryCommand::execute(args, snapshot),

        "status" | "s" => StatusCommand::execute(snapshot),

        "quit" | "exit" | "q" => CommandResult::Exit,

        _ => CommandResult::Unknown(command),
    })
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?          Show this help message
  /more, /m              Load older messages
  /reload, /r            Discard loaded history and fetch the newest page again
  /history [count]       Show the last messages held (default 20, "all" for everything)
  /status, /s            Show conversation and paging state
  /quit, /exit, /q       Exit scrollback

Anything else is sent as a question."#
        .to_string()
}
