//! Slash commands typed into the chat prompt.
//!
//! Input starting with `/` is parsed into a [`SlashCommand`] instead
//! of being sent to the agent.  [`commands`] lists the command set for
//! `/help`.

use thiserror::Error;

// ── Types ────────────────────────────────────────────────────

/// Metadata describing a slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
}

/// A parsed slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    /// Start a new chat session.
    New,
    /// List stored sessions.
    Sessions,
    /// Make a stored session active.
    Switch(String),
    /// Show tool-usage quota.
    Quota,
    /// Delete all sessions and usage for this user.
    Reset,
    Help,
    Quit,
}

/// Errors while parsing a slash command.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlashError {
    #[error("unknown command: /{0} (try /help)")]
    UnknownCommand(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

const COMMANDS: &[Command] = &[
    Command {
        name: "new",
        description: "Start a new chat session",
        usage: "/new",
    },
    Command {
        name: "sessions",
        description: "List your saved sessions",
        usage: "/sessions",
    },
    Command {
        name: "switch",
        description: "Continue a saved session",
        usage: "/switch <session-id>",
    },
    Command {
        name: "quota",
        description: "Show tool usage for the current window",
        usage: "/quota",
    },
    Command {
        name: "reset",
        description: "Delete all your sessions and usage data",
        usage: "/reset",
    },
    Command {
        name: "help",
        description: "Show this help",
        usage: "/help",
    },
    Command {
        name: "quit",
        description: "Leave the chat",
        usage: "/quit",
    },
];

pub fn commands() -> &'static [Command] {
    COMMANDS
}

// ── Parsing ──────────────────────────────────────────────────

/// Parse `input` as a slash command.
///
/// Returns `None` when the input is not a command (does not start with
/// `/`), so it should go to the agent.
pub fn parse(input: &str) -> Option<Result<SlashCommand, SlashError>> {
    let rest = input.trim().strip_prefix('/')?;
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    let parsed = match name.to_ascii_lowercase().as_str() {
        "new" => Ok(SlashCommand::New),
        "sessions" | "list" => Ok(SlashCommand::Sessions),
        "switch" => match args.split_whitespace().next() {
            Some(id) => Ok(SlashCommand::Switch(id.to_string())),
            None => Err(SlashError::Usage("/switch <session-id>")),
        },
        "quota" | "status" => Ok(SlashCommand::Quota),
        "reset" => Ok(SlashCommand::Reset),
        "help" | "?" => Ok(SlashCommand::Help),
        "quit" | "exit" | "q" => Ok(SlashCommand::Quit),
        _ => Err(SlashError::UnknownCommand(name.to_string())),
    };
    Some(parsed)
}

/// Multi-line help text.
pub fn help_text() -> String {
    let width = COMMANDS.iter().map(|c| c.usage.len()).max().unwrap_or(0);
    let mut out = String::from("Available commands:\n");
    for c in COMMANDS {
        out.push_str(&format!("  {:<width$}  {}\n", c.usage, c.description));
    }
    out
}
