//! Terminal front-end: sign-in, the chat REPL and the one-shot
//! subcommands.
//!
//! Everything here is presentation.  Turn semantics live in
//! [`crate::conversation`]; the functions that turn state into text
//! are pure so they can be tested without a terminal.

use std::sync::Arc;

use anyhow::Context;

use crate::agent::{AgentRuntime, ToolAgent};
use crate::config::Config;
use crate::conversation::{Conversation, TurnOutcome, TurnSettings};
use crate::identity::Identity;
use crate::models::openai_compat::OpenAICompatProvider;
use crate::quota::{self, Clock, QuotaStatus, SystemClock};
use crate::session::{Role, Session};
use crate::slash::{self, SlashCommand};
use crate::store::UserStore;
use crate::tools::{builtins, ToolRegistry};
use crate::utils::truncate_str;

// ── Assembly ─────────────────────────────────────────────────

/// Resolve who is chatting: `--user` when given, otherwise prompt.
pub fn resolve_identity(user: Option<String>) -> anyhow::Result<Identity> {
    if let Some(raw) = user {
        return Identity::parse(&raw).context("invalid --user");
    }
    let raw: String = dialoguer::Input::new()
        .with_prompt("Email")
        .validate_with(|input: &String| -> Result<(), String> {
            Identity::parse(input).map(|_| ()).map_err(|e| e.to_string())
        })
        .interact_text()
        .context("failed to read email")?;
    Identity::parse(&raw).context("invalid email")
}

pub fn user_store(cfg: &Config) -> UserStore {
    UserStore::new(cfg.data_dir(), cfg.sessions.max_per_user)
}

/// Build the tool-calling agent described by `cfg`.
pub fn build_agent(cfg: &Config) -> anyhow::Result<ToolAgent> {
    let api_key = cfg.model.resolved_api_key();
    if api_key.is_none() && !cfg.model.is_local() {
        anyhow::bail!(
            "no API key for {}: set model.api_key in the config or export HF_TOKEN",
            cfg.model.endpoint
        );
    }
    let provider = OpenAICompatProvider::new(
        cfg.model.endpoint.clone(),
        api_key.unwrap_or_default(),
        cfg.model.model.clone(),
    )?;

    let mut registry = ToolRegistry::new();
    builtins::register_all(&mut registry, &cfg.tool_settings())?;
    tracing::debug!(tools = ?registry.names(), model = %provider.model(), "agent assembled");

    let mut agent =
        ToolAgent::new(Box::new(provider), registry).with_max_steps(cfg.model.max_steps);
    if let Some(prompt) = &cfg.model.system_prompt {
        agent = agent.with_system_prompt(prompt.clone());
    }
    Ok(agent)
}

pub fn turn_settings(cfg: &Config) -> TurnSettings {
    TurnSettings {
        policy: cfg.quota_policy(),
        image_extensions: cfg.image_extensions(),
        scratch_dir: cfg.scratch_dir(),
    }
}

pub async fn build_conversation(
    cfg: &Config,
    identity: Identity,
) -> anyhow::Result<Conversation<ToolAgent>> {
    let agent = build_agent(cfg)?;
    Ok(Conversation::open(
        identity,
        user_store(cfg),
        agent,
        turn_settings(cfg),
        Arc::new(SystemClock),
    )
    .await)
}

// ── Rendering ────────────────────────────────────────────────

pub fn format_quota(status: &QuotaStatus) -> String {
    let mut line = format!(
        "Tool usage: {}/{} (resets in {} min)",
        status.used, status.limit, status.remaining_minutes
    );
    if status.exceeded {
        line.push_str(" - limit reached");
    }
    line
}

/// One line per session, newest first; `*` marks the active one.
pub fn format_sessions(sessions: &[Session], active: Option<&str>) -> String {
    if sessions.is_empty() {
        return "No saved sessions.".into();
    }
    sessions
        .iter()
        .rev()
        .map(|s| {
            let marker = if Some(s.id.as_str()) == active { '*' } else { ' ' };
            format!(
                "{marker} {}  {}  ({} messages)",
                s.id,
                s.title,
                s.messages().len()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Transcript of a session, as shown after `/switch`.
pub fn format_transcript(session: &Session) -> String {
    session
        .messages()
        .iter()
        .map(|m| {
            let who = match m.role {
                Role::User => "you",
                Role::Assistant => "concierge",
            };
            match &m.inline_image {
                Some(img) => format!(
                "{who}: {} [image, {} bytes base64]",
                m.content,
                img.base64.len()
            ),
                None => format!("{who}: {}", m.content),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lines to print for a finished turn.
pub fn render_outcome(outcome: &TurnOutcome) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(warning) = &outcome.warning {
        lines.push(format!("warning: {warning}"));
    }
    if outcome.quota_reset {
        lines.push("Tool quota window reset.".into());
    }
    if let Some(error) = &outcome.error {
        lines.push(error.clone());
    }
    if let Some(reply) = &outcome.reply {
        lines.push(reply.content.clone());
        if let Some(img) = &reply.inline_image {
            lines.push(format!(
                "[generated image saved in session, {} bytes base64]",
                img.base64.len()
            ));
        }
    }
    lines
}

// ── Commands ─────────────────────────────────────────────────

/// Result of a chat slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub text: String,
    pub quit: bool,
}

impl CommandReply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quit: false,
        }
    }
}

/// Apply `cmd` to `conv`.  `/reset` must already be confirmed by the
/// caller.
pub async fn apply_command<A: AgentRuntime>(
    conv: &mut Conversation<A>,
    cmd: SlashCommand,
) -> CommandReply {
    match cmd {
        SlashCommand::New => {
            let id = conv.new_chat().await.id.clone();
            CommandReply::text(format!("Started new chat {id}."))
        }
        SlashCommand::Sessions => CommandReply::text(format_sessions(
            conv.sessions(),
            Some(conv.active_session().id.as_str()),
        )),
        SlashCommand::Switch(id) => {
            if conv.switch_session(&id).await {
                let session = conv.active_session();
                let mut text = format!("Switched to \"{}\".", session.title);
                let transcript = format_transcript(session);
                if !transcript.is_empty() {
                    text.push('\n');
                    text.push_str(&transcript);
                }
                CommandReply::text(text)
            } else {
                CommandReply::text(format!("No session with id {id}."))
            }
        }
        SlashCommand::Quota => CommandReply::text(format_quota(&conv.quota_status())),
        SlashCommand::Reset => match conv.reset_all().await {
            Ok(()) => CommandReply::text("All sessions and usage data deleted."),
            Err(e) => CommandReply::text(format!("Reset failed: {e:#}")),
        },
        SlashCommand::Help => CommandReply::text(slash::help_text()),
        SlashCommand::Quit => CommandReply {
            text: "Goodbye.".into(),
            quit: true,
        },
    }
}

fn confirm(prompt: &str) -> bool {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .unwrap_or(false)
}

/// Interactive chat loop.
pub async fn run_chat(cfg: &Config, identity: Identity) -> anyhow::Result<()> {
    let mut conv = build_conversation(cfg, identity).await?;
    println!("Signed in as {}. Type /help for commands.", conv.identity());
    println!("{}", format_quota(&conv.quota_status()));

    loop {
        let input: String = match dialoguer::Input::new()
            .with_prompt("you")
            .allow_empty(true)
            .interact_text()
        {
            Ok(line) => line,
            // EOF / closed terminal
            Err(_) => break,
        };
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(parsed) = slash::parse(input) {
            let cmd = match parsed {
                Ok(cmd) => cmd,
                Err(e) => {
                    println!("{e}");
                    continue;
                }
            };
            let wipe_prompt = "Delete all your sessions and usage data?";
            if cmd == SlashCommand::Reset && !confirm(wipe_prompt) {
                println!("Reset cancelled.");
                continue;
            }
            let reply = apply_command(&mut conv, cmd).await;
            println!("{}", reply.text);
            if reply.quit {
                break;
            }
            continue;
        }

        let outcome = conv.send(input).await;
        for line in render_outcome(&outcome) {
            println!("{line}");
        }
        if outcome.title_changed {
            println!("(session: {})", conv.active_session().title);
        }
    }
    Ok(())
}

/// Send a single message and print the reply.
pub async fn ask(cfg: &Config, identity: Identity, prompt: &str) -> anyhow::Result<()> {
    let mut conv = build_conversation(cfg, identity).await?;
    let outcome = conv.send(prompt).await;
    for line in render_outcome(&outcome) {
        println!("{line}");
    }
    if let Some(error) = outcome.error {
        anyhow::bail!("turn failed: {}", truncate_str(&error, 200));
    }
    Ok(())
}

pub async fn show_status(cfg: &Config, identity: &Identity) -> anyhow::Result<()> {
    let now = SystemClock.now();
    let record = user_store(cfg).load(identity, now).await;
    let policy = cfg.quota_policy();
    let usage = quota::check_and_maybe_reset(record.usage, now, policy.reset_interval);
    println!("User: {identity}");
    println!("{}", format_quota(&QuotaStatus::of(&usage, &policy, now)));
    println!("Sessions: {}/{}", record.sessions.len(), cfg.sessions.max_per_user);
    Ok(())
}

pub async fn list_sessions(cfg: &Config, identity: &Identity) -> anyhow::Result<()> {
    let record = user_store(cfg).load(identity, SystemClock.now()).await;
    println!("{}", format_sessions(&record.sessions, None));
    Ok(())
}

pub async fn reset_user(cfg: &Config, identity: &Identity, yes: bool) -> anyhow::Result<()> {
    if !yes && !confirm(&format!("Delete all sessions and usage data for {identity}?")) {
        println!("Reset cancelled.");
        return Ok(());
    }
    user_store(cfg).erase(identity).await?;
    println!("Deleted all data for {identity}.");
    Ok(())
}
