//! Integration tests: chat slash commands applied to a live
//! conversation.

use std::sync::Arc;

use async_trait::async_trait;
use concierge::agent::AgentRuntime;
use concierge::cli::apply_command;
use concierge::conversation::{Conversation, TurnSettings};
use concierge::identity::Identity;
use concierge::quota::{QuotaPolicy, SystemClock};
use concierge::slash::{self, SlashCommand};
use concierge::store::UserStore;
use concierge::trace::TraceStep;
use tempfile::TempDir;

/// Answers every prompt by echoing it, using a tool when the prompt
/// mentions the weather.
#[derive(Default)]
struct EchoAgent {
    last: Vec<TraceStep>,
}

#[async_trait]
impl AgentRuntime for EchoAgent {
    async fn run(&mut self, prompt: &str) -> anyhow::Result<String> {
        self.last.clear();
        if prompt.contains("weather") {
            self.last.push(TraceStep::action("weather_info", "sunny"));
        }
        let reply = format!("echo: {prompt}");
        self.last.push(TraceStep::final_answer(&reply));
        Ok(reply)
    }

    fn trace(&self) -> anyhow::Result<Vec<TraceStep>> {
        Ok(self.last.clone())
    }

    fn reset(&mut self) {
        self.last.clear();
    }
}

async fn open(dir: &TempDir) -> Conversation<EchoAgent> {
    Conversation::open(
        Identity::parse("selina@kyle.com").unwrap(),
        UserStore::new(dir.path(), 5),
        EchoAgent::default(),
        TurnSettings {
            policy: QuotaPolicy::new(10, 60),
            image_extensions: vec!["png".into()],
            scratch_dir: dir.path().join("scratch"),
        },
        Arc::new(SystemClock),
    )
    .await
}

async fn run(conv: &mut Conversation<EchoAgent>, line: &str) -> String {
    let cmd = slash::parse(line)
        .expect("is a command")
        .expect("parses");
    apply_command(conv, cmd).await.text
}

#[tokio::test]
async fn sessions_lists_newest_first() {
    let dir = TempDir::new().unwrap();
    let mut conv = open(&dir).await;

    conv.send("first chat").await;
    run(&mut conv, "/new").await;
    conv.send("second chat").await;

    let listing = run(&mut conv, "/sessions").await;
    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with('*'), "{listing}");
    assert!(lines[0].contains("second chat"));
    assert!(lines[1].contains("first chat"));
}

#[tokio::test]
async fn switch_shows_transcript_and_unknown_id_is_harmless() {
    let dir = TempDir::new().unwrap();
    let mut conv = open(&dir).await;

    conv.send("gala planning").await;
    let first_id = conv.active_session().id.clone();
    run(&mut conv, "/new").await;
    conv.send("another topic").await;

    let out = run(&mut conv, &format!("/switch {first_id}")).await;
    assert!(out.starts_with("Switched to \"gala planning\"."), "{out}");
    assert!(out.contains("concierge: echo: gala planning"));
    assert!(conv.store().path_for(conv.identity()).exists());
    assert_eq!(conv.active_session().id, first_id);

    let out = run(&mut conv, "/switch 19990101000000000000").await;
    assert_eq!(out, "No session with id 19990101000000000000.");
    assert_eq!(conv.active_session().id, first_id);
}

#[tokio::test]
async fn quota_reflects_tool_turns() {
    let dir = TempDir::new().unwrap();
    let mut conv = open(&dir).await;

    conv.send("what's the weather?").await;
    conv.send("thanks").await;

    let out = run(&mut conv, "/quota").await;
    assert!(out.starts_with("Tool usage: 1/10"), "{out}");
}

#[tokio::test]
async fn reset_erases_everything() {
    let dir = TempDir::new().unwrap();
    let mut conv = open(&dir).await;
    conv.send("weather please").await;
    let record_path = conv.store().path_for(conv.identity());
    assert!(record_path.exists());

    let out = run(&mut conv, "/reset").await;
    assert_eq!(out, "All sessions and usage data deleted.");
    assert!(!record_path.exists());
    assert_eq!(run(&mut conv, "/sessions").await, "No saved sessions.");
    assert!(run(&mut conv, "/quota").await.starts_with("Tool usage: 0/10"));
}

#[tokio::test]
async fn quit_and_help() {
    let dir = TempDir::new().unwrap();
    let mut conv = open(&dir).await;

    let quit = apply_command(&mut conv, SlashCommand::Quit).await;
    assert!(quit.quit);
    let help = apply_command(&mut conv, SlashCommand::Help).await;
    assert!(!help.quit);
    assert!(help.text.contains("/switch <session-id>"));
}
