//! Conversation orchestrator.
//!
//! One [`Conversation`] per signed-in identity.  Each call to
//! [`Conversation::send`] runs a full turn:
//!
//! ```text
//! Idle → QuotaChecked → Delegated → Classified → Persisted → Idle
//! ```
//!
//! * **QuotaChecked**: an expired window is reset (and the agent's
//!   trace wiped); an exhausted quota yields a warning but the turn
//!   still proceeds.
//! * **Delegated**: the user message is recorded, then the agent runs.
//!   This is the only suspension point of a turn.
//! * **Classified**: the trace decides whether a tool was used; a
//!   reply naming an image in the scratch dir is absorbed inline.
//! * **Persisted**: the reply is appended, the quota counted when a
//!   tool ran, and the whole record written.
//!
//! An agent failure is reported on the [`TurnOutcome`] and the turn
//! ends with only the user message recorded and no quota charged.
//! Either way, scratch images the run produced but the reply did not
//! claim are deleted before the turn returns.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::agent::AgentRuntime;
use crate::artifact;
use crate::identity::Identity;
use crate::quota::{self, Clock, QuotaPolicy, QuotaStatus, UsageRecord};
use crate::session::{self, InlineImage, Message, Session};
use crate::store::{UserRecord, UserStore};
use crate::trace::was_tool_used_in;

/// Content of an assistant message carrying a generated image.
pub const IMAGE_CAPTION: &str = "Here is the generated image:";

/// Where the current turn is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    QuotaChecked,
    Delegated,
    Classified,
    Persisted,
}

/// What a turn produced, for the caller to render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnOutcome {
    /// The assistant message appended to the session.
    pub reply: Option<Message>,
    /// Degraded-mode notice (quota exhausted).
    pub warning: Option<String>,
    /// Agent failure shown to the user.
    pub error: Option<String>,
    pub tool_used: bool,
    /// The quota window expired and was reset before this turn.
    pub quota_reset: bool,
    /// This turn named the session.
    pub title_changed: bool,
    /// Session list or quota display is stale.
    pub refresh: bool,
}

/// Behaviour knobs for a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnSettings {
    pub policy: QuotaPolicy,
    /// Extensions recognised as inline images.
    pub image_extensions: Vec<String>,
    /// Directory the image tool writes to.  Only files in here are
    /// absorbed or released.
    pub scratch_dir: PathBuf,
}

/// Chat state of one identity, threaded explicitly through every turn.
pub struct Conversation<A: AgentRuntime> {
    identity: Identity,
    store: UserStore,
    agent: A,
    clock: Arc<dyn Clock>,
    settings: TurnSettings,
    usage: UsageRecord,
    /// Stored sessions, oldest first.
    sessions: Vec<Session>,
    /// The session turns go to.  Stored once it has a message.
    active: Session,
    state: TurnState,
}

impl<A: AgentRuntime> Conversation<A> {
    /// Load `identity`'s record and open a fresh session.
    pub async fn open(
        identity: Identity,
        store: UserStore,
        agent: A,
        settings: TurnSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let UserRecord { usage, sessions } = store.load(&identity, clock.now()).await;
        info!(
            user = %identity,
            used = usage.count,
            sessions = sessions.len(),
            "conversation opened"
        );
        Self {
            identity,
            store,
            agent,
            clock,
            settings,
            usage,
            sessions,
            active: Session::new(),
            state: TurnState::Idle,
        }
    }

    // ── Accessors ──────────────────────────────────────────────

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn usage(&self) -> UsageRecord {
        self.usage
    }

    /// Stored sessions, oldest first.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn active_session(&self) -> &Session {
        &self.active
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn store(&self) -> &UserStore {
        &self.store
    }

    /// Quota as it stands now; an expired window reads as reset.
    pub fn quota_status(&self) -> QuotaStatus {
        let now = self.clock.now();
        let policy = &self.settings.policy;
        let usage = quota::check_and_maybe_reset(self.usage, now, policy.reset_interval);
        QuotaStatus::of(&usage, policy, now)
    }

    // ── Turn ───────────────────────────────────────────────────

    /// Run one turn for `text`.  Never fails: agent and storage
    /// problems are reported on the outcome or logged.
    pub async fn send(&mut self, text: &str) -> TurnOutcome {
        let mut outcome = TurnOutcome::default();
        let now = self.clock.now();

        // QuotaChecked
        let policy = self.settings.policy;
        if quota::is_expired(&self.usage, now, policy.reset_interval) {
            self.usage = quota::check_and_maybe_reset(self.usage, now, policy.reset_interval);
            self.agent.reset();
            outcome.quota_reset = true;
            info!(user = %self.identity, "tool quota window expired, counter reset");
        }
        if quota::is_exceeded(&self.usage, policy.limit) {
            let minutes = quota::remaining_minutes(&self.usage, now, policy.reset_interval);
            outcome.warning = Some(format!(
                "Tool usage limit reached ({}/{}). Resets in {minutes} minutes.",
                self.usage.count, policy.limit
            ));
            warn!(user = %self.identity, used = self.usage.count, "tool quota exceeded");
        }
        self.enter(TurnState::QuotaChecked);

        // Delegated
        outcome.title_changed = self.active.append(Message::user(text));
        self.store_active();
        self.enter(TurnState::Delegated);
        let reply = match self.agent.run(text).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(user = %self.identity, error = %e, "agent run failed");
                outcome.error = Some(format!("Error: {e:#}"));
                self.release_unclaimed().await;
                self.persist().await;
                outcome.refresh = outcome.quota_reset || outcome.title_changed;
                self.enter(TurnState::Idle);
                return outcome;
            }
        };

        // Classified
        outcome.tool_used = was_tool_used_in(self.agent.trace());
        let message = self.classify(reply).await;
        self.release_unclaimed().await;
        self.enter(TurnState::Classified);

        // Persisted
        self.active.append(message.clone());
        self.store_active();
        if outcome.tool_used {
            self.usage = quota::increment(self.usage);
        }
        self.persist().await;
        self.enter(TurnState::Persisted);

        debug!(
            user = %self.identity,
            tool_used = outcome.tool_used,
            used = self.usage.count,
            "turn complete"
        );
        outcome.reply = Some(message);
        outcome.refresh = outcome.tool_used || outcome.quota_reset || outcome.title_changed;
        self.enter(TurnState::Idle);
        outcome
    }

    /// Turn an agent reply into the assistant message, absorbing an
    /// image the reply points at.
    async fn classify(&self, reply: String) -> Message {
        let settings = &self.settings;
        let Some(path) =
            artifact::recognize(&reply, &settings.image_extensions, &settings.scratch_dir).await
        else {
            return Message::assistant(reply);
        };
        match artifact::absorb(&path).await {
            Ok(absorbed) => Message::assistant_image(
                IMAGE_CAPTION,
                InlineImage {
                    base64: absorbed.encoded,
                    timestamp: self.clock.now(),
                },
            ),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not absorb image, keeping text reply");
                Message::assistant(reply)
            }
        }
    }

    /// Delete scratch images from this run that the reply did not claim.
    async fn release_unclaimed(&self) {
        let Ok(trace) = self.agent.trace() else {
            return;
        };
        let settings = &self.settings;
        let released =
            artifact::release_unclaimed(&trace, &settings.image_extensions, &settings.scratch_dir)
                .await;
        if released > 0 {
            debug!(user = %self.identity, released, "unclaimed images deleted");
        }
    }

    fn enter(&mut self, state: TurnState) {
        debug!(from = ?self.state, to = ?state, "turn state");
        self.state = state;
    }

    fn store_active(&mut self) {
        session::upsert_session(
            &mut self.sessions,
            self.active.clone(),
            self.store.max_sessions(),
        );
    }

    /// Write the whole record.  Failures are logged by the store and
    /// memory stays authoritative; the next save retries.
    async fn persist(&self) {
        let record = UserRecord {
            usage: self.usage,
            sessions: self.sessions.clone(),
        };
        let _ = self.store.save(&self.identity, &record).await;
    }

    // ── Session management ─────────────────────────────────────

    /// Start a new, empty session and write the record back.  The
    /// previous session is already stored if it had any messages.
    pub async fn new_chat(&mut self) -> &Session {
        self.active = Session::new();
        self.agent.reset();
        debug!(user = %self.identity, session = %self.active.id, "new chat started");
        self.persist().await;
        &self.active
    }

    /// Make the stored session `id` active and write the record back.
    /// An unknown id leaves everything unchanged and returns `false`.
    pub async fn switch_session(&mut self, id: &str) -> bool {
        if self.active.id == id {
            self.persist().await;
            return true;
        }
        match session::switch_to(&self.sessions, id) {
            Ok(found) => {
                self.active = found.clone();
                self.agent.reset();
                debug!(user = %self.identity, session = %id, "switched session");
                self.persist().await;
                true
            }
            Err(e) => {
                debug!(user = %self.identity, error = %e, "switch ignored");
                false
            }
        }
    }

    /// Wipe quota and sessions and delete the stored record.
    pub async fn reset_all(&mut self) -> anyhow::Result<()> {
        self.usage = UsageRecord::fresh(self.clock.now());
        self.sessions.clear();
        self.active = Session::new();
        self.agent.reset();
        self.state = TurnState::Idle;
        info!(user = %self.identity, "user data reset");
        self.store.erase(&self.identity).await
    }
}
