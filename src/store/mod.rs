//! Per-identity persistence: one JSON document per user holding the
//! quota counter and the bounded session list.
//!
//! File layout (`<dir>/<identity-token>.json`):
//!
//! ```json
//! {
//!   "global_tool_usage": 3,
//!   "last_reset_time": "2025-03-01T12:00:00.000000Z",
//!   "sessions": [
//!     { "session_id": "…", "title": "…",
//!       "messages": [ { "role": "user", "content": "…" },
//!                     { "role": "assistant", "content": "…",
//!                       "image_base64": "…", "timestamp": "…" } ] }
//!   ]
//! }
//! ```
//!
//! Reads never fail: anything missing or unreadable degrades to a
//! fresh record.  Writes go to a temp file in the same directory and
//! are renamed over the target, so readers never see a torn file.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::fs;
use tracing::{debug, warn};

use crate::identity::Identity;
use crate::quota::UsageRecord;
use crate::session::{InlineImage, Message, Role, Session, DEFAULT_TITLE};

// ── Domain record ────────────────────────────────────────────

/// Everything persisted for one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub usage: UsageRecord,
    /// Oldest first.
    pub sessions: Vec<Session>,
}

impl UserRecord {
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            usage: UsageRecord::fresh(now),
            sessions: Vec::new(),
        }
    }
}

// ── On-disk shape ────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    global_tool_usage: u32,
    last_reset_time: String,
    sessions: Vec<StoredSession>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    session_id: String,
    #[serde(default = "default_title")]
    title: String,
    #[serde(default)]
    messages: Vec<StoredMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredMessage {
    role: Role,
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

/// Serialise a timestamp the way every record field is written.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an ISO-8601 timestamp.  Accepts RFC 3339 (any offset) and
/// offset-less forms, which are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

impl StoredRecord {
    fn into_record(self, now: DateTime<Utc>) -> UserRecord {
        let window_start = parse_timestamp(&self.last_reset_time).unwrap_or_else(|| {
            debug!(raw = %self.last_reset_time, "malformed last_reset_time, using now");
            now
        });
        let sessions = self
            .sessions
            .into_iter()
            .map(|s| {
                let messages = s
                    .messages
                    .into_iter()
                    .map(|m| Message {
                        role: m.role,
                        content: m.content,
                        inline_image: m.image_base64.map(|base64| InlineImage {
                            base64,
                            timestamp: m
                                .timestamp
                                .as_deref()
                                .and_then(parse_timestamp)
                                .unwrap_or(now),
                        }),
                    })
                    .collect();
                Session::restore(s.session_id, s.title, messages)
            })
            .collect();
        UserRecord {
            usage: UsageRecord {
                count: self.global_tool_usage,
                window_start,
            },
            sessions,
        }
    }

    fn from_record(record: &UserRecord, max_sessions: usize) -> Self {
        let skip = record.sessions.len().saturating_sub(max_sessions);
        let sessions = record.sessions[skip..]
            .iter()
            .map(|s| StoredSession {
                session_id: s.id.clone(),
                title: s.title.clone(),
                messages: s
                    .messages()
                    .iter()
                    .map(|m| StoredMessage {
                        role: m.role,
                        content: m.content.clone(),
                        image_base64: m.inline_image.as_ref().map(|i| i.base64.clone()),
                        timestamp: m.inline_image.as_ref().map(|i| format_timestamp(i.timestamp)),
                    })
                    .collect(),
            })
            .collect();
        Self {
            global_tool_usage: record.usage.count,
            last_reset_time: format_timestamp(record.usage.window_start),
            sessions,
        }
    }
}

// ── UserStore ────────────────────────────────────────────────

/// Directory of per-identity JSON records.
#[derive(Debug, Clone)]
pub struct UserStore {
    dir: PathBuf,
    max_sessions: usize,
}

impl UserStore {
    pub fn new(dir: impl Into<PathBuf>, max_sessions: usize) -> Self {
        Self {
            dir: dir.into(),
            max_sessions,
        }
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    /// Path of the record file for `identity`.
    pub fn path_for(&self, identity: &Identity) -> PathBuf {
        self.dir.join(format!("{}.json", identity.token()))
    }

    /// Load the record for `identity`, or a fresh one opening at `now`
    /// when there is nothing usable on disk.
    pub async fn load(&self, identity: &Identity, now: DateTime<Utc>) -> UserRecord {
        let path = self.path_for(identity);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(user = %identity, "no stored record, starting fresh");
                return UserRecord::fresh(now);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read user record, starting fresh");
                return UserRecord::fresh(now);
            }
        };
        match serde_json::from_str::<StoredRecord>(&raw) {
            Ok(stored) => {
                let record = stored.into_record(now);
                debug!(
                    user = %identity,
                    count = record.usage.count,
                    sessions = record.sessions.len(),
                    "user record loaded"
                );
                record
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unparsable user record, starting fresh");
                UserRecord::fresh(now)
            }
        }
    }

    /// Write `record` for `identity`, keeping only the newest
    /// `max_sessions` sessions.  Top-level keys already on disk that
    /// this crate does not manage are carried over.
    pub async fn save(&self, identity: &Identity, record: &UserRecord) -> anyhow::Result<()> {
        let result = self.write_record(identity, record).await;
        if let Err(ref e) = result {
            warn!(user = %identity, error = %e, "failed to save user record");
        }
        result
    }

    async fn write_record(&self, identity: &Identity, record: &UserRecord) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("create user dir {}", self.dir.display()))?;

        let path = self.path_for(identity);
        let mut doc = self.existing_document(&path).await;
        let stored = StoredRecord::from_record(record, self.max_sessions);
        let Value::Object(fields) =
            serde_json::to_value(&stored).context("serialize user record")?
        else {
            anyhow::bail!("user record did not serialize to an object");
        };
        doc.extend(fields);

        let json = serde_json::to_string_pretty(&Value::Object(doc))
            .context("serialize user record")?;
        let tmp = self.dir.join(format!(
            ".{}.{}.tmp",
            identity.token(),
            uuid::Uuid::new_v4().simple()
        ));
        fs::write(&tmp, json.as_bytes())
            .await
            .with_context(|| format!("write {}", tmp.display()))?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e).with_context(|| format!("rename into {}", path.display()));
        }

        debug!(path = %path.display(), count = record.usage.count, "user record saved");
        Ok(())
    }

    /// The JSON object currently on disk, or an empty one.
    async fn existing_document(&self, path: &Path) -> Map<String, Value> {
        let Ok(raw) = fs::read_to_string(path).await else {
            return Map::new();
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Delete the record for `identity`.  A missing record is not an
    /// error.
    pub async fn erase(&self, identity: &Identity) -> anyhow::Result<()> {
        let path = self.path_for(identity);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(user = %identity, "user record erased");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────
