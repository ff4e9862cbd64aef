//! Integration tests for per-user persistence: the on-disk record
//! format, truncation, tolerance of bad files, and erase.

use chrono::{DateTime, Duration, TimeZone, Utc};
use concierge::identity::Identity;
use concierge::quota::UsageRecord;
use concierge::session::{self, InlineImage, Message, Session};
use concierge::store::{UserRecord, UserStore};
use serde_json::{json, Value};
use tempfile::TempDir;

fn tmp() -> TempDir {
    TempDir::new().unwrap()
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 14, 18, 30, 0).unwrap()
}

fn alfred() -> Identity {
    Identity::parse("alfred.pennyworth@wayne.com").unwrap()
}

fn read_json(store: &UserStore, id: &Identity) -> Value {
    let raw = std::fs::read_to_string(store.path_for(id)).unwrap();
    serde_json::from_str(&raw).unwrap()
}

// ── load ─────────────────────────────────────────────────────

#[tokio::test]
async fn missing_record_is_fresh() {
    let dir = tmp();
    let store = UserStore::new(dir.path(), 5);
    let record = store.load(&alfred(), t0()).await;
    assert_eq!(record, UserRecord::fresh(t0()));
}

#[tokio::test]
async fn corrupt_record_is_fresh() {
    let dir = tmp();
    let store = UserStore::new(dir.path(), 5);
    std::fs::write(store.path_for(&alfred()), "{ not json").unwrap();
    assert_eq!(store.load(&alfred(), t0()).await, UserRecord::fresh(t0()));

    // Valid JSON missing required fields degrades the same way.
    std::fs::write(store.path_for(&alfred()), r#"{"sessions": []}"#).unwrap();
    assert_eq!(store.load(&alfred(), t0()).await, UserRecord::fresh(t0()));
}

#[tokio::test]
async fn reads_hand_written_record() {
    let dir = tmp();
    let store = UserStore::new(dir.path(), 5);
    let doc = json!({
        "global_tool_usage": 4,
        "last_reset_time": "2025-02-14T18:00:00",
        "sessions": [{
            "session_id": "20250214180000000000",
            "title": "Gala menu",
            "messages": [
                {"role": "user", "content": "Gala menu"},
                {"role": "assistant", "content": "3-course dinner with wine selection."}
            ]
        }]
    });
    std::fs::write(store.path_for(&alfred()), doc.to_string()).unwrap();

    let record = store.load(&alfred(), t0()).await;
    assert_eq!(record.usage.count, 4);
    assert_eq!(record.usage.window_start, t0() - Duration::minutes(30));
    assert_eq!(record.sessions[0].title, "Gala menu");
    assert_eq!(record.sessions[0].messages().len(), 2);
}

// ── save ─────────────────────────────────────────────────────

#[tokio::test]
async fn save_writes_documented_shape() {
    let dir = tmp();
    let store = UserStore::new(dir.path().join("users"), 5);
    let mut s = Session::restore("20250214183000000000", session::DEFAULT_TITLE, vec![]);
    s.append(Message::user("Draw a cake"));
    s.append(Message::assistant_image(
        "/tmp/cake.png",
        InlineImage {
            base64: "aGk=".into(),
            timestamp: t0(),
        },
    ));
    let record = UserRecord {
        usage: UsageRecord {
            count: 2,
            window_start: t0(),
        },
        sessions: vec![s],
    };
    store.save(&alfred(), &record).await.unwrap();

    let doc = read_json(&store, &alfred());
    assert_eq!(doc["global_tool_usage"], 2);
    assert_eq!(doc["last_reset_time"], "2025-02-14T18:30:00.000000Z");
    let session = &doc["sessions"][0];
    assert_eq!(session["session_id"], "20250214183000000000");
    assert_eq!(session["title"], "Draw a cake");
    assert_eq!(session["messages"][0], json!({"role": "user", "content": "Draw a cake"}));
    assert_eq!(session["messages"][1]["image_base64"], "aGk=");

    // And it reads back identically.
    assert_eq!(store.load(&alfred(), t0()).await, record);
}

#[tokio::test]
async fn save_keeps_only_newest_sessions() {
    let dir = tmp();
    let store = UserStore::new(dir.path(), 3);
    let sessions: Vec<Session> = (1..=5)
        .map(|i| Session::restore(i.to_string(), format!("s{i}"), vec![]))
        .collect();
    let record = UserRecord {
        usage: UsageRecord::fresh(t0()),
        sessions,
    };
    store.save(&alfred(), &record).await.unwrap();

    let loaded = store.load(&alfred(), t0()).await;
    let ids: Vec<&str> = loaded.sessions.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["3", "4", "5"]);
}

#[tokio::test]
async fn save_preserves_foreign_keys() {
    let dir = tmp();
    let store = UserStore::new(dir.path(), 5);
    std::fs::write(
        store.path_for(&alfred()),
        json!({
            "global_tool_usage": 9,
            "last_reset_time": "2025-02-14T17:00:00Z",
            "sessions": [],
            "preferences": {"theme": "dark"}
        })
        .to_string(),
    )
    .unwrap();

    store
        .save(&alfred(), &UserRecord::fresh(t0()))
        .await
        .unwrap();

    let doc = read_json(&store, &alfred());
    assert_eq!(doc["global_tool_usage"], 0);
    assert_eq!(doc["preferences"], json!({"theme": "dark"}));
}

#[tokio::test]
async fn save_leaves_no_temp_files() {
    let dir = tmp();
    let store = UserStore::new(dir.path(), 5);
    for _ in 0..3 {
        store
            .save(&alfred(), &UserRecord::fresh(t0()))
            .await
            .unwrap();
    }
    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, ["alfred.pennyworth_at_wayne.com.json"]);
}

#[tokio::test]
async fn identities_are_isolated() {
    let dir = tmp();
    let store = UserStore::new(dir.path(), 5);
    let bruce = Identity::parse("bruce@wayne.com").unwrap();
    let mut record = UserRecord::fresh(t0());
    record.usage.count = 7;
    store.save(&bruce, &record).await.unwrap();

    assert_eq!(store.load(&bruce, t0()).await.usage.count, 7);
    assert_eq!(store.load(&alfred(), t0()).await.usage.count, 0);
}

// ── erase ────────────────────────────────────────────────────

#[tokio::test]
async fn erase_removes_record_and_is_idempotent() {
    let dir = tmp();
    let store = UserStore::new(dir.path(), 5);
    store
        .save(&alfred(), &UserRecord::fresh(t0()))
        .await
        .unwrap();
    assert!(store.path_for(&alfred()).exists());

    store.erase(&alfred()).await.unwrap();
    assert!(!store.path_for(&alfred()).exists());
    store.erase(&alfred()).await.unwrap();
}
