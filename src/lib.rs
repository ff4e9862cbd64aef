//! concierge: a tool-using chat agent with per-user quotas and
//! bounded session history.
//!
//! This library crate re-exports modules so integration tests
//! (under `tests/`) can access them.

pub mod agent;
pub mod artifact;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod identity;
pub mod models;
pub mod quota;
pub mod session;
pub mod slash;
pub mod store;
pub mod tools;
pub mod trace;
pub mod utils;

/// Return the concierge home directory.
///
/// Resolution order:
/// 1. `CONCIERGE_HOME` environment variable
/// 2. `$HOME/.concierge`
pub fn concierge_home() -> std::path::PathBuf {
    if let Ok(p) = std::env::var("CONCIERGE_HOME") {
        std::path::PathBuf::from(p)
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| std::path::PathBuf::from("."))
            .join(".concierge")
    }
}
