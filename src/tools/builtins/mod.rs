//! Built-in tool implementations.
//!
//! Each sub-module implements one (or a small family of) tool(s) the
//! agent can invoke.  HTTP-backed tools take their base URL from
//! [`ToolSettings`] so they can be pointed at a mock server.

pub mod final_answer;
pub mod hub_stats;
pub mod image_gen;
pub mod party;
pub mod time;
pub mod weather;
pub mod web_search;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use reqwest::Client;

use super::ToolRegistry;

pub const OPENWEATHERMAP_BASE_URL: &str = "https://api.openweathermap.org";
pub const HF_HUB_BASE_URL: &str = "https://huggingface.co";
pub const HF_INFERENCE_BASE_URL: &str = "https://router.huggingface.co/hf-inference";
pub const DUCKDUCKGO_BASE_URL: &str = "https://api.duckduckgo.com";
pub const DEFAULT_IMAGE_MODEL: &str = "black-forest-labs/FLUX.1-schnell";

/// Resolved settings for the built-in tools.
#[derive(Debug, Clone)]
pub struct ToolSettings {
    pub openweathermap_api_key: Option<String>,
    pub hf_token: Option<String>,
    pub image_model: String,
    pub weather_base_url: String,
    pub hub_base_url: String,
    pub search_base_url: String,
    pub inference_base_url: String,
    /// Where generated images are written before being absorbed.
    pub scratch_dir: PathBuf,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            openweathermap_api_key: None,
            hf_token: None,
            image_model: DEFAULT_IMAGE_MODEL.into(),
            weather_base_url: OPENWEATHERMAP_BASE_URL.into(),
            hub_base_url: HF_HUB_BASE_URL.into(),
            search_base_url: DUCKDUCKGO_BASE_URL.into(),
            inference_base_url: HF_INFERENCE_BASE_URL.into(),
            scratch_dir: std::env::temp_dir(),
        }
    }
}

/// Shared HTTP client for tool calls.
pub fn http_client() -> anyhow::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!("concierge/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")
}

/// Register every built-in tool into `registry`.
pub fn register_all(registry: &mut ToolRegistry, settings: &ToolSettings) -> anyhow::Result<()> {
    let client = http_client()?;
    final_answer::register(registry);
    time::register(registry);
    party::register(registry);
    weather::register(registry, client.clone(), settings);
    hub_stats::register(registry, client.clone(), settings);
    web_search::register(registry, client.clone(), settings);
    image_gen::register(registry, client, settings);
    tracing::debug!(tools = registry.len(), "built-in tools registered");
    Ok(())
}
