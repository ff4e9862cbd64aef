use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::quota::{QuotaPolicy, MAX_RESET_INTERVAL_MINUTES};
use crate::tools::builtins::{
    ToolSettings, DEFAULT_IMAGE_MODEL, DUCKDUCKGO_BASE_URL, HF_HUB_BASE_URL,
    HF_INFERENCE_BASE_URL, OPENWEATHERMAP_BASE_URL,
};

/// Default chat-completions endpoint (Hugging Face's OpenAI-compatible router).
pub const DEFAULT_ENDPOINT: &str = "https://router.huggingface.co/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "Qwen/Qwen2.5-Coder-32B-Instruct";

/// Top-level configuration loaded from `config.yaml`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory holding one JSON record per user.  Relative paths
    /// resolve against the concierge home.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_data_dir() -> String {
    "users".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            quota: QuotaConfig::default(),
            sessions: SessionsConfig::default(),
            artifacts: ArtifactsConfig::default(),
            model: ModelConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

/// Global tool-usage limit.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct QuotaConfig {
    /// Tool-using turns allowed per window.
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Window length; the counter resets once it has elapsed.
    #[serde(default = "default_reset_interval")]
    pub reset_interval_minutes: u64,
}

fn default_limit() -> u32 {
    10
}

fn default_reset_interval() -> u64 {
    60
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            reset_interval_minutes: default_reset_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SessionsConfig {
    /// Sessions retained per user; the oldest are dropped first.
    #[serde(default = "default_max_per_user")]
    pub max_per_user: usize,
}

fn default_max_per_user() -> usize {
    5
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            max_per_user: default_max_per_user(),
        }
    }
}

/// Generated-file handling.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ArtifactsConfig {
    /// Extensions (without the dot) recognised as inline images.
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
    /// Where the image tool writes before the file is absorbed.
    /// Defaults to the OS temp dir.
    #[serde(default)]
    pub scratch_dir: Option<String>,
}

fn default_image_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg", "webp"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            image_extensions: default_image_extensions(),
            scratch_dir: None,
        }
    }
}

/// The chat model driving the agent.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// OpenAI-compatible chat completions URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// API key (plain text or env-var reference like `$HF_TOKEN`).
    /// Falls back to `HF_TOKEN` when absent.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Maximum model round-trips per turn.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Overrides the built-in system prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.into()
}

fn default_model() -> String {
    DEFAULT_MODEL.into()
}

fn default_max_steps() -> usize {
    crate::agent::DEFAULT_MAX_STEPS
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            max_steps: default_max_steps(),
            system_prompt: None,
        }
    }
}

impl ModelConfig {
    /// Resolved API key, or `None` when nothing is configured.
    pub fn resolved_api_key(&self) -> Option<String> {
        resolve_secret(self.api_key.as_deref(), "HF_TOKEN")
    }

    /// Whether the endpoint points at this machine (local servers
    /// usually need no key).
    pub fn is_local(&self) -> bool {
        reqwest::Url::parse(&self.endpoint)
            .ok()
            .and_then(|u| u.host_str().map(str::to_owned))
            .is_some_and(|h| h == "localhost" || h == "127.0.0.1" || h == "::1" || h == "[::1]")
    }
}

/// Keys and endpoints of the built-in tools.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ToolsConfig {
    #[serde(default)]
    pub openweathermap_api_key: Option<String>,
    #[serde(default)]
    pub hf_token: Option<String>,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_weather_base_url")]
    pub weather_base_url: String,
    #[serde(default = "default_hub_base_url")]
    pub hub_base_url: String,
    #[serde(default = "default_search_base_url")]
    pub search_base_url: String,
    #[serde(default = "default_inference_base_url")]
    pub inference_base_url: String,
}

fn default_image_model() -> String {
    DEFAULT_IMAGE_MODEL.into()
}

fn default_weather_base_url() -> String {
    OPENWEATHERMAP_BASE_URL.into()
}

fn default_hub_base_url() -> String {
    HF_HUB_BASE_URL.into()
}

fn default_search_base_url() -> String {
    DUCKDUCKGO_BASE_URL.into()
}

fn default_inference_base_url() -> String {
    HF_INFERENCE_BASE_URL.into()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            openweathermap_api_key: None,
            hf_token: None,
            image_model: default_image_model(),
            weather_base_url: default_weather_base_url(),
            hub_base_url: default_hub_base_url(),
            search_base_url: default_search_base_url(),
            inference_base_url: default_inference_base_url(),
        }
    }
}

/// Resolve a configured secret.
///
/// `$VAR` reads the environment variable `VAR`; any other non-empty
/// value is used as-is.  When nothing is configured the `fallback_env`
/// variable is consulted.
pub fn resolve_secret(value: Option<&str>, fallback_env: &str) -> Option<String> {
    let from_env = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => match v.strip_prefix('$') {
            Some(var) => from_env(var),
            None => Some(v.to_string()),
        },
        None => from_env(fallback_env),
    }
}

impl Config {
    /// Read and parse a YAML configuration file.  A missing file yields
    /// the defaults.
    pub async fn load(path: &Path) -> anyhow::Result<Config> {
        let mut config = match tokio::fs::read_to_string(path).await {
            Ok(contents) => {
                serde_yaml::from_str(&contents).context("failed to parse config YAML")?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "config file not found, using defaults");
                Config::default()
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read config file: {}", path.display()));
            }
        };
        config.validate()?;

        // Resolve a relative data dir against the concierge home.
        let data_dir = Path::new(&config.data_dir);
        if data_dir.is_relative() {
            config.data_dir = crate::concierge_home()
                .join(data_dir)
                .to_string_lossy()
                .to_string();
        }

        tracing::debug!(
            data_dir = %config.data_dir,
            model = %config.model.model,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Validate semantic constraints that serde cannot enforce.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.quota.limit == 0 {
            anyhow::bail!("config: quota.limit must be at least 1");
        }
        if self.quota.reset_interval_minutes == 0 {
            anyhow::bail!("config: quota.reset_interval_minutes must be at least 1");
        }
        if self.quota.reset_interval_minutes > MAX_RESET_INTERVAL_MINUTES {
            anyhow::bail!(
                "config: quota.reset_interval_minutes must be at most {MAX_RESET_INTERVAL_MINUTES} (one year)"
            );
        }
        if self.sessions.max_per_user == 0 {
            anyhow::bail!("config: sessions.max_per_user must be at least 1");
        }
        if self.model.max_steps == 0 {
            anyhow::bail!("config: model.max_steps must be at least 1");
        }
        if self.artifacts.image_extensions.is_empty() {
            anyhow::bail!("config: artifacts.image_extensions must not be empty");
        }
        if let Some(ext) = self
            .artifacts
            .image_extensions
            .iter()
            .find(|e| e.trim().trim_start_matches('.').is_empty())
        {
            anyhow::bail!("config: invalid image extension {ext:?}");
        }
        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    /// Where generated images are written before they are absorbed.
    pub fn scratch_dir(&self) -> PathBuf {
        self.artifacts
            .scratch_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir)
    }

    pub fn quota_policy(&self) -> QuotaPolicy {
        QuotaPolicy::new(self.quota.limit, self.quota.reset_interval_minutes)
    }

    /// Accepted image extensions, lowercased and without a leading dot.
    pub fn image_extensions(&self) -> Vec<String> {
        self.artifacts
            .image_extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .collect()
    }

    /// Settings for the built-in tools with secrets resolved.
    pub fn tool_settings(&self) -> ToolSettings {
        let tools = &self.tools;
        ToolSettings {
            openweathermap_api_key: resolve_secret(
                tools.openweathermap_api_key.as_deref(),
                "OPENWEATHERMAP_API_KEY",
            ),
            hf_token: resolve_secret(tools.hf_token.as_deref(), "HF_TOKEN"),
            image_model: tools.image_model.clone(),
            weather_base_url: tools.weather_base_url.clone(),
            hub_base_url: tools.hub_base_url.clone(),
            search_base_url: tools.search_base_url.clone(),
            inference_base_url: tools.inference_base_url.clone(),
            scratch_dir: self.scratch_dir(),
        }
    }
}
