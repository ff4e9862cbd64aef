//! Built-in `hub_stats` tool: the most downloaded Hugging Face model
//! of an author.

use anyhow::Context as _;
use reqwest::{Client, Url};
use serde::Deserialize;

use super::ToolSettings;
use crate::tools::{handler, single_string_schema, str_arg, ToolMeta, ToolRegistry};
use crate::utils::group_thousands;

#[derive(Debug, Deserialize)]
struct HubModel {
    #[serde(alias = "modelId")]
    id: String,
    #[serde(default)]
    downloads: u64,
}

pub async fn top_model(
    client: &Client,
    base_url: &str,
    token: Option<&str>,
    author: &str,
) -> anyhow::Result<String> {
    let url = Url::parse_with_params(
        &format!("{}/api/models", base_url.trim_end_matches('/')),
        &[
            ("author", author),
            ("sort", "downloads"),
            ("direction", "-1"),
            ("limit", "1"),
        ],
    )
    .context("build hub URL")?;

    let mut req = client.get(url);
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        req = req.bearer_auth(token);
    }
    let resp = req.send().await.context("hub request failed")?;
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        anyhow::bail!("hub API returned {status}: {text}");
    }

    let models: Vec<HubModel> = resp.json().await.context("unexpected hub response")?;
    Ok(match models.first() {
        Some(m) => format!(
            "Top model by {author}: {} ({} downloads).",
            m.id,
            group_thousands(m.downloads)
        ),
        None => format!("No models found for: {author}"),
    })
}

pub fn register(registry: &mut ToolRegistry, client: Client, settings: &ToolSettings) {
    let base_url = settings.hub_base_url.clone();
    let token = settings.hf_token.clone();
    registry.register(
        ToolMeta {
            name: "hub_stats".into(),
            description: "Retrieves the most downloaded model for a specific author from \
                          Hugging Face."
                .into(),
            args_schema: single_string_schema("author", "Hugging Face username or organisation."),
        },
        handler(move |args| {
            let client = client.clone();
            let base_url = base_url.clone();
            let token = token.clone();
            async move {
                let author = str_arg(&args, "author")?;
                top_model(&client, &base_url, token.as_deref(), author).await
            }
        }),
    );
}
