//! Built-in `generate_image` tool: text-to-image through Hugging
//! Face inference.
//!
//! The image is written to the scratch directory and its path is the
//! tool's observation.  The file is ephemeral: the conversation layer
//! absorbs it into the session and deletes it (see
//! [`crate::artifact`]).

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use super::ToolSettings;
use crate::tools::{handler, single_string_schema, str_arg, ToolMeta, ToolRegistry};

fn extension_for(content_type: Option<&str>) -> &'static str {
    match content_type.map(|c| c.split(';').next().unwrap_or("").trim()) {
        Some("image/jpeg") | Some("image/jpg") => "jpg",
        Some("image/webp") => "webp",
        _ => "png",
    }
}

pub async fn generate_image(
    client: &Client,
    base_url: &str,
    model: &str,
    token: Option<&str>,
    scratch_dir: &Path,
    prompt: &str,
) -> anyhow::Result<PathBuf> {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        anyhow::bail!("HF_TOKEN is not configured");
    };
    let url = format!("{}/models/{model}", base_url.trim_end_matches('/'));
    let resp = client
        .post(&url)
        .bearer_auth(token)
        .json(&json!({ "inputs": prompt }))
        .send()
        .await
        .context("image generation request failed")?;

    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        anyhow::bail!("image API returned {status}: {text}");
    }
    let ext = extension_for(
        resp.headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
    );
    let bytes = resp.bytes().await.context("read image bytes")?;

    tokio::fs::create_dir_all(scratch_dir)
        .await
        .with_context(|| format!("create scratch dir {}", scratch_dir.display()))?;
    let path = scratch_dir.join(format!(
        "concierge-image-{}.{ext}",
        uuid::Uuid::new_v4().simple()
    ));
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("write {}", path.display()))?;
    debug!(path = %path.display(), bytes = bytes.len(), "generated image written");
    Ok(path)
}

pub fn register(registry: &mut ToolRegistry, client: Client, settings: &ToolSettings) {
    let base_url = settings.inference_base_url.clone();
    let model = settings.image_model.clone();
    let token = settings.hf_token.clone();
    let scratch_dir = settings.scratch_dir.clone();
    registry.register(
        ToolMeta {
            name: "generate_image".into(),
            description: "Generates an image from a text prompt and returns the path of the \
                          image file. Return that path as the final answer to show the image."
                .into(),
            args_schema: single_string_schema("prompt", "Description of the image to generate."),
        },
        handler(move |args| {
            let client = client.clone();
            let base_url = base_url.clone();
            let model = model.clone();
            let token = token.clone();
            let scratch_dir = scratch_dir.clone();
            async move {
                let prompt = str_arg(&args, "prompt")?;
                let path = generate_image(
                    &client,
                    &base_url,
                    &model,
                    token.as_deref(),
                    &scratch_dir,
                    prompt,
                )
                .await?;
                Ok(path.display().to_string())
            }
        }),
    );
}
