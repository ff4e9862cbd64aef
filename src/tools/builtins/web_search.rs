//! Built-in `web_search` tool: DuckDuckGo instant answers.

use anyhow::Context as _;
use reqwest::{Client, Url};
use serde_json::Value;

use super::ToolSettings;
use crate::tools::{handler, single_string_schema, str_arg, ToolMeta, ToolRegistry};

/// Maximum related topics listed in a result.
const MAX_TOPICS: usize = 5;

pub async fn web_search(client: &Client, base_url: &str, query: &str) -> anyhow::Result<String> {
    let url = Url::parse_with_params(
        &format!("{}/", base_url.trim_end_matches('/')),
        &[
            ("q", query),
            ("format", "json"),
            ("no_html", "1"),
            ("skip_disambig", "1"),
        ],
    )
    .context("build search URL")?;

    let resp = client.get(url).send().await.context("search request failed")?;
    let status = resp.status();
    if !status.is_success() {
        anyhow::bail!("search API returned {status}");
    }
    // DuckDuckGo labels its JSON as javascript; parse the text body.
    let body = resp.text().await.context("read search response")?;
    let data: Value = serde_json::from_str(&body).context("unexpected search response")?;
    Ok(summarize(query, &data))
}

fn summarize(query: &str, data: &Value) -> String {
    let mut lines = Vec::new();

    let heading = data["Heading"].as_str().unwrap_or("").trim();
    let abstract_text = data["AbstractText"].as_str().unwrap_or("").trim();
    if !abstract_text.is_empty() {
        if !heading.is_empty() {
            lines.push(format!("## {heading}"));
        }
        lines.push(abstract_text.to_string());
        if let Some(src) = data["AbstractURL"].as_str().filter(|s| !s.is_empty()) {
            lines.push(format!("Source: {src}"));
        }
    }
    if let Some(answer) = data["Answer"].as_str().filter(|s| !s.is_empty()) {
        lines.push(format!("Answer: {answer}"));
    }

    let topics: Vec<String> = data["RelatedTopics"]
        .as_array()
        .into_iter()
        .flatten()
        .flat_map(|t| match t.get("Topics").and_then(Value::as_array) {
            // Grouped topics nest one level deeper.
            Some(group) => group.iter().collect::<Vec<_>>(),
            None => vec![t],
        })
        .filter_map(|t| {
            let text = t.get("Text")?.as_str()?;
            let url = t.get("FirstURL").and_then(Value::as_str).unwrap_or("");
            Some(format!("- {text} ({url})"))
        })
        .take(MAX_TOPICS)
        .collect();
    if !topics.is_empty() {
        lines.push("Related:".into());
        lines.extend(topics);
    }

    if lines.is_empty() {
        format!("No results found for '{query}'.")
    } else {
        lines.join("\n")
    }
}

pub fn register(registry: &mut ToolRegistry, client: Client, settings: &ToolSettings) {
    let base_url = settings.search_base_url.clone();
    registry.register(
        ToolMeta {
            name: "web_search".into(),
            description: "Performs a web search and returns a summary with related links.".into(),
            args_schema: single_string_schema("query", "The search query to perform."),
        },
        handler(move |args| {
            let client = client.clone();
            let base_url = base_url.clone();
            async move { web_search(&client, &base_url, str_arg(&args, "query")?).await }
        }),
    );
}
