//! Built-in `weather_info` tool: current conditions from
//! OpenWeatherMap, metric units.

use anyhow::Context as _;
use reqwest::{Client, Url};
use serde_json::Value;

use super::ToolSettings;
use crate::tools::{handler, single_string_schema, str_arg, ToolMeta, ToolRegistry};

/// Fetch current weather for `location`.
pub async fn weather_info(
    client: &Client,
    base_url: &str,
    api_key: Option<&str>,
    location: &str,
) -> anyhow::Result<String> {
    let Some(api_key) = api_key.filter(|k| !k.is_empty()) else {
        anyhow::bail!("OPENWEATHERMAP_API_KEY is not configured");
    };
    let url = Url::parse_with_params(
        &format!("{}/data/2.5/weather", base_url.trim_end_matches('/')),
        &[("q", location), ("appid", api_key), ("units", "metric")],
    )
    .context("build weather URL")?;

    let resp = client.get(url).send().await.context("weather request failed")?;
    let status = resp.status();
    let data: Value = resp.json().await.unwrap_or(Value::Null);

    if !status.is_success() {
        let message = data
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("City not found or API error");
        anyhow::bail!("error fetching weather: {message}");
    }

    let temp = data["main"]["temp"]
        .as_f64()
        .context("weather response missing main.temp")?;
    let desc = data["weather"][0]["description"]
        .as_str()
        .unwrap_or("unknown conditions");
    Ok(format!("Current weather in {location}: {desc}, {temp}°C"))
}

pub fn register(registry: &mut ToolRegistry, client: Client, settings: &ToolSettings) {
    let base_url = settings.weather_base_url.clone();
    let api_key = settings.openweathermap_api_key.clone();
    registry.register(
        ToolMeta {
            name: "weather_info".into(),
            description: "Fetches real-time weather data for a specific location using \
                          OpenWeatherMap."
                .into(),
            args_schema: single_string_schema(
                "location",
                "Target city or region (e.g. 'Berlin', 'New York').",
            ),
        },
        handler(move |args| {
            let client = client.clone();
            let base_url = base_url.clone();
            let api_key = api_key.clone();
            async move {
                let location = str_arg(&args, "location")?;
                weather_info(&client, &base_url, api_key.as_deref(), location).await
            }
        }),
    );
}
