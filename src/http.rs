use crate::error::Result;
use std::time::Duration;

pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; subculture-news/1.0)";

/// Build the shared HTTP client: fixed per-request ceiling, identifying UA.
pub fn client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()?)
}

/// GET a page and return its body as text.
pub async fn get_text(client: &reqwest::Client, url: &str) -> Result<String> {
    tracing::debug!("HTTP GET request to: {}", url);
    let resp = client.get(url).send().await?.error_for_status()?;
    Ok(resp.text().await?)
}

/// GET a JSON endpoint.
pub async fn get_json(client: &reqwest::Client, url: &str) -> Result<serde_json::Value> {
    tracing::debug!("HTTP GET request to: {}", url);
    let resp = client.get(url).send().await?.error_for_status()?;
    Ok(resp.json().await?)
}
