use std::fs;
use std::time::Duration;

use reqwest::Client;
use tracing::info;

use crate::error::ImportError;

const USER_AGENT: &str = "dmp-import/0.1.0";

fn is_remote(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Retrieves the CSV text, over HTTP(S) or from a local path.
pub async fn fetch_source(source: &str, timeout: Duration) -> Result<String, ImportError> {
    let fail = |message: String| ImportError::Fetch {
        source_url: source.to_string(),
        message,
    };

    let body = if is_remote(source) {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| fail(format!("cannot build HTTP client: {e}")))?;

        let resp = client
            .get(source)
            .send()
            .await
            .map_err(|e| fail(format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| fail(e.to_string()))?;

        resp.text()
            .await
            .map_err(|e| fail(format!("read body failed: {e}")))?
    } else {
        fs::read_to_string(source).map_err(|e| fail(e.to_string()))?
    };

    info!("Fetched {} bytes from {}", body.len(), source);
    Ok(body)
}
