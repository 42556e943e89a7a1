// src/services/http.rs
//! Small HTTP helpers shared by the issuance and verification clients.

use reqwest::Response;
use serde_json::Value;

const MAX_REASON_LEN: usize = 200;

/// Removes a single trailing `/` so paths can be appended uniformly.
pub fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim();
    trimmed.strip_suffix('/').unwrap_or(trimmed).to_string()
}

/// Joins a base URL and an absolute path.
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}{}", normalize_base_url(base), path)
}

/// Builds the human-readable reason for a non-success response.
///
/// Prefers the error fields of a JSON body, then the raw body, then the
/// status line alone.
pub async fn rejection_reason(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match reason_from_body(&body) {
        Some(reason) => format!("HTTP {}: {reason}", status.as_u16()),
        None => format!("HTTP {status}"),
    }
}

fn reason_from_body(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(body) {
        let found = ["errorDescription", "error_description", "message", "error", "reason"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str))
            .filter(|s| !s.is_empty());
        if let Some(reason) = found {
            return Some(reason.to_string());
        }
    }

    Some(body.chars().take(MAX_REASON_LEN).collect())
}
