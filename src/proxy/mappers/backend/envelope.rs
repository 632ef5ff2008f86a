// Backend response normalization into the browser envelope
use reqwest::{header, Response, StatusCode};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::models::ProxyResponse;

/// Parse a backend body. JSON content types are parsed strictly; anything
/// else is tried as JSON and degraded to `{ "message": <text> }`.
pub fn parse_body(content_type: Option<&str>, body: &[u8]) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }

    let text = String::from_utf8_lossy(body);
    if is_json_content_type(content_type) {
        if let Ok(value) = serde_json::from_slice::<Value>(body) {
            return value;
        }
        tracing::warn!("Backend declared JSON but sent an unparsable body");
    }

    serde_json::from_str::<Value>(&text).unwrap_or_else(|_| json!({ "message": text }))
}

fn is_json_content_type(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

/// Unwrap one level of `{ "data": <object|array> }`
pub fn unwrap_payload(body: Value) -> Value {
    match body {
        Value::Object(mut obj) => {
            let nested = matches!(obj.get("data"), Some(Value::Object(_)) | Some(Value::Array(_)));
            if nested {
                obj.remove("data").unwrap_or(Value::Null)
            } else {
                Value::Object(obj)
            }
        }
        other => other,
    }
}

/// Best message from an error body: `detail`, `message`, `error`, then a
/// synthesized one.
pub fn error_message(body: &Value, status: u16) -> String {
    ["detail", "message", "error"]
        .iter()
        .filter_map(|key| body.get(*key))
        .find_map(field_text)
        .unwrap_or_else(|| format!("Request failed with status {}", status))
}

fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        // e.g. a list of validation errors
        other => Some(other.to_string()),
    }
}

/// Build the envelope from status, content type and raw body
pub fn normalize(
    status: StatusCode,
    content_type: Option<&str>,
    body: &[u8],
    unwrap: bool,
) -> ProxyResponse {
    let parsed = parse_body(content_type, body);

    if !status.is_success() {
        let message = error_message(&parsed, status.as_u16());
        tracing::warn!(status = status.as_u16(), "Backend rejected request: {}", message);
        return ProxyResponse::error(status.as_u16(), message);
    }

    let payload = if unwrap { unwrap_payload(parsed) } else { parsed };
    ProxyResponse::ok(payload)
}

/// Read a backend response and normalize it
pub async fn normalize_response(response: Response, unwrap: bool) -> AppResult<ProxyResponse> {
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let body = response.bytes().await?;

    Ok(normalize(status, content_type.as_deref(), &body, unwrap))
}
