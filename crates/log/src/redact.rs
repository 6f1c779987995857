//! Secret redaction applied before a record reaches any handler.

/// Replace every occurrence of any `secrets` entry in `text` with `***`.
/// Empty secret values are ignored (they would match everywhere).
pub fn redact_secrets(text: &str, secrets: &[String]) -> String {
    if secrets.is_empty() {
        return text.to_string();
    }
    let mut out = text.to_string();
    for secret in secrets {
        if secret.is_empty() {
            continue;
        }
        out = out.replace(secret.as_str(), "***");
    }
    out
}

/// Recursively redact string values inside a JSON object.
pub fn redact_json(
    context: serde_json::Map<String, serde_json::Value>,
    secrets: &[String],
) -> serde_json::Map<String, serde_json::Value> {
    context
        .into_iter()
        .map(|(k, v)| (k, redact_value(v, secrets)))
        .collect()
}

fn redact_value(value: serde_json::Value, secrets: &[String]) -> serde_json::Value {
    match value {
        serde_json::Value::String(s) => serde_json::Value::String(redact_secrets(&s, secrets)),
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(|v| redact_value(v, secrets)).collect())
        }
        serde_json::Value::Object(map) => serde_json::Value::Object(redact_json(map, secrets)),
        other => other,
    }
}
