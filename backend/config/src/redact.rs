//! Config redaction: mask secrets before a config is printed or logged.

use serde_json::Value;

/// Keys whose string values are secrets.
static SECRET_KEYS: &[&str] = &[
    "apiKey",
    "api_key",
    "apikey",
    "token",
    "accessToken",
    "access_token",
    "secret",
    "password",
];

/// Redact a config JSON value, masking every secret field.
///
/// The first four characters survive as a hint so two keys can be told apart.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

fn is_secret_key(key: &str) -> bool {
    SECRET_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn mask(s: &str) -> String {
    if s.chars().count() > 8 {
        format!("{}***", s.chars().take(4).collect::<String>())
    } else {
        "***".to_string()
    }
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) if is_secret_key(key) && !s.is_empty() => Value::String(mask(s)),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_recursive(v, k)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Dotted paths of every field `redact` would mask.
pub fn collect_redacted_paths(value: &Value) -> Vec<String> {
    let mut paths = Vec::new();
    collect_paths(value, "", "", &mut paths);
    paths
}

fn collect_paths(value: &Value, key: &str, path: &str, out: &mut Vec<String>) {
    match value {
        Value::String(s) if is_secret_key(key) && !s.is_empty() => out.push(path.to_string()),
        Value::Object(map) => {
            for (k, v) in map {
                let child = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                collect_paths(v, k, &child, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masks_vision_api_key() {
        let v = json!({ "vision": { "apiKey": "sk-abcdef123456", "model": "gpt-4o" } });
        let redacted = redact(&v);
        assert_eq!(redacted["vision"]["apiKey"], "sk-a***");
        assert_eq!(redacted["vision"]["model"], "gpt-4o");
    }

    #[test]
    fn short_secrets_are_fully_masked() {
        let redacted = redact(&json!({ "password": "abc" }));
        assert_eq!(redacted["password"], "***");
    }

    #[test]
    fn reports_redacted_paths() {
        let v = json!({ "vision": { "apiKey": "sk-abcdef123456" }, "logging": { "level": "debug" } });
        assert_eq!(collect_redacted_paths(&v), vec!["vision.apiKey"]);
    }
}
