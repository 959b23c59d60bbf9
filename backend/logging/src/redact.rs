//! Scrubs API keys and bearer tokens from strings before logging.

use once_cell::sync::Lazy;
use regex::Regex;

static API_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(sk-[A-Za-z0-9_\-]{16,})|(AIza[0-9A-Za-z_\-]{20,})|(Bearer\s+[A-Za-z0-9\-\._~+/]+=*)|(key=[A-Za-z0-9_\-]{16,})")
        .unwrap()
});

/// Redacts secrets in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    API_KEY_RE.replace_all(input, "[REDACTED_TOKEN]").into_owned()
}
