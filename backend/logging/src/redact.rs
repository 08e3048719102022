//! Log Redaction Layer
//!
//! Scrubs Telegram bot tokens and bearer tokens from strings prior to logging.
//! Transport errors routinely echo the request URL, which embeds the bot token.

use once_cell::sync::Lazy;
use regex::Regex;

static BOT_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{6,12}:[A-Za-z0-9_-]{30,}").expect("valid bot token regex"));
static BEARER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Bearer\s+[a-zA-Z0-9\-\._~+/]+=*").expect("valid bearer regex"));

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = BOT_TOKEN_RE.replace_all(input, "[REDACTED_BOT_TOKEN]");
    BEARER_RE
        .replace_all(&redacted, "[REDACTED_TOKEN]")
        .into_owned()
}
