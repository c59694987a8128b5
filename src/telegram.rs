//! Advisory Telegram handle verification via the Bot API `getChat` call.
//!
//! Best-effort only: the admission path never blocks on this check. Missing
//! credentials, network failure, and upstream rate limiting all degrade to
//! [`VerifyOutcome::Unavailable`] rather than an error — an unreachable
//! Telegram API must not stop anyone from entering the lottery.

use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

/// Environment variable holding the bot token.
pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Result of a handle lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyOutcome {
    /// The handle exists; `username` is Telegram's canonical casing.
    Confirmed { username: String },
    /// Telegram answered and the handle does not exist.
    NotFound,
    /// The lookup could not be completed; treat the handle as unverified.
    Unavailable { reason: String },
}

#[derive(Deserialize)]
struct GetChatResponse {
    ok: bool,
    #[serde(default)]
    result: Option<GetChatResult>,
}

#[derive(Deserialize)]
struct GetChatResult {
    #[serde(default)]
    username: Option<String>,
}

/// Look up a handle against the Bot API. The handle is normalized the same
/// way the admission path normalizes identities (leading '@' stripped).
pub async fn verify_handle(handle: &str) -> VerifyOutcome {
    let token = match std::env::var(BOT_TOKEN_ENV) {
        Ok(t) if !t.is_empty() => t,
        _ => {
            return VerifyOutcome::Unavailable {
                reason: "verification not configured".to_string(),
            }
        }
    };

    let clean = crate::submission::normalize_handle(handle);
    let url = format!(
        "https://api.telegram.org/bot{}/getChat?chat_id=@{}",
        token, clean
    );

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            return VerifyOutcome::Unavailable {
                reason: format!("http client error: {}", e),
            }
        }
    };

    let response = match client.get(&url).send().await {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "telegram lookup failed");
            return VerifyOutcome::Unavailable {
                reason: "telegram unreachable".to_string(),
            };
        }
    };

    let status = response.status();
    let body = match response.text().await {
        Ok(b) => b,
        Err(e) => {
            warn!(error = %e, "telegram response unreadable");
            return VerifyOutcome::Unavailable {
                reason: "telegram response unreadable".to_string(),
            };
        }
    };

    interpret_response(status.as_u16(), &body, &clean)
}

/// Map an HTTP status + body onto a verification outcome.
///
/// Telegram answers 200 with `ok: true` for known chats and 400/404 with
/// `ok: false` for unknown ones; 429 is rate limiting and means "cannot
/// verify", never "does not exist".
pub fn interpret_response(status: u16, body: &str, fallback_username: &str) -> VerifyOutcome {
    if status == 429 {
        return VerifyOutcome::Unavailable {
            reason: "telegram rate limited".to_string(),
        };
    }
    if status >= 500 {
        return VerifyOutcome::Unavailable {
            reason: format!("telegram error: HTTP {}", status),
        };
    }

    let parsed: GetChatResponse = match serde_json::from_str(body) {
        Ok(p) => p,
        Err(_) => {
            return VerifyOutcome::Unavailable {
                reason: "malformed telegram response".to_string(),
            }
        }
    };

    if parsed.ok {
        let username = parsed
            .result
            .and_then(|r| r.username)
            .unwrap_or_else(|| fallback_username.to_string());
        VerifyOutcome::Confirmed { username }
    } else {
        VerifyOutcome::NotFound
    }
}
