//! Runtime configuration for the review service.
//!
//! Everything comes from the environment, optionally seeded from `.env` /
//! `.env.local` files before the snapshot is taken. Configuration is read
//! once at startup into [`RemoteConfig`] and passed by reference from there;
//! nothing re-reads the environment afterwards.
//!
//! Precedence, highest first: process environment, `.env.local`, `.env`.

use std::env;
use std::time::Duration;

/// Environment variable read for the provider API key, in priority order.
const API_KEY_VARS: [&str; 2] = ["CLAUDE_API_KEY", "ANTHROPIC_API_KEY"];

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY_SECONDS: f64 = 0.5;
const DEFAULT_MAX_TOKENS: u32 = 2048;
const DEFAULT_TEMPERATURE: f64 = 0.0;

/// Load `.env.local` and `.env` into the process environment.
///
/// Variables already present in the environment are never overwritten, and
/// `.env.local` is loaded first so it shadows `.env`. Missing files are not
/// an error.
pub fn load_dotenv_files() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();
}

/// Immutable snapshot of the remote reviewer configuration.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Provider API key. `None` means every remote attempt fails and the
    /// service runs on heuristics alone.
    pub api_key: Option<String>,
    /// Provider origin, normalized to carry no trailing slash and no
    /// `/v1/messages` suffix.
    pub base_url: String,
    pub model: String,
    /// Per-attempt timeout for the outbound call.
    pub timeout: Duration,
    /// Total send attempts per review, at least 1.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub retry_delay: Duration,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Upper bound on the code characters embedded in the outbound prompt.
    /// `None` sends the snippet whole. The response always echoes the full
    /// submitted code either way.
    pub max_code_chars: Option<usize>,
    /// When false, a failed remote review surfaces as a service-unavailable
    /// error instead of the heuristic fallback payload.
    pub fallback_enabled: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: Duration::from_secs_f64(DEFAULT_RETRY_DELAY_SECONDS),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            max_code_chars: None,
            fallback_enabled: true,
        }
    }
}

impl RemoteConfig {
    /// Snapshot the configuration from the current environment.
    ///
    /// Unparseable numeric values silently fall back to their defaults;
    /// a misconfigured variable must not take the service down.
    pub fn from_env() -> Self {
        let api_key = API_KEY_VARS.iter().find_map(|name| env_string(name));

        let base_url = env_string("CLAUDE_API_URL")
            .map(|raw| normalize_base_url(&raw))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let retry_delay_seconds =
            env_parse("CLAUDE_RETRY_DELAY_SECONDS", DEFAULT_RETRY_DELAY_SECONDS).max(0.0);
        let retry_delay = Duration::try_from_secs_f64(retry_delay_seconds)
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_RETRY_DELAY_SECONDS));

        Self {
            api_key,
            base_url,
            model: env_string("CLAUDE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(env_parse(
                "CLAUDE_TIMEOUT_SECONDS",
                DEFAULT_TIMEOUT_SECONDS,
            )),
            max_attempts: env_parse("CLAUDE_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS).max(1),
            retry_delay,
            max_tokens: env_parse("CLAUDE_MAX_TOKENS", DEFAULT_MAX_TOKENS),
            temperature: env_parse("CLAUDE_TEMPERATURE", DEFAULT_TEMPERATURE),
            max_code_chars: env_string("CLAUDE_MAX_CODE_CHARS")
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|n| *n > 0),
            fallback_enabled: env_bool("REVIEW_FALLBACK_ENABLED", true),
        }
    }

    /// Full URL of the provider messages endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    pub fn api_key_present(&self) -> bool {
        self.api_key.is_some()
    }

    /// Problems that keep the remote reviewer from working.
    ///
    /// The service still starts with any of these present; reviews then run
    /// on the heuristic engine only.
    pub fn validation_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.api_key.is_none() {
            warnings.push(
                "no API key configured (set CLAUDE_API_KEY or ANTHROPIC_API_KEY); \
                 remote review is disabled"
                    .to_string(),
            );
        }
        if self.timeout.is_zero() {
            warnings.push("CLAUDE_TIMEOUT_SECONDS is 0; every remote call will time out".to_string());
        }
        warnings
    }
}

/// Strip trailing slashes and a redundant `/v1/messages` suffix.
///
/// Callers sometimes configure the full endpoint instead of the origin; the
/// client appends the path itself, so it is removed here.
fn normalize_base_url(raw: &str) -> String {
    let mut base = raw.trim().trim_end_matches('/');
    if let Some(stripped) = base.strip_suffix("/v1/messages") {
        base = stripped;
    }
    base.trim_end_matches('/').to_string()
}

/// Read a variable as a trimmed non-empty string.
fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env_string(name)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    match env_string(name).map(|v| v.to_ascii_lowercase()).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
