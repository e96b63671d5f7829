use std::{env, path::PathBuf, time::Duration};

use crate::api_client::RetryPolicy;

/// AppConfig
///
/// Holds the gateway's entire configuration state. Loaded once at startup and
/// immutable afterwards; handlers pull it out of `AppState` through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Backend REST origin every proxy route forwards to (e.g. http://backend:5000/api).
    pub api_url: String,
    // Public website origin. Used as the only allowed CORS origin in production.
    pub website_url: String,
    // Runtime environment marker. Selects log format and CORS policy.
    pub env: Env,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Optional shared secret. When present, sessions are validated locally instead of
    // asking the backend.
    pub jwt_secret: Option<String>,
    // Root directory holding the console page sections (dashboard/, finance/, ...).
    pub pages_dir: PathBuf,
    // Per-request timeout for every upstream call.
    pub request_timeout: Duration,
    // Retry policy used by `ApiClient`. Proxy routes never retry.
    pub retry: RetryPolicy,
}

/// Env
///
/// Runtime context: `Local` for development (pretty logs, permissive CORS),
/// `Production` for deployments (JSON logs, locked-down CORS, fail-fast config).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

const DEFAULT_API_URL: &str = "http://localhost:5000/api";
const DEFAULT_WEBSITE_URL: &str = "http://localhost:3001";

impl Default for AppConfig {
    /// Safe, non-panicking values for test state scaffolding.
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            website_url: DEFAULT_WEBSITE_URL.to_string(),
            env: Env::Local,
            bind_addr: "0.0.0.0:3000".to_string(),
            jwt_secret: None,
            pages_dir: PathBuf::from("./pages"),
            request_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from the environment.
    ///
    /// The server-side `INTERNAL_API_URL` wins over the browser-facing
    /// `NEXT_PUBLIC_API_URL`, since the gateway usually sits next to the backend.
    ///
    /// # Panics
    /// In production, panics when no backend URL or website URL is configured, so a
    /// half-configured deployment never starts forwarding traffic to localhost.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").unwrap_or_else(|_| "local".to_string()).as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let api_url = env::var("INTERNAL_API_URL")
            .or_else(|_| env::var("NEXT_PUBLIC_API_URL"))
            .ok();
        let website_url = env::var("NEXT_PUBLIC_WEBSITE_URL").ok();

        let (api_url, website_url) = match env {
            Env::Production => (
                api_url.expect("FATAL: INTERNAL_API_URL or NEXT_PUBLIC_API_URL required in prod"),
                website_url.expect("FATAL: NEXT_PUBLIC_WEBSITE_URL required in prod"),
            ),
            Env::Local => (
                api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
                website_url.unwrap_or_else(|| DEFAULT_WEBSITE_URL.to_string()),
            ),
        };

        let request_timeout = env::var("API_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));

        let mut retry = RetryPolicy::default();
        if let Some(max) = env::var("API_MAX_RETRIES").ok().and_then(|v| v.parse().ok()) {
            retry.max_retries = max;
        }

        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            website_url: website_url.trim_end_matches('/').to_string(),
            env,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            jwt_secret: env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()),
            pages_dir: env::var("ADMIN_PAGES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./pages")),
            request_timeout,
            retry,
        }
    }
}
