//! Application configuration loaded from environment variables.

use serde::Deserialize;
use url::Url;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Server Configuration ===
    /// HTTP listening port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of reverse proxies whose `X-Forwarded-*` headers are trusted.
    #[serde(default = "default_trust_proxy_hops")]
    pub trust_proxy_hops: usize,

    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,

    // === Cross-Origin ===
    /// Allowed CORS origin; any origin when unset.
    #[serde(default)]
    pub client_url: Option<String>,

    /// Deployment environment. `production` turns on secure cookies.
    #[serde(default)]
    pub node_env: Option<String>,

    // === Cookie Session ===
    /// Name of the session cookie.
    #[serde(default = "default_session_name")]
    pub session_name: String,

    /// Signing keys, comma separated. The first key signs, all keys verify.
    #[serde(default = "default_session_keys")]
    pub session_keys: String,

    /// Session cookie lifetime in seconds.
    #[serde(default = "default_session_max_age")]
    pub session_max_age_secs: u64,
}

fn default_port() -> u16 {
    4001
}

fn default_trust_proxy_hops() -> usize {
    1
}

fn default_body_limit() -> usize {
    50 * 1024 * 1024 // 50 MB
}

fn default_session_name() -> String {
    "session".to_string()
}

fn default_session_keys() -> String {
    "secret-1,secret-2".to_string()
}

fn default_session_max_age() -> u64 {
    7 * 24 * 3600 // 1 week
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            trust_proxy_hops: default_trust_proxy_hops(),
            body_limit_bytes: default_body_limit(),
            client_url: None,
            node_env: None,
            session_name: default_session_name(),
            session_keys: default_session_keys(),
            session_max_age_secs: default_session_max_age(),
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("PORT must be non-zero".to_string());
        }

        if self.session_keys().is_empty() {
            return Err("SESSION_KEYS must contain at least one key".to_string());
        }

        if self.body_limit_bytes == 0 {
            return Err("BODY_LIMIT_BYTES must be non-zero".to_string());
        }

        if let Some(origin) = self.allowed_origin() {
            Url::parse(origin).map_err(|e| format!("CLIENT_URL is not a valid URL: {}", e))?;
        }

        Ok(())
    }

    /// Configured CORS origin, `None` meaning any origin.
    pub fn allowed_origin(&self) -> Option<&str> {
        self.client_url
            .as_deref()
            .map(str::trim)
            .filter(|origin| !origin.is_empty() && *origin != "*")
    }

    /// Whether cookies must carry the `Secure` attribute.
    pub fn is_production(&self) -> bool {
        self.node_env.as_deref() == Some("production")
    }

    /// Session signing keys in rotation order.
    pub fn session_keys(&self) -> Vec<String> {
        self.session_keys
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect()
    }
}
