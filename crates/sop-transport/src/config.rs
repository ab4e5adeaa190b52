//! Client configuration.
//!
//! Built once at start-up and owned by the client; nothing in the call path
//! reads the environment.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Environment variables checked for the API credential, in order.
pub const API_KEY_ENV_VARS: &[&str] = &["LLM_API_KEY", "GOVPLAN_API_KEY", "API_KEY", "OPENROUTER_API_KEY"];

/// Secret-store key checked before the environment variable names.
const API_KEY_SECRET: &str = "api_key";

const DEFAULT_API_BASE: &str = "http://localhost:8000/v1";
const DEFAULT_MODEL: &str = "llama4scout";

/// Errors loading configuration sources.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read secrets file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("secrets file {path} is not valid TOML: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Flat key/value secret store, checked before the environment.
///
/// Loaded from a TOML file of top-level string keys:
///
/// ```toml
/// api_key = "sk-..."
/// ```
#[derive(Debug, Clone, Default)]
pub struct SecretStore {
    values: BTreeMap<String, String>,
}

impl SecretStore {
    /// Store with no entries.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a store from a TOML file. Non-string values are ignored.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Parse a store from TOML text.
    pub fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        let table: toml::Table = raw.parse()?;
        let values = table
            .into_iter()
            .filter_map(|(k, v)| match v {
                toml::Value::String(s) => Some((k, s)),
                _ => None,
            })
            .collect();
        Ok(Self { values })
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Non-blank value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Connection-level retry applied to a single HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Extra attempts after the first
    pub retries_max: u32,
    /// Base of the exponential backoff
    pub backoff_factor: Duration,
    /// Upper bound on a single backoff sleep
    pub backoff_max: Duration,
    /// Statuses that trigger a retry
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries_max: 2,
            backoff_factor: Duration::from_millis(800),
            backoff_max: Duration::from_secs(120),
            retry_statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    /// No retries, no sleeping.
    #[must_use]
    pub fn none() -> Self {
        Self {
            retries_max: 0,
            backoff_factor: Duration::ZERO,
            ..Default::default()
        }
    }

    /// Sleep before retry number `retry` (0-based), capped.
    #[must_use]
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.backoff_factor
            .saturating_mul(factor)
            .min(self.backoff_max)
    }

    #[must_use]
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }
}

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Endpoint URLs, tried in order (chat style first, legacy second)
    pub endpoints: Vec<String>,
    /// Model identifier sent with every request
    pub model: String,
    /// Bearer credential; `None` sends unauthenticated requests
    pub api_key: Option<String>,
    /// Fixed connect timeout
    pub connect_timeout: Duration,
    /// Full passes over every endpoint and tier
    pub outer_attempts: u32,
    /// Base of the sleep between outer passes
    pub outer_backoff: Duration,
    /// Token cap used by the minimized tiers
    pub minimized_tokens_max: u32,
    /// Connection-level retry inside one request
    pub http_retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_base(DEFAULT_API_BASE)
    }
}

impl ClientConfig {
    /// Config for an OpenAI-compatible base URL such as `http://host/v1`.
    #[must_use]
    pub fn for_base(api_base: &str) -> Self {
        let base = api_base.trim_end_matches('/');
        Self {
            endpoints: vec![
                format!("{base}/chat/completions"),
                format!("{base}/completions"),
            ],
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            connect_timeout: Duration::from_secs(15),
            outer_attempts: 2,
            outer_backoff: Duration::from_millis(800),
            minimized_tokens_max: 800,
            http_retry: RetryPolicy::default(),
        }
    }

    /// Config with every sleep removed, for tests and simulations.
    #[must_use]
    pub fn without_backoff(mut self) -> Self {
        self.outer_backoff = Duration::ZERO;
        self.http_retry = RetryPolicy::none();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    /// Resolve configuration from the secret store and process environment.
    ///
    /// - `LLM_API_BASE`: base URL (default `http://localhost:8000/v1`)
    /// - `LLM_MODEL`: model identifier (default `llama4scout`)
    /// - credential: see [`resolve_api_key`]
    #[must_use]
    pub fn from_env(secrets: &SecretStore) -> Self {
        Self::from_lookup(secrets, |name| std::env::var(name).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an injectable variable lookup.
    pub fn from_lookup(secrets: &SecretStore, env: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let base = non_blank("LLM_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let model = non_blank("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_key = resolve_api_key(secrets, &non_blank);

        Self::for_base(&base)
            .with_model(model)
            .with_api_key(api_key)
    }
}

/// Resolve the API credential.
///
/// Precedence: secret store key `api_key`, secret store keys named like the
/// environment variables, then the environment variables themselves.
pub fn resolve_api_key(
    secrets: &SecretStore,
    env: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    if let Some(key) = secrets.get(API_KEY_SECRET) {
        return Some(key.to_string());
    }
    if let Some(key) = API_KEY_ENV_VARS.iter().find_map(|name| secrets.get(name)) {
        return Some(key.to_string());
    }
    API_KEY_ENV_VARS.iter().find_map(|name| env(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_for_base_builds_both_routes() {
        let config = ClientConfig::for_base("https://llm.example/v1/");
        assert_eq!(
            config.endpoints,
            vec![
                "https://llm.example/v1/chat/completions",
                "https://llm.example/v1/completions"
            ]
        );
        assert_eq!(config.outer_attempts, 2);
        assert_eq!(config.minimized_tokens_max, 800);
    }

    #[test]
    fn test_secret_store_wins_over_environment() {
        let mut secrets = SecretStore::empty();
        secrets.insert("api_key", "from-store");
        let config = ClientConfig::from_lookup(&secrets, env_of(&[("LLM_API_KEY", "from-env")]));
        assert_eq!(config.api_key.as_deref(), Some("from-store"));
    }

    #[test]
    fn test_store_env_named_keys_checked_before_env() {
        let mut secrets = SecretStore::empty();
        secrets.insert("OPENROUTER_API_KEY", "store-named");
        let config = ClientConfig::from_lookup(&secrets, env_of(&[("API_KEY", "env")]));
        assert_eq!(config.api_key.as_deref(), Some("store-named"));
    }

    #[test]
    fn test_env_var_order() {
        let env = env_of(&[("API_KEY", "third"), ("GOVPLAN_API_KEY", "second")]);
        let config = ClientConfig::from_lookup(&SecretStore::empty(), env);
        assert_eq!(config.api_key.as_deref(), Some("second"));
    }

    #[test]
    fn test_absent_credential_is_unauthenticated() {
        let config = ClientConfig::from_lookup(&SecretStore::empty(), env_of(&[("LLM_API_KEY", "  ")]));
        assert!(config.api_key.is_none());
        assert_eq!(config.model, "llama4scout");
    }

    #[test]
    fn test_model_and_base_from_env() {
        let env = env_of(&[("LLM_MODEL", "qwen"), ("LLM_API_BASE", "http://gpu:9000/v1")]);
        let config = ClientConfig::from_lookup(&SecretStore::empty(), env);
        assert_eq!(config.model, "qwen");
        assert_eq!(config.endpoints[0], "http://gpu:9000/v1/chat/completions");
    }

    #[test]
    fn test_secret_store_parse_ignores_non_strings() {
        let store = SecretStore::parse("api_key = \"k\"\nretries = 3\n").unwrap();
        assert_eq!(store.get("api_key"), Some("k"));
        assert_eq!(store.get("retries"), None);
    }

    #[test]
    fn test_secret_store_load_reports_path() {
        let err = SecretStore::load(Path::new("/nonexistent/secrets.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/secrets.toml"));
    }

    #[test]
    fn test_retry_delay_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_millis(800));
        assert_eq!(policy.delay(1), Duration::from_millis(1600));
        assert_eq!(policy.delay(20), Duration::from_secs(120));
        assert!(policy.should_retry_status(503));
        assert!(!policy.should_retry_status(404));
    }
}
