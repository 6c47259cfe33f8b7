//! Connection and registry configuration.

use std::fmt;
use std::time::Duration;

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_WAIT_MAX_ATTEMPTS: u32 = 60;
const DEFAULT_WAIT_DELAY_MS: u64 = 2000;

/// How long create/delete calls poll for the table to settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_WAIT_MAX_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_WAIT_DELAY_MS),
        }
    }
}

/// Static access keys, for local endpoints that accept any credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl StaticCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .finish()
    }
}

/// Registry configuration.
///
/// Endpoint, region and credentials are handed to the SDK loader as-is;
/// anything left unset falls back to the SDK's default chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Custom endpoint URL (for local DynamoDB).
    pub endpoint_url: Option<String>,
    pub region: String,
    pub credentials: Option<StaticCredentials>,
    /// Prepended to every table name the registry resolves.
    pub table_prefix: Option<String>,
    pub wait: WaitConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            region: DEFAULT_REGION.to_string(),
            credentials: None,
            table_prefix: None,
            wait: WaitConfig::default(),
        }
    }
}

impl Config {
    /// Reads configuration from the environment.
    ///
    /// - `AWS_ENDPOINT_URL`: custom endpoint
    /// - `AWS_REGION`: region (defaults to `us-east-1`)
    /// - `DYNAMESA_TABLE_PREFIX`: table name prefix
    /// - `DYNAMESA_WAIT_MAX_ATTEMPTS`, `DYNAMESA_WAIT_DELAY_MS`: table wait polling
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = WaitConfig::default();
        let max_attempts = parse_or(&lookup, "DYNAMESA_WAIT_MAX_ATTEMPTS", defaults.max_attempts);
        let delay_ms = parse_or(&lookup, "DYNAMESA_WAIT_DELAY_MS", DEFAULT_WAIT_DELAY_MS);

        Self {
            endpoint_url: lookup("AWS_ENDPOINT_URL").filter(|s| !s.is_empty()),
            region: lookup("AWS_REGION")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            credentials: None,
            table_prefix: lookup("DYNAMESA_TABLE_PREFIX").filter(|s| !s.is_empty()),
            wait: WaitConfig {
                max_attempts,
                delay: Duration::from_millis(delay_ms),
            },
        }
    }

    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_credentials(mut self, credentials: StaticCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = Some(prefix.into());
        self
    }

    pub fn with_wait(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    /// Returns a display string for the target environment.
    pub fn target_display(&self) -> String {
        match &self.endpoint_url {
            Some(url) => format!("Local DynamoDB ({})", url),
            None => format!("AWS DynamoDB (region: {})", self.region),
        }
    }
}

fn parse_or<T: std::str::FromStr + Copy + fmt::Display>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> T {
    match lookup(name) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(var = name, value = %raw, %default, "Ignoring invalid value");
                default
            }
        },
        None => default,
    }
}
