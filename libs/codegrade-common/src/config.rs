// Engine-level configuration, read from the environment
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_PREFIX: &str = "CODEGRADE";

/// Credentials for the remote execution API. Only the remote runner reads these.
#[derive(Clone, Serialize, Deserialize)]
pub struct RemoteCredentials {
    pub login_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_remote_timeout_ms")]
    pub request_timeout_ms: u64,
}

// Secrets stay out of logs
impl std::fmt::Debug for RemoteCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCredentials")
            .field("login_url", &self.login_url)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("api_version", &self.api_version)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish_non_exhaustive()
    }
}

fn default_api_version() -> String {
    "v59.0".to_string()
}

fn default_remote_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub max_concurrent_executions: usize,
    pub compile_timeout_ms: u64,
    pub execution_timeout_ms: u64,
    pub execution_root_dir: PathBuf,
    pub cleanup_retention_ms: u64,
    pub cleanup_interval_ms: u64,
    /// Delay between producing a response and deleting its workspace
    pub cleanup_delay_ms: u64,
    /// Tracked process groups alive longer than this are killed by the sweep
    pub stray_process_age_ms: u64,
    pub max_output_bytes: usize,
    pub remote: Option<RemoteCredentials>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_executions: 5,
            compile_timeout_ms: 15_000,
            execution_timeout_ms: 8_000,
            execution_root_dir: std::env::temp_dir().join("code-runner"),
            cleanup_retention_ms: 60 * 60 * 1000,
            cleanup_interval_ms: 15 * 60 * 1000,
            cleanup_delay_ms: 1_000,
            stray_process_age_ms: 60_000,
            max_output_bytes: 1024 * 1024,
            remote: None,
        }
    }
}

impl EngineConfig {
    /// Load from `CODEGRADE_*` environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup. `from_env` is this over `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{}_{}", ENV_PREFIX, name))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();

        if let Some(v) = get("MAX_CONCURRENT") {
            config.max_concurrent_executions = parse_number("MAX_CONCURRENT", &v)?;
        }
        if let Some(v) = get("COMPILE_TIMEOUT_MS") {
            config.compile_timeout_ms = parse_number("COMPILE_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("EXECUTION_TIMEOUT_MS") {
            config.execution_timeout_ms = parse_number("EXECUTION_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("EXECUTION_ROOT") {
            config.execution_root_dir = PathBuf::from(v);
        }
        if let Some(v) = get("CLEANUP_RETENTION_MS") {
            config.cleanup_retention_ms = parse_number("CLEANUP_RETENTION_MS", &v)?;
        }
        if let Some(v) = get("CLEANUP_INTERVAL_MS") {
            config.cleanup_interval_ms = parse_number("CLEANUP_INTERVAL_MS", &v)?;
        }
        if let Some(v) = get("CLEANUP_DELAY_MS") {
            config.cleanup_delay_ms = parse_number("CLEANUP_DELAY_MS", &v)?;
        }
        if let Some(v) = get("STRAY_PROCESS_AGE_MS") {
            config.stray_process_age_ms = parse_number("STRAY_PROCESS_AGE_MS", &v)?;
        }
        if let Some(v) = get("MAX_OUTPUT_BYTES") {
            config.max_output_bytes = parse_number("MAX_OUTPUT_BYTES", &v)?;
        }

        if let Some(login_url) = get("REMOTE_LOGIN_URL") {
            let require = |name: &str| {
                get(name).with_context(|| {
                    format!("{}_{} is required when {}_REMOTE_LOGIN_URL is set", ENV_PREFIX, name, ENV_PREFIX)
                })
            };
            config.remote = Some(RemoteCredentials {
                login_url: login_url.trim_end_matches('/').to_string(),
                client_id: require("REMOTE_CLIENT_ID")?,
                client_secret: require("REMOTE_CLIENT_SECRET")?,
                username: require("REMOTE_USERNAME")?,
                password: require("REMOTE_PASSWORD")?,
                api_version: get("REMOTE_API_VERSION").unwrap_or_else(default_api_version),
                request_timeout_ms: match get("REMOTE_TIMEOUT_MS") {
                    Some(v) => parse_number("REMOTE_TIMEOUT_MS", &v)?,
                    None => default_remote_timeout_ms(),
                },
            });
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_executions == 0 {
            bail!("max_concurrent_executions must be at least 1");
        }
        if self.compile_timeout_ms == 0 || self.execution_timeout_ms == 0 {
            bail!("compile and execution timeouts must be non-zero");
        }
        if self.max_output_bytes == 0 {
            bail!("max_output_bytes must be non-zero");
        }
        Ok(())
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_millis(self.compile_timeout_ms)
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_millis(self.execution_timeout_ms)
    }

    pub fn cleanup_retention(&self) -> Duration {
        Duration::from_millis(self.cleanup_retention_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    pub fn cleanup_delay(&self) -> Duration {
        Duration::from_millis(self.cleanup_delay_ms)
    }

    pub fn stray_process_age(&self) -> Duration {
        Duration::from_millis(self.stray_process_age_ms)
    }
}

fn parse_number<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse::<T>()
        .with_context(|| format!("invalid value for {}_{}: {:?}", ENV_PREFIX, name, value))
}
