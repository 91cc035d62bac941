use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// Environment variables the engine honors.
pub struct EnvVars;

impl EnvVars {
    /// Overrides the per-user base directory (default `~/.claude`).
    pub const CLAUDE_HOME: &'static str = "CLAUDE_HOME";
    /// Comma-separated hosts appended to the built-in URL allowlist.
    pub const CLAUDE_CATALOG_URL_ALLOWLIST: &'static str = "CLAUDE_CATALOG_URL_ALLOWLIST";
    /// Total per-download timeout, in milliseconds.
    pub const CLAUDE_HTTP_TIMEOUT_MS: &'static str = "CLAUDE_HTTP_TIMEOUT_MS";
    /// Size cap for a single catalog YAML file, in bytes.
    pub const CLAUDE_MAX_CATALOG_BYTES: &'static str = "CLAUDE_MAX_CATALOG_BYTES";
}

/// Engine configuration, explicit and owned: there is no process-global
/// state, so two engines with different settings can coexist.
#[derive(Debug, Clone)]
pub struct Settings {
    /// The per-user base directory resources are installed under.
    pub claude_home: PathBuf,
    /// Hosts allowed in addition to the built-in allowlist.
    pub extra_allowed_hosts: Vec<String>,
    /// Total timeout for one download.
    pub http_timeout: Duration,
    /// Size cap for a single catalog file.
    pub max_catalog_bytes: u64,
    /// Size cap for a single downloaded resource.
    pub max_download_bytes: u64,
    /// Retry budget for transient network failures.
    pub retries: u32,
    /// Default parallelism for batch installs.
    pub install_parallelism: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            claude_home: default_claude_home(),
            extra_allowed_hosts: Vec::new(),
            http_timeout: Duration::from_secs(60),
            max_catalog_bytes: 1024 * 1024,
            max_download_bytes: 10 * 1024 * 1024,
            retries: 3,
            install_parallelism: 4,
        }
    }
}

impl Settings {
    /// Defaults, overridden by the [`EnvVars`] environment variables.
    /// Unparseable values are warned about and ignored.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(home) = std::env::var(EnvVars::CLAUDE_HOME) {
            if !home.trim().is_empty() {
                settings.claude_home = PathBuf::from(home);
            }
        }
        if let Ok(hosts) = std::env::var(EnvVars::CLAUDE_CATALOG_URL_ALLOWLIST) {
            settings.extra_allowed_hosts = hosts
                .split(',')
                .map(|host| host.trim().to_string())
                .filter(|host| !host.is_empty())
                .collect();
        }
        if let Some(millis) = parse_env_u64(EnvVars::CLAUDE_HTTP_TIMEOUT_MS) {
            settings.http_timeout = Duration::from_millis(millis);
        }
        if let Some(bytes) = parse_env_u64(EnvVars::CLAUDE_MAX_CATALOG_BYTES) {
            settings.max_catalog_bytes = bytes;
        }
        settings
    }
}

fn default_claude_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".claude")
}

fn parse_env_u64(name: &str) -> Option<u64> {
    let value = std::env::var(name).ok()?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("Ignoring unparseable `{name}`: `{value}`");
            None
        }
    }
}
