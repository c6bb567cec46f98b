use serde::Deserialize;

/// Main configuration structure for quotegrab
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub harvester: HarvesterConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
}

/// Harvester behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HarvesterConfig {
    /// Absolute address of the first listing page
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Delay between page fetches (seconds); floor enforced at validation
    #[serde(rename = "page-delay-secs", default = "default_page_delay")]
    pub page_delay_secs: u64,

    /// Bound on how long a single page fetch may take (seconds)
    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Optional ceiling on pages per run, guarding against misbehaving
    /// "next" links. Unset means unbounded.
    #[serde(rename = "max-pages")]
    pub max_pages: Option<u32>,
}

/// Retry policy for the fetch wrapper
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total fetch attempts per page (1 = single attempt, no retry)
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts (milliseconds)
    #[serde(rename = "backoff-ms", default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name sent in the User-Agent header
    pub name: String,

    /// Version sent in the User-Agent header
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

fn default_page_delay() -> u64 {
    2
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    1
}

fn default_backoff_ms() -> u64 {
    500
}
