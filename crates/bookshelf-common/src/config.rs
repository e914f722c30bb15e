use std::time::Duration;

use crate::error::ConfigError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_MAX_ERROR_BODY_BYTES: usize = 8 * 1024;
const ENDPOINT_PATH: &str = "/process-image/";

/// Connection settings for the recommendation service.
///
/// Constructed once and handed to [`crate::RecommendationClient::new`]; nothing
/// in this crate reads process-wide state after that point.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Service origin without the endpoint path, e.g. "https://recommender.example".
    pub base_url: String,
    /// Bound on establishing the TCP/TLS connection.
    pub connect_timeout: Duration,
    /// Bound on each read from the socket, reset after every successful read.
    pub read_timeout: Duration,
    /// Budget for sending the multipart body. reqwest has no write-phase timer,
    /// so this only widens the whole-request ceiling: a stalled write is cut off
    /// at `connect + write + read` (180 s with the defaults), not at this value.
    pub write_timeout: Duration,
    pub user_agent: String,
    /// Non-2xx bodies are truncated to this many bytes before being reported.
    pub max_error_body_bytes: usize,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            connect_timeout: DEFAULT_TIMEOUT,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            user_agent: format!("bookshelf-recommender/{}", env!("CARGO_PKG_VERSION")),
            max_error_body_bytes: DEFAULT_MAX_ERROR_BODY_BYTES,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `BOOKSHELF_BASE_URL`: service origin
    ///
    /// Optional (unparsable values fall back to the defaults):
    /// - `BOOKSHELF_CONNECT_TIMEOUT_SECS`, `BOOKSHELF_READ_TIMEOUT_SECS`,
    ///   `BOOKSHELF_WRITE_TIMEOUT_SECS`: per-phase timeouts, default 60
    /// - `BOOKSHELF_MAX_ERROR_BODY_BYTES`: default 8192
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("BOOKSHELF_BASE_URL")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("BOOKSHELF_BASE_URL"))?;

        let secs = |key: &str| {
            lookup(key)
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT)
        };

        let max_error_body_bytes = lookup("BOOKSHELF_MAX_ERROR_BODY_BYTES")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_ERROR_BODY_BYTES);

        Ok(Self {
            connect_timeout: secs("BOOKSHELF_CONNECT_TIMEOUT_SECS"),
            read_timeout: secs("BOOKSHELF_READ_TIMEOUT_SECS"),
            write_timeout: secs("BOOKSHELF_WRITE_TIMEOUT_SECS"),
            max_error_body_bytes,
            ..Self::new(base_url.trim())
        })
    }

    pub fn with_timeouts(mut self, connect: Duration, read: Duration, write: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self.write_timeout = write;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, ENDPOINT_PATH)
    }

    /// Upper bound for one upload: every phase running to its limit.
    pub fn request_ceiling(&self) -> Duration {
        self.connect_timeout + self.write_timeout + self.read_timeout
    }
}
