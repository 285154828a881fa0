use std::env;
use std::time::Duration;

use log::warn;

pub const ENV_URL: &str = "MONGODB_URL";
pub const ENV_READ_ONLY: &str = "MONGODB_READ_ONLY";
pub const ENV_TIMEOUT_MS: &str = "MONGODB_TIMEOUT_MS";

pub const DEFAULT_URL: &str = "mongodb://localhost:27017";
pub const DEFAULT_TIMEOUT_MS: i64 = 5000;

/// Read a string variable, falling back to `default` when absent.
pub fn env_str(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read a boolean variable. Exactly the literal "true" is true; any other
/// present value is false. Absent falls back to `default`.
pub fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => value == "true",
        Err(_) => default,
    }
}

/// Read a base-10 integer variable. Absent or malformed values fall back to
/// `default`; malformed ones are logged.
pub fn env_int(key: &str, default: i64) -> i64 {
    match env::var(key) {
        Ok(raw) => match raw.parse::<i64>() {
            Ok(value) => value,
            Err(_) => {
                warn!("ignoring malformed integer in {key}: {raw:?}");
                default
            }
        },
        Err(_) => default,
    }
}

/// Service configuration
///
/// Carries the connection target and the few knobs the service honors.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Connection string of the document store
    pub url: String,

    /// Budget for one connection attempt
    pub connect_timeout: Duration,

    /// When set, every mutating operation is rejected
    pub read_only: bool,
}

impl ServiceConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            connect_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS as u64),
            read_only: false,
        }
    }

    /// Set the connection attempt timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enable or disable read-only mode
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Resolve configuration from the environment:
    /// `MONGODB_URL`, `MONGODB_TIMEOUT_MS`, `MONGODB_READ_ONLY`.
    pub fn from_env() -> Self {
        let timeout_ms = env_int(ENV_TIMEOUT_MS, DEFAULT_TIMEOUT_MS).max(0) as u64;
        Self {
            url: env_str(ENV_URL, DEFAULT_URL),
            connect_timeout: Duration::from_millis(timeout_ms),
            read_only: env_bool(ENV_READ_ONLY, false),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new(DEFAULT_URL)
    }
}
