//! Runtime configuration.
//!
//! Values come from a mode-specific env file (`.env.production` or
//! `.env.development`) overlaid with the process environment. Loading never
//! fails: anything missing or unparseable falls back to its default.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

/// Variable that selects the running mode.
pub const MODE_VAR: &str = "APP_ENV";

pub const BACKEND_BASE_URL: &str = "BACKEND_BASE_URL";
pub const BACKEND_API_TOKEN: &str = "BACKEND_API_TOKEN";
pub const BFF_PORT: &str = "BFF_PORT";
pub const BFF_DEV_AUTH_HEADER_NAME: &str = "BFF_DEV_AUTH_HEADER_NAME";
pub const BFF_DEV_AUTH_TOKEN: &str = "BFF_DEV_AUTH_TOKEN";
pub const BFF_CONNECT_TIMEOUT_SECS: &str = "BFF_CONNECT_TIMEOUT_SECS";
pub const BFF_UPSTREAM_TIMEOUT_SECS: &str = "BFF_UPSTREAM_TIMEOUT_SECS";
pub const BFF_IDLE_TIMEOUT_SECS: &str = "BFF_IDLE_TIMEOUT_SECS";

const KNOWN_VARS: [&str; 8] = [
    BACKEND_BASE_URL,
    BACKEND_API_TOKEN,
    BFF_PORT,
    BFF_DEV_AUTH_HEADER_NAME,
    BFF_DEV_AUTH_TOKEN,
    BFF_CONNECT_TIMEOUT_SECS,
    BFF_UPSTREAM_TIMEOUT_SECS,
    BFF_IDLE_TIMEOUT_SECS,
];

pub const DEFAULT_BACKEND_BASE_URL: &str = "http://localhost:7071";
pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_DEV_AUTH_HEADER_NAME: &str = "x-admin-ui-token";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;

/// Running mode. Only selects which env file is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Development,
    Production,
}

impl Mode {
    /// `"production"` (any case) is production; everything else is development.
    pub fn from_str_lossy(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("production") {
            Mode::Production
        } else {
            Mode::Development
        }
    }

    pub fn from_env() -> Self {
        std::env::var(MODE_VAR)
            .map(|v| Self::from_str_lossy(&v))
            .unwrap_or_default()
    }

    pub fn env_file(self) -> &'static str {
        match self {
            Mode::Development => ".env.development",
            Mode::Production => ".env.production",
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub mode: Mode,
    /// Backend base URL as configured, echoed by the health endpoint.
    pub backend_base_url: String,
    /// Parsed form of `backend_base_url`.
    pub backend_url: Url,
    /// Injected as `auth-token` when the caller sends none. Empty: no injection.
    pub backend_api_token: String,
    pub port: u16,
    /// Lower-cased gate header name.
    pub dev_auth_header_name: String,
    /// Shared secret for the gate. Empty: gate disabled.
    pub dev_auth_token: String,
    pub connect_timeout: Duration,
    pub upstream_timeout: Duration,
    /// How long a client connection may sit without sending a request.
    pub idle_timeout: Duration,
}

impl Config {
    /// Loads the env file for `mode` from the working directory.
    pub fn load(mode: Mode) -> Self {
        Self::load_from(mode, Path::new(mode.env_file()))
    }

    /// Loads `path`, letting process environment variables take precedence.
    pub fn load_from(mode: Mode, path: &Path) -> Self {
        Self::load_with(mode, path, |key| std::env::var(key).ok())
    }

    /// Loads `path`, overlaying whatever `lookup` returns for each known key.
    pub fn load_with<F>(mode: Mode, path: &Path, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut vars = read_env_file(path);
        for key in KNOWN_VARS {
            if let Some(value) = lookup(key) {
                vars.insert(key.to_string(), value);
            }
        }
        Self::from_vars(mode, vars)
    }

    /// Builds a configuration from raw key/value pairs, applying defaults.
    pub fn from_vars<I, K, V>(mode: Mode, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        let (backend_base_url, backend_url) = match get(BACKEND_BASE_URL) {
            Some(raw) => match Url::parse(raw) {
                Ok(url) if url.has_host() => (raw.to_string(), url),
                Ok(_) => {
                    warn!(value = raw, "{} has no host, using default", BACKEND_BASE_URL);
                    default_backend()
                }
                Err(e) => {
                    warn!(value = raw, error = %e, "Invalid {}, using default", BACKEND_BASE_URL);
                    default_backend()
                }
            },
            None => default_backend(),
        };

        let port = parse_or(get(BFF_PORT), BFF_PORT, DEFAULT_PORT);

        let dev_auth_header_name = get(BFF_DEV_AUTH_HEADER_NAME)
            .unwrap_or(DEFAULT_DEV_AUTH_HEADER_NAME)
            .to_ascii_lowercase();

        let connect_timeout = Duration::from_secs(positive_or(
            get(BFF_CONNECT_TIMEOUT_SECS),
            BFF_CONNECT_TIMEOUT_SECS,
            DEFAULT_CONNECT_TIMEOUT_SECS,
        ));
        let upstream_timeout = Duration::from_secs(positive_or(
            get(BFF_UPSTREAM_TIMEOUT_SECS),
            BFF_UPSTREAM_TIMEOUT_SECS,
            DEFAULT_UPSTREAM_TIMEOUT_SECS,
        ));
        let idle_timeout = Duration::from_secs(positive_or(
            get(BFF_IDLE_TIMEOUT_SECS),
            BFF_IDLE_TIMEOUT_SECS,
            DEFAULT_IDLE_TIMEOUT_SECS,
        ));

        Self {
            mode,
            backend_base_url,
            backend_url,
            backend_api_token: get(BACKEND_API_TOKEN).unwrap_or_default().to_string(),
            port,
            dev_auth_header_name,
            dev_auth_token: get(BFF_DEV_AUTH_TOKEN).unwrap_or_default().to_string(),
            connect_timeout,
            upstream_timeout,
            idle_timeout,
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    pub fn gate_enabled(&self) -> bool {
        !self.dev_auth_token.is_empty()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_vars(Mode::Development, std::iter::empty::<(String, String)>())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("mode", &self.mode)
            .field("backend_base_url", &self.backend_base_url)
            .field("backend_api_token", &redact(&self.backend_api_token))
            .field("port", &self.port)
            .field("dev_auth_header_name", &self.dev_auth_header_name)
            .field("dev_auth_token", &redact(&self.dev_auth_token))
            .field("connect_timeout", &self.connect_timeout)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "<unset>" } else { "<redacted>" }
}

fn default_backend() -> (String, Url) {
    let url = Url::parse(DEFAULT_BACKEND_BASE_URL).expect("default backend URL is valid");
    (DEFAULT_BACKEND_BASE_URL.to_string(), url)
}

fn parse_or<T: std::str::FromStr + Copy>(raw: Option<&str>, key: &str, default: T) -> T {
    match raw {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(value = raw, "Invalid {}, using default", key);
            default
        }),
        None => default,
    }
}

fn positive_or(raw: Option<&str>, key: &str, default: u64) -> u64 {
    match parse_or(raw, key, default) {
        0 => {
            warn!("{} must be positive, using default", key);
            default
        }
        secs => secs,
    }
}

fn read_env_file(path: &Path) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    match dotenvy::from_path_iter(path) {
        Ok(entries) => {
            for entry in entries {
                match entry {
                    Ok((key, value)) => {
                        vars.insert(key, value);
                    }
                    Err(e) => {
                        warn!(file = %path.display(), error = %e, "Skipping malformed env file entry");
                    }
                }
            }
            debug!(file = %path.display(), entries = vars.len(), "Loaded env file");
        }
        Err(e) if e.not_found() => {
            debug!(file = %path.display(), "Env file not found, using defaults");
        }
        Err(e) => {
            warn!(file = %path.display(), error = %e, "Could not read env file, using defaults");
        }
    }

    vars
}
