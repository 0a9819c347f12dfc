use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::RiskCheckError;

const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000/api/consulta";
const DEFAULT_FIXTURE_PATH: &str = "data/GUSTAVOBOLIVAR.json";

/// Application configuration, loaded once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    // Consultation backend
    pub backend_url: String,
    pub request_timeout: Duration,

    /// Answer every query with a fixed notice instead of calling the backend.
    pub mock_mode: bool,

    /// JSON file served for the demo identity.
    pub fixture_path: PathBuf,

    // Web server
    pub web_host: String,
    pub web_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout: Duration::from_secs(60),
            mock_mode: false,
            fixture_path: PathBuf::from(DEFAULT_FIXTURE_PATH),
            web_host: "0.0.0.0".to_string(),
            web_port: 3000,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, RiskCheckError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. `from_env` is a thin wrapper over this.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RiskCheckError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let backend_url = lookup("RISKCHECK_BACKEND_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.backend_url);

        let request_timeout = match lookup("RISKCHECK_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number("RISKCHECK_TIMEOUT_SECS", &raw)?),
            None => defaults.request_timeout,
        };

        let mock_mode = lookup("RISKCHECK_USE_MOCK")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(defaults.mock_mode);

        let fixture_path = lookup("RISKCHECK_FIXTURE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.fixture_path);

        let web_host = lookup("WEB_HOST").unwrap_or(defaults.web_host);
        let web_port = match lookup("WEB_PORT") {
            Some(raw) => parse_number("WEB_PORT", &raw)?,
            None => defaults.web_port,
        };

        Ok(Self {
            backend_url,
            request_timeout,
            mock_mode,
            fixture_path,
            web_host,
            web_port,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, RiskCheckError> {
    raw.trim()
        .parse()
        .map_err(|_| RiskCheckError::Config(format!("{key} must be a number, got {raw:?}")))
}
