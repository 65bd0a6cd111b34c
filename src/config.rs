use crate::error::ConfigError;
use crate::normalize::AirportMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Timeouts for every blocking call a run makes
pub mod timeouts {
    use std::time::Duration;

    pub const NAVIGATION: Duration = Duration::from_secs(60);
    pub const HTTP: Duration = Duration::from_secs(30);
    pub const ELEMENT_WAIT: Duration = Duration::from_secs(5);
    pub const AJAX_SETTLE: Duration = Duration::from_millis(3000);
    pub const DROPDOWN_SETTLE: Duration = Duration::from_millis(500);
    pub const SCROLL_SETTLE: Duration = Duration::from_millis(1500);
    pub const BANNER_SETTLE: Duration = Duration::from_millis(1000);
}

/// Credentials for the hosted data store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub key: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` only for dry runs
    pub store: Option<StoreConfig>,
    pub airport_map: Option<PathBuf>,
    pub canonicalize_airports: bool,
    pub headless: bool,
    pub request_delay: Duration,
    pub k9_ajax_min_results: usize,
    pub max_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: None,
            airport_map: None,
            canonicalize_airports: false,
            headless: true,
            request_delay: Duration::from_millis(1500),
            // More than one page of cards means the filters really worked
            k9_ajax_min_results: 101,
            max_attempts: 3,
        }
    }
}

impl Config {
    /// Read configuration from the environment (and `.env` if present).
    /// Missing store credentials are fatal unless `require_store` is false.
    pub fn from_env(require_store: bool) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok(), require_store)
    }

    pub fn from_lookup<F>(lookup: F, require_store: bool) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let store = match (var("SUPABASE_URL"), var("SUPABASE_KEY")) {
            (Some(url), Some(key)) => Some(StoreConfig { url, key }),
            (None, _) if require_store => return Err(ConfigError::Missing("SUPABASE_URL")),
            (_, None) if require_store => return Err(ConfigError::Missing("SUPABASE_KEY")),
            _ => None,
        };

        Ok(Self {
            store,
            airport_map: var("AIRPORT_MAP").map(PathBuf::from),
            canonicalize_airports: parse_or(
                "CANONICALIZE_AIRPORTS",
                var("CANONICALIZE_AIRPORTS"),
                parse_bool,
                defaults.canonicalize_airports,
            )?,
            headless: parse_or(
                "SCRAPER_HEADLESS",
                var("SCRAPER_HEADLESS"),
                parse_bool,
                defaults.headless,
            )?,
            request_delay: parse_or(
                "REQUEST_DELAY_MS",
                var("REQUEST_DELAY_MS"),
                |v| v.parse().ok().map(Duration::from_millis),
                defaults.request_delay,
            )?,
            k9_ajax_min_results: parse_or(
                "K9_AJAX_MIN_RESULTS",
                var("K9_AJAX_MIN_RESULTS"),
                |v| v.parse().ok(),
                defaults.k9_ajax_min_results,
            )?,
            max_attempts: parse_or(
                "MAX_ATTEMPTS",
                var("MAX_ATTEMPTS"),
                |v| v.parse().ok().filter(|n| *n > 0),
                defaults.max_attempts,
            )?,
        })
    }

    /// Built-in airport table, plus the override file when one is configured
    pub fn airports(&self) -> Result<AirportMap, ConfigError> {
        match &self.airport_map {
            Some(path) => AirportMap::load_with_overrides(path),
            None => AirportMap::builtin(),
        }
    }
}

fn parse_or<T, F>(
    key: &'static str,
    raw: Option<String>,
    parse: F,
    default: T,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<T>,
{
    match raw {
        None => Ok(default),
        Some(value) => parse(&value).ok_or(ConfigError::Invalid { key, value }),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
