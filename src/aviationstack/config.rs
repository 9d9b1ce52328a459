//! Client configuration, read once from the environment at startup.

use std::env;
use std::str::FromStr;

use log::warn;

use super::error::ErrorPayload;

pub const ENV_API_KEY: &str = "AVIATIONSTACK_API_KEY";
pub const ENV_BASE_URL: &str = "AVIATIONSTACK_BASE_URL";
pub const ENV_TIMEOUT_SECONDS: &str = "AVIATIONSTACK_TIMEOUT_SECONDS";
pub const ENV_MAX_RETRIES: &str = "AVIATIONSTACK_MAX_RETRIES";
pub const ENV_BACKOFF_SECONDS: &str = "AVIATIONSTACK_RETRY_BACKOFF_SECONDS";

pub const DEFAULT_BASE_URL: &str = "http://api.aviationstack.com/v1/";
pub const DEFAULT_TIMEOUT_SECONDS: f64 = 10.0;
pub const DEFAULT_MAX_RETRIES: usize = 2;
pub const DEFAULT_BACKOFF_SECONDS: f64 = 0.5;

/// Immutable configuration for one [`super::AviationstackClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Required API credential, injected as the `access_key` query parameter.
    pub api_key: String,
    /// Endpoint names are appended to this URL.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_seconds: f64,
    /// Retries allowed after the initial attempt.
    pub max_retries: usize,
    /// Base backoff interval; retry N sleeps `backoff * 2^(N-1)` seconds.
    pub backoff_seconds: f64,
}

impl ClientConfig {
    /// Configuration with the documented defaults for everything but the key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_seconds: DEFAULT_BACKOFF_SECONDS,
        }
    }

    /// Reads the configuration from process environment variables.
    ///
    /// Fails with a `missing_api_key` payload when the credential is absent.
    /// Every other variable is optional; unparseable values fall back to
    /// their defaults with a warning.
    pub fn from_env() -> Result<Self, ErrorPayload> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Environment lookup is injectable so tests never mutate process state.
    pub(crate) fn from_lookup(
        get: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ErrorPayload> {
        let api_key = get(ENV_API_KEY)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ErrorPayload::missing_api_key(ENV_API_KEY))?;

        Ok(Self {
            api_key,
            base_url: get(ENV_BASE_URL).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout_seconds: parse_or_default(
                ENV_TIMEOUT_SECONDS,
                get(ENV_TIMEOUT_SECONDS),
                DEFAULT_TIMEOUT_SECONDS,
            ),
            max_retries: parse_or_default(
                ENV_MAX_RETRIES,
                get(ENV_MAX_RETRIES),
                DEFAULT_MAX_RETRIES,
            ),
            backoff_seconds: parse_or_default(
                ENV_BACKOFF_SECONDS,
                get(ENV_BACKOFF_SECONDS),
                DEFAULT_BACKOFF_SECONDS,
            ),
        })
    }
}

fn parse_or_default<T>(name: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + PartialOrd + Default + Copy,
{
    let Some(raw) = raw else {
        return default;
    };
    match raw.parse::<T>() {
        Ok(value) if value >= T::default() => value,
        _ => {
            warn!("Ignoring invalid value for {}: {:?}", name, raw);
            default
        }
    }
}
