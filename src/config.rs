//! Endpoint and retry configuration

use std::{fmt::Display, str::FromStr, time::Duration};

use snafu::prelude::*;

use crate::ws::BackoffPolicy;

static DEFAULT_WS_URL: &str = "ws://localhost:3000";
static DEFAULT_API_URL: &str = "http://localhost:3000";
static DEFAULT_VEHICLES_PATH: &str = "/api/vehicles";
static DEFAULT_ALERTS_PATH: &str = "/api/alerts";

/// Parse string as telemetry endpoint error
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(parse_endpoint_error), context(suffix(false)))]
pub enum ParseEndpointError {
    #[snafu(display("{s} is an invalid url: {source}"))]
    /// the str is not a valid url
    InvalidURL {
        /// string be parsed
        s: String,
        /// source error
        source: url::ParseError,
    },

    /// the parsed url schema is not websocket
    #[snafu(display("the url {s} has invalid schema {schema}, only ws or wss is ok"))]
    InvalidSchema {
        /// the url
        s: String,
        /// invalid schema
        schema: String,
    },

    /// the parsed url has no host
    #[snafu(display("the endpoint url {s} has no host"))]
    NoHost {
        /// the url
        s: String,
    },
}

/// Telemetry websocket endpoint.
///
/// The bearer token travels as the `token` query parameter, since the websocket
/// handshake carries no custom headers from mobile clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: url::Url,
}

impl Endpoint {
    /// endpoint url without token
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// construct the url of one connection attempt
    pub fn url_with_token(&self, token: &str) -> url::Url {
        let mut u = self.url.clone();
        let kept: Vec<(String, String)> = self
            .url
            .query_pairs()
            .filter(|(k, _)| k != "token")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        u.set_query(None);
        {
            let mut query = u.query_pairs_mut();
            for (k, v) in kept.iter() {
                query.append_pair(k, v);
            }
            query.append_pair("token", token);
        }

        u
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            url: url::Url::parse(DEFAULT_WS_URL).unwrap_or_else(|_| unreachable!()),
        }
    }
}

impl FromStr for Endpoint {
    type Err = ParseEndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = url::Url::parse(s)
            .with_context(|_| parse_endpoint_error::InvalidURL { s: s.to_string() })?;

        ensure!(
            url.scheme() == "wss" || url.scheme() == "ws",
            parse_endpoint_error::InvalidSchema {
                s,
                schema: url.scheme(),
            }
        );

        ensure!(url.host().is_some(), parse_endpoint_error::NoHost { s });

        Ok(Self { url })
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.url.fmt(f)
    }
}

/// Error when load configuration
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(config_error), context(suffix(false)))]
pub enum ConfigError {
    /// websocket endpoint variable is invalid
    #[snafu(display("invalid websocket endpoint in {var}: {source}"))]
    InvalidEndpoint {
        /// variable name
        var: String,
        /// source error
        source: ParseEndpointError,
    },

    /// REST base url variable is invalid
    #[snafu(display("invalid api url {value} in {var}: {source}"))]
    InvalidApiURL {
        /// variable name
        var: String,
        /// received value
        value: String,
        /// source error
        source: url::ParseError,
    },

    /// numeric variable is invalid
    #[snafu(display("invalid number {value} in {var}: {source}"))]
    InvalidNumber {
        /// variable name
        var: String,
        /// received value
        value: String,
        /// source error
        source: std::num::ParseIntError,
    },
}

/// REST api location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// base url, e.g. `http://localhost:3000`
    pub base_url: url::Url,
    /// path of the vehicle listing
    pub vehicles_path: String,
    /// path of the active alert listing
    pub alerts_path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: url::Url::parse(DEFAULT_API_URL).unwrap_or_else(|_| unreachable!()),
            vehicles_path: DEFAULT_VEHICLES_PATH.to_string(),
            alerts_path: DEFAULT_ALERTS_PATH.to_string(),
        }
    }
}

impl ApiConfig {
    /// full url of `path` under the base url
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Everything needed to run a [`Session`](crate::Session)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// telemetry websocket endpoint
    pub endpoint: Endpoint,
    /// REST api for the baseline
    pub api: ApiConfig,
    /// reconnect policy
    pub backoff: BackoffPolicy,
}

/// websocket endpoint url, e.g. `wss://fleet.example.com/live`
pub const ENV_WS_URL: &str = "FLEETLINK_WS_URL";
/// websocket host, used as `ws://<host>` when no url is given
pub const ENV_WS_HOST: &str = "FLEETLINK_WS_HOST";
/// REST base url
pub const ENV_API_URL: &str = "FLEETLINK_API_URL";
/// attempt ceiling
pub const ENV_MAX_ATTEMPTS: &str = "FLEETLINK_MAX_ATTEMPTS";
/// base backoff delay in milliseconds
pub const ENV_BASE_DELAY_MS: &str = "FLEETLINK_BASE_DELAY_MS";
/// maximum backoff delay in milliseconds
pub const ENV_MAX_DELAY_MS: &str = "FLEETLINK_MAX_DELAY_MS";
/// transport open timeout in milliseconds
pub const ENV_CONNECT_TIMEOUT_MS: &str = "FLEETLINK_CONNECT_TIMEOUT_MS";

impl Config {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from any variable source. Unset or empty variables keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get(ENV_WS_URL) {
            config.endpoint = url
                .parse()
                .context(config_error::InvalidEndpoint { var: ENV_WS_URL })?;
        } else if let Some(host) = get(ENV_WS_HOST) {
            config.endpoint = format!("ws://{}", host)
                .parse()
                .context(config_error::InvalidEndpoint { var: ENV_WS_HOST })?;
        }

        if let Some(value) = get(ENV_API_URL) {
            config.api.base_url =
                url::Url::parse(&value).with_context(|_| config_error::InvalidApiURL {
                    var: ENV_API_URL,
                    value: &value,
                })?;
        }

        let number = |var: &'static str| -> Result<Option<u64>, ConfigError> {
            get(var)
                .map(|value| {
                    value
                        .trim()
                        .parse::<u64>()
                        .with_context(|_| config_error::InvalidNumber { var, value: &value })
                })
                .transpose()
        };

        if let Some(n) = number(ENV_MAX_ATTEMPTS)? {
            config.backoff.max_attempts = u32::try_from(n).unwrap_or(u32::MAX);
        }
        if let Some(ms) = number(ENV_BASE_DELAY_MS)? {
            config.backoff.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = number(ENV_MAX_DELAY_MS)? {
            config.backoff.max_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = number(ENV_CONNECT_TIMEOUT_MS)? {
            config.backoff.connect_timeout = Duration::from_millis(ms);
        }

        Ok(config)
    }
}
