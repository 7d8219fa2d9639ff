//! Client configuration. Every path, URL and interval the client depends on
//! lives here and is handed to constructors explicitly.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::{Result, ZtError};

pub const DEFAULT_CLI_PROGRAM: &str = "zerotier-cli";
pub const DEFAULT_DAEMON_BINARY: &str = "/var/lib/zerotier-one/zerotier-one";
pub const DEFAULT_CONTROLLER_URL: &str = "https://my.zerotier.com/api";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Program invoked as `<cli_program> -j <subcommand>`.
    pub cli_program: PathBuf,
    /// Daemon executable launched by `Endpoint::start_daemon`.
    pub daemon_binary: PathBuf,
    /// Base of the controller API; `/network/{id}/member/{addr}` is appended.
    pub controller_url: Url,
    /// Cadence of the address-wait loop.
    pub poll_interval: Duration,
    /// How long to give a freshly launched daemon before pinging it again.
    pub startup_grace: Duration,
    pub http_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cli_program: PathBuf::from(DEFAULT_CLI_PROGRAM),
            daemon_binary: PathBuf::from(DEFAULT_DAEMON_BINARY),
            controller_url: default_controller_url(),
            poll_interval: Duration::from_secs(1),
            startup_grace: Duration::from_secs(1),
            http_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `ZT_*` environment variables.
    ///
    /// A variable that is set but cannot be parsed is an error rather than
    /// falling back to the default.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(program) = lookup("ZT_CLI") {
            config.cli_program = PathBuf::from(program);
        }
        if let Some(binary) = lookup("ZT_DAEMON_BIN") {
            config.daemon_binary = PathBuf::from(binary);
        }
        if let Some(raw) = lookup("ZT_CONTROLLER_URL") {
            config.controller_url = Url::parse(&raw).map_err(|_| ZtError::Config {
                key: "ZT_CONTROLLER_URL",
                value: raw.clone(),
            })?;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "ZT_POLL_INTERVAL_MS")? {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "ZT_STARTUP_GRACE_MS")? {
            config.startup_grace = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "ZT_HTTP_TIMEOUT_SECS")? {
            config.http_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ZtError::Config { key, value: raw }),
        None => Ok(None),
    }
}

fn default_controller_url() -> Url {
    match Url::parse(DEFAULT_CONTROLLER_URL) {
        Ok(url) => url,
        Err(e) => unreachable!("built-in controller url is valid: {e}"),
    }
}
