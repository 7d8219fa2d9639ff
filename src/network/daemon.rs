//! Reachability check and best-effort launch of the local daemon.
//!
//! `start_daemon` is a convenience for development machines. On real hosts
//! the daemon should be run by a service manager.

use std::thread;

use tracing::{info, warn};

use crate::cli::CommandRunner;
use crate::config::ClientConfig;
use crate::error::{Result, ZtError};

/// Succeeds if `status` can be queried. Any failure, whether the daemon is
/// down, the auth token is unreadable or the CLI is missing, is reported as
/// [`ZtError::DaemonUnreachable`].
pub fn ping_daemon<R: CommandRunner>(runner: &R) -> Result<()> {
    runner
        .run_json(&["status"])
        .map(|_| ())
        .map_err(ZtError::unreachable)
}

/// Launch the daemon unless it already answers, then give it one grace
/// period and ping once more.
pub fn start_daemon<R: CommandRunner>(runner: &R, config: &ClientConfig) -> Result<()> {
    match ping_daemon(runner) {
        Ok(()) => return Ok(()),
        Err(e) => warn!(error = ?e, "zerotier daemon not reachable, launching it"),
    }

    info!(binary = %config.daemon_binary.display(), "starting zerotier daemon");
    runner.spawn_daemon(&config.daemon_binary)?;

    thread::sleep(config.startup_grace);
    ping_daemon(runner)
}
