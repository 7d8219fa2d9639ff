//! The local node: its status snapshot and the network operations it can ask
//! the daemon to perform.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use ipnetwork::{IpNetwork, IpNetworkError};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::daemon;
use super::{MembershipState, Network};
use crate::cli::{CommandRunner, ZeroTierCli};
use crate::config::ClientConfig;
use crate::error::{Result, ZtError};

/// Subset of `zerotier-cli -j status`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EndpointStatus {
    /// Ten hex digit node address, also the member id on controllers.
    pub address: String,
    pub online: bool,
    #[serde(rename = "tcpFallbackActive")]
    pub tcp_fallback_active: bool,
    #[serde(default)]
    pub version: Option<String>,
}

/// A snapshot of the local daemon plus the handle used to query it.
///
/// The status only changes through [`Endpoint::update_status`], which replaces
/// it wholesale.
#[derive(Debug)]
pub struct Endpoint<R = ZeroTierCli> {
    runner: R,
    config: ClientConfig,
    status: EndpointStatus,
}

impl Endpoint<ZeroTierCli> {
    /// Connect to the daemon through `config.cli_program`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let runner = ZeroTierCli::new(config.cli_program.clone());
        Self::with_runner(runner, config)
    }
}

impl<R: CommandRunner> Endpoint<R> {
    /// Fails if the daemon cannot be queried.
    pub fn with_runner(runner: R, config: ClientConfig) -> Result<Self> {
        let mut endpoint = Self {
            runner,
            config,
            status: EndpointStatus::default(),
        };
        endpoint.update_status()?;
        Ok(endpoint)
    }

    pub fn status(&self) -> &EndpointStatus {
        &self.status
    }

    pub fn device_address(&self) -> &str {
        &self.status.address
    }

    pub fn online(&self) -> bool {
        self.status.online
    }

    pub fn tcp_fallback(&self) -> bool {
        self.status.tcp_fallback_active
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn update_status(&mut self) -> Result<()> {
        let out = self.runner.run_json(&["status"])?;
        self.status = serde_json::from_slice(&out).map_err(|source| {
            warn!(error = %source, "cannot parse status output");
            debug!(payload = %String::from_utf8_lossy(&out), "raw status output");
            ZtError::Parse {
                what: "status",
                source,
            }
        })?;
        debug!(address = %self.status.address, online = self.status.online, "daemon status");
        Ok(())
    }

    pub fn ping_daemon(&self) -> Result<()> {
        daemon::ping_daemon(&self.runner)
    }

    pub fn start_daemon(&self) -> Result<()> {
        daemon::start_daemon(&self.runner, &self.config)
    }

    /// Ask the daemon to join. This does not wait for, or imply, authorization:
    /// an unauthorized member stays joined without an address.
    pub fn join(&self, network_id: &str) -> Result<()> {
        info!(network_id, "joining network");
        self.runner.run_json(&["join", network_id]).map(|_| ())
    }

    pub fn leave(&self, network_id: &str) -> Result<()> {
        info!(network_id, "leaving network");
        self.runner.run_json(&["leave", network_id]).map(|_| ())
    }

    /// Fresh view of every network the daemon knows, keyed by network id.
    pub fn list_networks(&self) -> Result<HashMap<String, Network>> {
        let out = self.runner.run_json(&["listnetworks"])?;
        let networks: Vec<Network> = serde_json::from_slice(&out).map_err(|source| {
            warn!(error = %source, "cannot parse listnetworks output");
            debug!(payload = %String::from_utf8_lossy(&out), "raw listnetworks output");
            ZtError::Parse {
                what: "listnetworks",
                source,
            }
        })?;

        Ok(networks
            .into_iter()
            .map(|network| (network.id.clone(), network))
            .collect())
    }

    pub fn get_network(&self, network_id: &str) -> Result<Option<Network>> {
        Ok(self.list_networks()?.remove(network_id))
    }

    pub fn membership(&self, network_id: &str) -> Result<MembershipState> {
        let network = self.get_network(network_id)?;
        Ok(MembershipState::of(network.as_ref()))
    }

    /// Block until the network has an IPv4 address or `cancel` receives.
    ///
    /// There is no timeout besides `cancel`. If the sender is dropped the
    /// loop keeps polling until an address appears or an error occurs.
    pub fn wait_for_ip(&self, network_id: &str, cancel: &Receiver<()>) -> Result<Ipv4Addr> {
        let mut last_state: Option<MembershipState> = None;

        loop {
            let network = self
                .get_network(network_id)?
                .ok_or_else(|| ZtError::NetworkNotFound {
                    network_id: network_id.to_string(),
                })?;

            if let Some(first) = network.assigned_addresses.first() {
                let ip = parse_ipv4(first)?;
                info!(network_id, %ip, "address assigned");
                return Ok(ip);
            }

            let state = network.membership();
            if last_state.as_ref() != Some(&state) {
                info!(network_id, %state, "waiting for address");
                last_state = Some(state);
            }

            if wait_tick(cancel, self.config.poll_interval) {
                return Err(ZtError::Cancelled);
            }
        }
    }
}

/// Sleep one tick; true if cancellation arrived meanwhile.
fn wait_tick(cancel: &Receiver<()>, interval: Duration) -> bool {
    match cancel.recv_timeout(interval) {
        Ok(()) => true,
        Err(RecvTimeoutError::Timeout) => false,
        Err(RecvTimeoutError::Disconnected) => {
            thread::sleep(interval);
            false
        }
    }
}

/// First assigned address, which must be IPv4 in CIDR notation. An
/// IPv4-mapped IPv6 address counts as IPv4.
fn parse_ipv4(cidr: &str) -> Result<Ipv4Addr> {
    let malformed = |source| ZtError::MalformedAddress {
        address: cidr.to_string(),
        source,
    };

    // ipnetwork reads a bare address as a host route; the daemon always
    // reports a prefix, so a missing one means the entry is broken.
    if !cidr.contains('/') {
        return Err(malformed(IpNetworkError::InvalidCidrFormat(format!(
            "missing prefix length: {}",
            cidr
        ))));
    }

    let network = cidr.parse::<IpNetwork>().map_err(malformed)?;
    match network.ip() {
        IpAddr::V4(ip) => Ok(ip),
        IpAddr::V6(ip) => ip
            .to_ipv4_mapped()
            .ok_or_else(|| ZtError::UnsupportedAddressFamily {
                address: cidr.to_string(),
            }),
    }
}
