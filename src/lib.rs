//! Helpers for putting a machine on a ZeroTier network: drive the local
//! daemon through `zerotier-cli`, authorize the node with the controller and
//! wait until the virtual interface has an address.

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod network;

#[cfg(test)]
pub(crate) mod test_utils;

pub use cli::{CommandRunner, ZeroTierCli};
pub use config::ClientConfig;
pub use controller::{ApiToken, Controller, MemberAuthorizer};
pub use error::{Result, ZtError};
pub use network::daemon::{ping_daemon, start_daemon};
pub use network::{Endpoint, EndpointStatus, MembershipState, Network, NetworkStatus};
