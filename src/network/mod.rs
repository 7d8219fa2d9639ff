//! Network snapshots as reported by `zerotier-cli -j listnetworks`.

pub mod daemon;
pub mod endpoint;

use std::fmt;

use serde::Deserialize;

pub use endpoint::{Endpoint, EndpointStatus};

/// One virtual network as the daemon currently sees it. Rebuilt on every
/// query and never updated in place.
///
/// Only `nwid` is required; any other field the daemon omits takes its zero
/// value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Network {
    #[serde(rename = "nwid")]
    pub id: String,
    #[serde(default)]
    pub mac: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "type", default)]
    pub network_type: String,
    #[serde(default)]
    pub mtu: u32,
    #[serde(default)]
    pub dhcp: bool,
    #[serde(default)]
    pub bridge: bool,
    #[serde(rename = "broadcastEnabled", default)]
    pub broadcast_enabled: bool,
    /// CIDR strings, e.g. `10.147.17.4/24`. Empty means not assigned yet.
    #[serde(rename = "assignedAddresses", default)]
    pub assigned_addresses: Vec<String>,
    #[serde(rename = "portDeviceName", default)]
    pub port_device_name: String,
    #[serde(rename = "portError", default)]
    pub port_error: i32,
    #[serde(rename = "netconfRevision", default)]
    pub netconf_revision: u64,
}

impl Network {
    pub fn status_kind(&self) -> NetworkStatus {
        NetworkStatus::from(self.status.as_str())
    }

    pub fn membership(&self) -> MembershipState {
        if !self.assigned_addresses.is_empty() {
            return MembershipState::AddressAssigned;
        }
        match self.status_kind() {
            NetworkStatus::RequestingConfiguration => MembershipState::Requesting,
            NetworkStatus::AccessDenied | NetworkStatus::AuthenticationRequired => {
                MembershipState::Unauthorized
            }
            NetworkStatus::Ok => MembershipState::Authorized,
            other => MembershipState::Unavailable(other),
        }
    }
}

/// The daemon's `status` string for a network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkStatus {
    RequestingConfiguration,
    Ok,
    AccessDenied,
    AuthenticationRequired,
    NotFound,
    PortError,
    ClientTooOld,
    Other(String),
}

impl From<&str> for NetworkStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "REQUESTING_CONFIGURATION" => NetworkStatus::RequestingConfiguration,
            "OK" => NetworkStatus::Ok,
            "ACCESS_DENIED" => NetworkStatus::AccessDenied,
            "AUTHENTICATION_REQUIRED" => NetworkStatus::AuthenticationRequired,
            "NOT_FOUND" => NetworkStatus::NotFound,
            "PORT_ERROR" => NetworkStatus::PortError,
            "CLIENT_TOO_OLD" => NetworkStatus::ClientTooOld,
            other => NetworkStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for NetworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkStatus::RequestingConfiguration => write!(f, "REQUESTING_CONFIGURATION"),
            NetworkStatus::Ok => write!(f, "OK"),
            NetworkStatus::AccessDenied => write!(f, "ACCESS_DENIED"),
            NetworkStatus::AuthenticationRequired => write!(f, "AUTHENTICATION_REQUIRED"),
            NetworkStatus::NotFound => write!(f, "NOT_FOUND"),
            NetworkStatus::PortError => write!(f, "PORT_ERROR"),
            NetworkStatus::ClientTooOld => write!(f, "CLIENT_TOO_OLD"),
            NetworkStatus::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// Where a device stands on a network, from join request to usable address.
///
/// `join` only moves a device to `Requesting`; the controller decides between
/// `Unauthorized` and `Authorized`, and only then does an address show up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipState {
    NotJoined,
    Requesting,
    Unauthorized,
    Authorized,
    AddressAssigned,
    /// The daemon reports a state the device cannot recover from by waiting.
    Unavailable(NetworkStatus),
}

impl MembershipState {
    pub fn of(network: Option<&Network>) -> Self {
        network.map_or(MembershipState::NotJoined, Network::membership)
    }
}

impl fmt::Display for MembershipState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MembershipState::NotJoined => write!(f, "not joined"),
            MembershipState::Requesting => write!(f, "requesting configuration"),
            MembershipState::Unauthorized => write!(f, "joined, awaiting authorization"),
            MembershipState::Authorized => write!(f, "authorized, awaiting address"),
            MembershipState::AddressAssigned => write!(f, "address assigned"),
            MembershipState::Unavailable(status) => write!(f, "unavailable ({})", status),
        }
    }
}
