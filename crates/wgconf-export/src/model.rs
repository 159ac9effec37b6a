//! Tunnel Network Model
//!
//! Server and peer records plus the builders that turn partial input into
//! complete records with defaults applied.
//!
//! Keys and addresses are kept as text. They arrive from user input or a
//! saved file and are checked by [`crate::validate`], not at construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default WireGuard UDP port
pub const DEFAULT_LISTEN_PORT: u16 = 51820;

/// Default tunnel MTU
pub const DEFAULT_MTU: u16 = 1420;

/// Default persistent keepalive interval (seconds)
pub const DEFAULT_KEEPALIVE: u16 = 25;

/// Default server display name
pub const DEFAULT_SERVER_NAME: &str = "VPN Server";

/// Default tunnel interface name
pub const DEFAULT_INTERFACE: &str = "wg0";

/// Default uplink interface used by the NAT rules
pub const DEFAULT_WAN_INTERFACE: &str = "eth0";

/// AllowedIPs used when a peer routes everything through the tunnel
pub const FULL_TUNNEL: [&str; 2] = ["0.0.0.0/0", "::/0"];

/// Opaque peer identifier, unique within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(u64);

impl PeerId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

impl FromStr for PeerId {
    type Err = std::num::ParseIntError;

    /// Accepts both `peer-7` and `7`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix("peer-").unwrap_or(s).parse().map(PeerId)
    }
}

/// The tunnel server (or hub) configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerModel {
    pub name: String,
    #[serde(default)]
    pub private_key: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    /// Tunnel addresses, bare (`10.50.0.1`) or with prefix (`10.50.0.1/27`)
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub dns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u16>,
    /// Public `host[:port]` clients dial
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub post_up: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub post_down: String,
    /// Give every new peer a pre-shared key
    #[serde(default = "default_true")]
    pub enable_psk: bool,
    /// Masquerade tunnel traffic out of the WAN interface
    #[serde(default)]
    pub enable_nat: bool,
}

impl ServerModel {
    /// First tunnel address without its prefix
    pub fn primary_address(&self) -> Option<&str> {
        self.addresses.first().map(|a| split_prefix(a).0)
    }

    /// Prefix of the first tunnel address, if one was given
    pub fn tunnel_prefix(&self) -> Option<u8> {
        self.addresses
            .first()
            .and_then(|a| split_prefix(a).1)
            .and_then(|p| p.parse().ok())
    }

    /// MTU to render, treating 0 as unset
    pub fn effective_mtu(&self) -> Option<u16> {
        self.mtu.filter(|m| *m > 0)
    }

    /// `host:port` clients should dial, or `None` without an endpoint.
    ///
    /// A bare host gets the listen port appended; an explicit port is kept.
    /// Bare IPv6 literals are bracketed.
    pub fn endpoint_address(&self) -> Option<String> {
        let endpoint = self.endpoint.as_deref().map(str::trim).filter(|e| !e.is_empty())?;

        if let Some(rest) = endpoint.strip_prefix('[') {
            return Some(match rest.split_once(']') {
                Some((_, "")) => format!("{}:{}", endpoint, self.listen_port),
                _ => endpoint.to_string(),
            });
        }

        match endpoint.matches(':').count() {
            0 => Some(format!("{}:{}", endpoint, self.listen_port)),
            1 => Some(endpoint.to_string()),
            _ => Some(format!("[{}]:{}", endpoint, self.listen_port)),
        }
    }
}

/// One client of the tunnel server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerModel {
    pub id: PeerId,
    pub name: String,
    #[serde(default)]
    pub private_key: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_shared_key: Option<String>,
    /// Tunnel address without prefix
    #[serde(default)]
    pub address: String,
    /// Routed networks; empty means full tunnel
    #[serde(default)]
    pub allowed_ips: Vec<String>,
    #[serde(default)]
    pub dns: Vec<String>,
    #[serde(default = "default_keepalive")]
    pub persistent_keepalive: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u16>,
}

impl PeerModel {
    /// Pre-shared key, if a non-empty one is set
    pub fn psk(&self) -> Option<&str> {
        self.pre_shared_key.as_deref().filter(|k| !k.is_empty())
    }

    /// AllowedIPs as rendered in the client config
    pub fn allowed_ips_or_full_tunnel(&self) -> String {
        if self.allowed_ips.is_empty() {
            FULL_TUNNEL.join(", ")
        } else {
            self.allowed_ips.join(", ")
        }
    }

    /// Peer MTU, falling back to the server's
    pub fn effective_mtu(&self, server: &ServerModel) -> Option<u16> {
        self.mtu.filter(|m| *m > 0).or_else(|| server.effective_mtu())
    }
}

/// Partial server input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawServer {
    pub name: Option<String>,
    pub private_key: Option<String>,
    pub public_key: Option<String>,
    pub listen_port: Option<u16>,
    pub addresses: Option<Vec<String>>,
    pub dns: Option<Vec<String>>,
    pub mtu: Option<u16>,
    pub endpoint: Option<String>,
    pub post_up: Option<String>,
    pub post_down: Option<String>,
    pub enable_psk: Option<bool>,
    pub enable_nat: Option<bool>,
}

/// Partial peer input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPeer {
    pub id: Option<PeerId>,
    pub name: Option<String>,
    pub private_key: Option<String>,
    pub public_key: Option<String>,
    pub pre_shared_key: Option<String>,
    pub address: Option<String>,
    pub allowed_ips: Option<Vec<String>>,
    pub dns: Option<Vec<String>>,
    pub persistent_keepalive: Option<u16>,
    pub mtu: Option<u16>,
}

/// Routing mode for a client's AllowedIPs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedIpsMode {
    /// Route everything through the tunnel
    FullTunnel,
    /// Route only the listed networks
    SplitTunnel(Vec<String>),
    /// Reach only the listed LAN networks behind the server
    LanOnly(Vec<String>),
}

impl AllowedIpsMode {
    pub fn allowed_ips(&self) -> Vec<String> {
        match self {
            AllowedIpsMode::FullTunnel => FULL_TUNNEL.iter().map(|s| s.to_string()).collect(),
            AllowedIpsMode::SplitTunnel(networks) | AllowedIpsMode::LanOnly(networks) => networks.clone(),
        }
    }
}

/// Build a complete server record from partial input
pub fn build_server(raw: &RawServer) -> ServerModel {
    let enable_nat = raw.enable_nat.unwrap_or(false);
    let post_up = raw
        .post_up
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| nat_post_up(enable_nat, DEFAULT_INTERFACE, DEFAULT_WAN_INTERFACE));
    let post_down = raw
        .post_down
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| nat_post_down(enable_nat, DEFAULT_INTERFACE, DEFAULT_WAN_INTERFACE));

    ServerModel {
        name: raw
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string()),
        private_key: raw.private_key.clone().unwrap_or_default(),
        public_key: raw.public_key.clone().unwrap_or_default(),
        listen_port: raw.listen_port.filter(|p| *p > 0).unwrap_or(DEFAULT_LISTEN_PORT),
        addresses: raw.addresses.clone().unwrap_or_default(),
        dns: raw.dns.clone().unwrap_or_default(),
        mtu: Some(raw.mtu.filter(|m| *m > 0).unwrap_or(DEFAULT_MTU)),
        endpoint: raw.endpoint.clone().filter(|e| !e.trim().is_empty()),
        post_up,
        post_down,
        enable_psk: raw.enable_psk.unwrap_or(true),
        enable_nat,
    }
}

/// Build a complete peer record from partial input.
///
/// `ordinal` is the 1-based position of the new peer; it names unnamed
/// peers (`Client-<ordinal>`) and backs the id when none is given.
pub fn build_peer(raw: &RawPeer, server: &ServerModel, ordinal: usize) -> PeerModel {
    PeerModel {
        id: raw.id.unwrap_or(PeerId(ordinal as u64)),
        name: raw
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("Client-{}", ordinal)),
        private_key: raw.private_key.clone().unwrap_or_default(),
        public_key: raw.public_key.clone().unwrap_or_default(),
        pre_shared_key: raw.pre_shared_key.clone().filter(|k| !k.is_empty()),
        address: raw.address.clone().unwrap_or_default(),
        allowed_ips: raw.allowed_ips.clone().unwrap_or_default(),
        dns: raw.dns.clone().unwrap_or_else(|| server.dns.clone()),
        persistent_keepalive: raw.persistent_keepalive.unwrap_or(DEFAULT_KEEPALIVE),
        mtu: raw.mtu.or(server.mtu),
    }
}

/// iptables rules that forward and masquerade tunnel traffic
pub fn nat_post_up(enabled: bool, interface: &str, wan: &str) -> String {
    if !enabled {
        return String::new();
    }
    format!(
        "iptables -A FORWARD -i {interface} -j ACCEPT; iptables -t nat -A POSTROUTING -o {wan} -j MASQUERADE"
    )
}

/// Inverse of [`nat_post_up`]
pub fn nat_post_down(enabled: bool, interface: &str, wan: &str) -> String {
    if !enabled {
        return String::new();
    }
    format!(
        "iptables -D FORWARD -i {interface} -j ACCEPT; iptables -t nat -D POSTROUTING -o {wan} -j MASQUERADE"
    )
}

/// Split `10.0.0.1/24` into `("10.0.0.1", Some("24"))`
pub fn split_prefix(address: &str) -> (&str, Option<&str>) {
    match address.split_once('/') {
        Some((host, prefix)) => (host, Some(prefix)),
        None => (address, None),
    }
}

/// Replace every non-alphanumeric character with `_` for use in file names
pub fn sanitize_file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn default_listen_port() -> u16 {
    DEFAULT_LISTEN_PORT
}

fn default_keepalive() -> u16 {
    DEFAULT_KEEPALIVE
}

fn default_true() -> bool {
    true
}
