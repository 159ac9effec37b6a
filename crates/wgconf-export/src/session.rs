//! Network Session
//!
//! One tunnel network in memory: the address pool, the server, its peers in
//! creation order, and the DynDNS settings. Every mutator is a single
//! transaction; on error the session is exactly as it was before the call.
//!
//! Key material comes from a caller-supplied [`KeySource`].

use crate::dyndns::DynDnsSettings;
use crate::export::{ExportKind, Platform};
use crate::keys::KeySource;
use crate::model::{
    build_peer, build_server, nat_post_down, nat_post_up, AllowedIpsMode, PeerId, PeerModel, RawPeer, RawServer,
    ServerModel, DEFAULT_INTERFACE, DEFAULT_KEEPALIVE, DEFAULT_WAN_INTERFACE,
};
use crate::validate::{validate_network, ValidationReport};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::Ipv4Addr;
use tracing::{debug, info, warn};
use wgconf_ipam::{parse_ipv4, plan_subnet_checked, AddressPool, FormatError, Utilization};

/// Placeholder in bulk name patterns, replaced by the peer's ordinal
pub const ORDINAL_PLACEHOLDER: &str = "{n}";

/// Default bulk name pattern
pub const DEFAULT_NAME_PATTERN: &str = "Client-{n}";

/// Session errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid network: {0}")]
    Format(#[from] FormatError),

    #[error("Unknown peer: {0}")]
    UnknownPeer(String),

    #[error("Duplicate peer id: {0}")]
    DuplicatePeerId(PeerId),

    #[error("Peer \"{peer}\" has invalid address: {address}")]
    InvalidPeerAddress { peer: String, address: String },

    #[error("Peer \"{peer}\" address {address} is outside {cidr}")]
    AddressOutsidePool { peer: String, address: String, cidr: String },

    #[error("Peer \"{peer}\" address {address} is reserved or already in use")]
    AddressUnavailable { peer: String, address: String },

    #[error("Subnet {cidr} holds {available} peers, {needed} needed")]
    InsufficientCapacity { cidr: String, needed: usize, available: usize },

    #[error("Peer id {0} leaves no room for further ids")]
    PeerIdExhausted(PeerId),
}

/// Host-level knobs that shape new peers and NAT scripts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_keepalive")]
    pub default_keepalive: u16,
    #[serde(default = "default_interface")]
    pub interface: String,
    #[serde(default = "default_wan_interface")]
    pub wan_interface: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_keepalive: DEFAULT_KEEPALIVE,
            interface: DEFAULT_INTERFACE.to_string(),
            wan_interface: DEFAULT_WAN_INTERFACE.to_string(),
        }
    }
}

fn default_keepalive() -> u16 {
    DEFAULT_KEEPALIVE
}

fn default_interface() -> String {
    DEFAULT_INTERFACE.to_string()
}

fn default_wan_interface() -> String {
    DEFAULT_WAN_INTERFACE.to_string()
}

/// Outcome of [`NetworkSession::resize`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeReport {
    pub old_cidr: String,
    pub new_cidr: String,
    /// Peers whose address survived
    pub kept: usize,
    /// `(peer, old address, new address)` for every re-addressed peer
    pub moved: Vec<(PeerId, String, String)>,
}

/// In-memory tunnel network
#[derive(Debug, Clone)]
pub struct NetworkSession {
    pool: AddressPool,
    server: ServerModel,
    peers: Vec<PeerModel>,
    dyndns: DynDnsSettings,
    settings: SessionSettings,
    next_id: u64,
}

impl NetworkSession {
    /// Plan a subnet for `desired_peers` under `base` and build the server.
    ///
    /// The server's first address becomes the pool's reserved address with
    /// the planned prefix; further addresses in `raw_server` are kept.
    pub fn new(base: &str, desired_peers: usize, raw_server: &RawServer) -> Result<Self, SessionError> {
        Self::with_settings(base, desired_peers, raw_server, SessionSettings::default())
    }

    pub fn with_settings(
        base: &str,
        desired_peers: usize,
        raw_server: &RawServer,
        settings: SessionSettings,
    ) -> Result<Self, SessionError> {
        let plan = plan_subnet_checked(base, desired_peers)?;
        let pool = AddressPool::create(&plan.cidr)?;

        let mut server = build_server(raw_server);
        if server.enable_nat && is_unset(&raw_server.post_up) && is_unset(&raw_server.post_down) {
            server.post_up = nat_post_up(true, &settings.interface, &settings.wan_interface);
            server.post_down = nat_post_down(true, &settings.interface, &settings.wan_interface);
        }
        assign_server_address(&mut server, &pool);

        info!("New network {} for {} peers ({})", pool.cidr(), desired_peers, server.name);

        Ok(Self {
            pool,
            server,
            peers: Vec::new(),
            dyndns: DynDnsSettings::default(),
            settings,
            next_id: 1,
        })
    }

    /// Rebuild a session from persisted parts, re-claiming every peer address.
    ///
    /// Fails if a peer address is malformed, outside `cidr`, reserved, or
    /// shared with another peer, or if two peers share an id.
    pub fn restore(
        cidr: &str,
        server: ServerModel,
        peers: Vec<PeerModel>,
        dyndns: DynDnsSettings,
        settings: SessionSettings,
    ) -> Result<Self, SessionError> {
        let mut pool = AddressPool::create(cidr)?;
        let mut ids = HashSet::new();

        for peer in &peers {
            if !ids.insert(peer.id) {
                return Err(SessionError::DuplicatePeerId(peer.id));
            }

            let address = peer_address(peer)?;
            if !pool.subnet().contains(address) {
                return Err(SessionError::AddressOutsidePool {
                    peer: peer.name.clone(),
                    address: peer.address.clone(),
                    cidr: pool.cidr(),
                });
            }
            if !pool.claim(address) {
                return Err(SessionError::AddressUnavailable {
                    peer: peer.name.clone(),
                    address: peer.address.clone(),
                });
            }
        }

        let next_id = match peers.iter().map(|p| p.id.value()).max() {
            None => 1,
            Some(last) => last
                .checked_add(1)
                .ok_or(SessionError::PeerIdExhausted(PeerId::new(last)))?,
        };
        info!("Restored network {} with {} peers", pool.cidr(), peers.len());

        Ok(Self {
            pool,
            server,
            peers,
            dyndns,
            settings,
            next_id,
        })
    }

    /// Add one peer with a freshly allocated address.
    ///
    /// Unnamed peers become `Client-<n>`, counting up from the new peer count
    /// to the first name no other peer holds. Returns `None` when the pool or
    /// the id space is exhausted; no keys are requested then.
    pub fn add_peer(&mut self, name: Option<&str>, keys: &mut dyn KeySource) -> Option<&PeerModel> {
        let Some(following_id) = self.next_id.checked_add(1) else {
            warn!("No peer ids left after {}", PeerId::new(self.next_id));
            return None;
        };
        let name = match name.filter(|n| !n.trim().is_empty()) {
            Some(name) => name.to_string(),
            None => self.next_name(DEFAULT_NAME_PATTERN),
        };

        let address = self.pool.allocate()?;
        let ordinal = self.peers.len() + 1;
        let id = PeerId::new(self.next_id);

        let pair = keys.key_pair();
        let pre_shared_key = self.server.enable_psk.then(|| keys.preshared_key());

        let raw = RawPeer {
            id: Some(id),
            name: Some(name),
            private_key: Some(pair.private_key),
            public_key: Some(pair.public_key),
            pre_shared_key,
            address: Some(address.to_string()),
            persistent_keepalive: Some(self.settings.default_keepalive),
            ..Default::default()
        };
        let peer = build_peer(&raw, &self.server, ordinal);

        info!("Added peer {} ({}) at {}", peer.name, id, address);
        self.next_id = following_id;
        self.peers.push(peer);
        self.peers.last()
    }

    /// Add up to `count` peers named after `pattern`.
    ///
    /// `{n}` in the pattern becomes the peer's ordinal, skipping names already
    /// taken. Stops early when the pool runs out and returns the ids actually
    /// created.
    pub fn add_peers(&mut self, count: usize, pattern: &str, keys: &mut dyn KeySource) -> Vec<PeerId> {
        let mut created = Vec::with_capacity(count);
        for _ in 0..count {
            let name = self.next_name(pattern);
            match self.add_peer(Some(&name), keys) {
                Some(peer) => created.push(peer.id),
                None => {
                    warn!("Stopped bulk add after {} of {} peers", created.len(), count);
                    break;
                }
            }
        }
        created
    }

    /// Remove a peer and return its address to the pool
    pub fn remove_peer(&mut self, id: PeerId) -> Result<PeerModel, SessionError> {
        let index = self.peer_index(id)?;
        let peer = self.peers.remove(index);
        if let Ok(address) = parse_ipv4(&peer.address) {
            self.pool.release(address);
        }
        info!("Removed peer {} ({})", peer.name, peer.id);
        Ok(peer)
    }

    pub fn peer(&self, id: PeerId) -> Option<&PeerModel> {
        self.peers.iter().find(|p| p.id == id)
    }

    fn peer_mut(&mut self, id: PeerId) -> Option<&mut PeerModel> {
        self.peers.iter_mut().find(|p| p.id == id)
    }

    fn peer_index(&self, id: PeerId) -> Result<usize, SessionError> {
        self.peers
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| SessionError::UnknownPeer(id.to_string()))
    }

    /// `pattern` with `{n}` set to the first ordinal, from the next peer
    /// position on, whose name is still free
    fn next_name(&self, pattern: &str) -> String {
        let mut ordinal = self.peers.len() + 1;
        loop {
            let name = pattern.replace(ORDINAL_PLACEHOLDER, &ordinal.to_string());
            if !pattern.contains(ORDINAL_PLACEHOLDER) || self.peers.iter().all(|p| p.name != name) {
                return name;
            }
            ordinal += 1;
        }
    }

    /// Look a peer up by id (`peer-3` or `3`) or, failing that, by name
    pub fn find_peer(&self, query: &str) -> Option<&PeerModel> {
        query
            .parse::<PeerId>()
            .ok()
            .and_then(|id| self.peer(id))
            .or_else(|| self.peers.iter().find(|p| p.name == query))
    }

    /// Move a peer to another address of the pool.
    ///
    /// The new address is claimed before the old one is released; on error
    /// the peer and the pool are unchanged.
    pub fn set_peer_address(&mut self, id: PeerId, address: &str) -> Result<(), SessionError> {
        let index = self.peer_index(id)?;
        let name = self.peers[index].name.clone();
        let current = parse_ipv4(&self.peers[index].address).ok();

        let target = parse_ipv4(address).map_err(|_| SessionError::InvalidPeerAddress {
            peer: name.clone(),
            address: address.to_string(),
        })?;
        if current == Some(target) {
            return Ok(());
        }
        if !self.pool.subnet().contains(target) {
            return Err(SessionError::AddressOutsidePool {
                peer: name,
                address: address.to_string(),
                cidr: self.pool.cidr(),
            });
        }
        if !self.pool.claim(target) {
            return Err(SessionError::AddressUnavailable {
                peer: name,
                address: address.to_string(),
            });
        }
        if let Some(current) = current {
            self.pool.release(current);
        }

        let peer = &mut self.peers[index];
        info!("Moved peer {} ({}) from {} to {}", peer.name, peer.id, peer.address, target);
        peer.address = target.to_string();
        Ok(())
    }

    /// Replace a peer's AllowedIPs with the networks of `mode`
    pub fn set_allowed_ips(&mut self, id: PeerId, mode: &AllowedIpsMode) -> Result<(), SessionError> {
        let peer = self
            .peer_mut(id)
            .ok_or_else(|| SessionError::UnknownPeer(id.to_string()))?;
        peer.allowed_ips = match mode {
            AllowedIpsMode::FullTunnel => Vec::new(),
            _ => mode.allowed_ips(),
        };
        Ok(())
    }

    /// Turn masquerading on or off, regenerating PostUp/PostDown
    pub fn set_nat(&mut self, enabled: bool) {
        self.server.enable_nat = enabled;
        self.server.post_up = nat_post_up(enabled, &self.settings.interface, &self.settings.wan_interface);
        self.server.post_down = nat_post_down(enabled, &self.settings.interface, &self.settings.wan_interface);
    }

    /// Move the network to a new base and size.
    ///
    /// Peers keep their address when it is still usable in the new subnet;
    /// the rest are re-addressed in creation order, and the server moves to
    /// the new reserved address. If the new subnet cannot hold every peer,
    /// nothing changes.
    pub fn resize(&mut self, base: &str, desired_peers: usize) -> Result<ResizeReport, SessionError> {
        let plan = plan_subnet_checked(base, desired_peers)?;
        let mut pool = AddressPool::create(&plan.cidr)?;

        let capacity = pool.utilization().total;
        if self.peers.len() > capacity {
            return Err(SessionError::InsufficientCapacity {
                cidr: pool.cidr(),
                needed: self.peers.len(),
                available: capacity,
            });
        }

        let mut placed: Vec<Option<Ipv4Addr>> = self
            .peers
            .iter()
            .map(|peer| {
                parse_ipv4(&peer.address)
                    .ok()
                    .filter(|addr| pool.is_available(*addr))
                    .filter(|addr| pool.claim(*addr))
            })
            .collect();

        let mut moved = Vec::new();
        for (peer, slot) in self.peers.iter().zip(placed.iter_mut()) {
            if slot.is_some() {
                continue;
            }
            let Some(address) = pool.allocate() else {
                return Err(SessionError::InsufficientCapacity {
                    cidr: pool.cidr(),
                    needed: self.peers.len(),
                    available: capacity,
                });
            };
            moved.push((peer.id, peer.address.clone(), address.to_string()));
            *slot = Some(address);
        }

        let report = ResizeReport {
            old_cidr: self.pool.cidr(),
            new_cidr: pool.cidr(),
            kept: self.peers.len() - moved.len(),
            moved,
        };

        for (peer, address) in self.peers.iter_mut().zip(placed) {
            if let Some(address) = address {
                peer.address = address.to_string();
            }
        }
        assign_server_address(&mut self.server, &pool);
        self.pool = pool;

        info!(
            "Resized network {} -> {}: {} kept, {} moved",
            report.old_cidr,
            report.new_cidr,
            report.kept,
            report.moved.len()
        );
        for (id, from, to) in &report.moved {
            debug!("Moved {} from {} to {}", id, from, to);
        }

        Ok(report)
    }

    /// Validate the whole network
    pub fn validate(&self) -> ValidationReport {
        validate_network(&self.server, &self.peers, Some(&self.dyndns))
    }

    /// Render `kind` for `platform`
    pub fn export(&self, platform: Platform, kind: ExportKind) -> String {
        kind.render(platform.exporter(), &self.server, &self.peers, Some(&self.dyndns))
    }

    /// Single client config for `platform`
    pub fn export_client(&self, platform: Platform, id: PeerId) -> Option<String> {
        self.peer(id).map(|peer| platform.exporter().export_client(peer, &self.server))
    }

    pub fn server(&self) -> &ServerModel {
        &self.server
    }

    /// Set the public host[:port] clients connect to; blank clears it
    pub fn set_endpoint(&mut self, endpoint: Option<&str>) {
        self.server.endpoint = endpoint.map(str::trim).filter(|e| !e.is_empty()).map(str::to_string);
    }

    /// Peers in creation order
    pub fn peers(&self) -> &[PeerModel] {
        &self.peers
    }

    pub fn dyndns(&self) -> &DynDnsSettings {
        &self.dyndns
    }

    pub fn set_dyndns(&mut self, dyndns: DynDnsSettings) {
        self.dyndns = dyndns;
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn pool(&self) -> &AddressPool {
        &self.pool
    }

    pub fn cidr(&self) -> String {
        self.pool.cidr()
    }

    pub fn utilization(&self) -> Utilization {
        self.pool.utilization()
    }
}

fn is_unset(script: &Option<String>) -> bool {
    script.as_deref().is_none_or(str::is_empty)
}

fn peer_address(peer: &PeerModel) -> Result<Ipv4Addr, SessionError> {
    parse_ipv4(&peer.address).map_err(|_| SessionError::InvalidPeerAddress {
        peer: peer.name.clone(),
        address: peer.address.clone(),
    })
}

/// Put `<reserved>/<prefix>` first in the server's addresses
fn assign_server_address(server: &mut ServerModel, pool: &AddressPool) {
    let Some(reserved) = pool.server_address() else {
        return;
    };
    let address = format!("{}/{}", reserved, pool.subnet().prefix_length());
    match server.addresses.first_mut() {
        Some(first) => *first = address,
        None => server.addresses.push(address),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SequentialKeys;

    fn session(peers: usize) -> NetworkSession {
        NetworkSession::new("10.50.0.0", peers, &RawServer::default()).unwrap()
    }

    #[test]
    fn test_new_session() {
        let session = session(30);
        assert_eq!(session.cidr(), "10.50.0.0/27");
        assert_eq!(session.server().addresses, vec!["10.50.0.1/27"]);
        assert_eq!(session.utilization().total, 29);
        assert!(session.peers().is_empty());
    }

    #[test]
    fn test_new_rejects_bad_base() {
        assert!(matches!(
            NetworkSession::new("10.50.0", 5, &RawServer::default()),
            Err(SessionError::Format(_))
        ));
    }

    #[test]
    fn test_add_peer() {
        let mut session = session(5);
        let mut keys = SequentialKeys::default();

        let peer = session.add_peer(None, &mut keys).unwrap().clone();
        assert_eq!(peer.name, "Client-1");
        assert_eq!(peer.address, "10.50.0.2");
        assert_eq!(peer.id, PeerId::new(1));
        assert!(peer.pre_shared_key.is_some());

        let named = session.add_peer(Some("laptop"), &mut keys).unwrap();
        assert_eq!(named.name, "laptop");
        assert_eq!(named.address, "10.50.0.3");
    }

    #[test]
    fn test_add_peer_without_psk() {
        let raw = RawServer {
            enable_psk: Some(false),
            ..Default::default()
        };
        let mut session = NetworkSession::new("10.50.0.0", 5, &raw).unwrap();
        let peer = session.add_peer(None, &mut SequentialKeys::default()).unwrap();
        assert!(peer.pre_shared_key.is_none());
    }

    #[test]
    fn test_bulk_add_stops_at_exhaustion() {
        let mut session = session(6);
        let mut keys = SequentialKeys::default();

        let created = session.add_peers(10, DEFAULT_NAME_PATTERN, &mut keys);
        assert_eq!(created.len(), 5);
        assert_eq!(session.peers()[4].name, "Client-5");
        assert_eq!(session.peers()[4].address, "10.50.0.6");
        assert!(session.add_peer(None, &mut keys).is_none());
    }

    #[test]
    fn test_remove_peer_frees_address() {
        let mut session = session(6);
        let mut keys = SequentialKeys::default();
        let ids = session.add_peers(3, "dev-{n}", &mut keys);

        let removed = session.remove_peer(ids[0]).unwrap();
        assert_eq!(removed.address, "10.50.0.2");
        assert!(matches!(session.remove_peer(ids[0]), Err(SessionError::UnknownPeer(_))));

        let next = session.add_peer(None, &mut keys).unwrap();
        assert_eq!(next.address, "10.50.0.2");
        assert_eq!(next.id, PeerId::new(4));
    }

    #[test]
    fn test_find_peer() {
        let mut session = session(6);
        session.add_peers(2, "dev-{n}", &mut SequentialKeys::default());

        assert_eq!(session.find_peer("dev-2").map(|p| p.id), Some(PeerId::new(2)));
        assert_eq!(session.find_peer("peer-1").map(|p| p.name.as_str()), Some("dev-1"));
        assert!(session.find_peer("nobody").is_none());
    }

    #[test]
    fn test_resize_grow_keeps_addresses() {
        let mut session = session(6);
        session.add_peers(5, DEFAULT_NAME_PATTERN, &mut SequentialKeys::default());

        let report = session.resize("10.50.0.0", 30).unwrap();
        assert_eq!(report.new_cidr, "10.50.0.0/27");
        assert_eq!(report.kept, 5);
        assert!(report.moved.is_empty());
        assert_eq!(session.server().addresses[0], "10.50.0.1/27");
        assert_eq!(session.utilization().used, 5);
    }

    #[test]
    fn test_resize_new_base_moves_peers() {
        let mut session = session(6);
        session.add_peers(2, DEFAULT_NAME_PATTERN, &mut SequentialKeys::default());

        let report = session.resize("10.60.0.0", 6).unwrap();
        assert_eq!(report.moved.len(), 2);
        assert_eq!(session.peers()[0].address, "10.60.0.2");
        assert_eq!(session.peers()[1].address, "10.60.0.3");
        assert_eq!(session.server().addresses[0], "10.60.0.1/29");
    }

    #[test]
    fn test_resize_insufficient_capacity_is_atomic() {
        let mut session = session(14);
        session.add_peers(10, DEFAULT_NAME_PATTERN, &mut SequentialKeys::default());
        let before: Vec<String> = session.peers().iter().map(|p| p.address.clone()).collect();

        let err = session.resize("10.50.0.0", 6).unwrap_err();
        assert!(matches!(err, SessionError::InsufficientCapacity { needed: 10, available: 5, .. }));
        assert_eq!(session.cidr(), "10.50.0.0/28");
        let after: Vec<String> = session.peers().iter().map(|p| p.address.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_restore() {
        let mut original = session(6);
        original.add_peers(3, DEFAULT_NAME_PATTERN, &mut SequentialKeys::default());

        let restored = NetworkSession::restore(
            &original.cidr(),
            original.server().clone(),
            original.peers().to_vec(),
            DynDnsSettings::default(),
            SessionSettings::default(),
        )
        .unwrap();
        assert_eq!(restored.utilization().used, 3);

        let mut restored = restored;
        let next = restored.add_peer(None, &mut SequentialKeys::default()).unwrap();
        assert_eq!(next.address, "10.50.0.5");
        assert_eq!(next.id, PeerId::new(4));
    }

    #[test]
    fn test_restore_rejects_conflicts() {
        let mut original = session(6);
        original.add_peers(2, DEFAULT_NAME_PATTERN, &mut SequentialKeys::default());
        let server = original.server().clone();

        let mut dup = original.peers().to_vec();
        dup[1].address = dup[0].address.clone();
        let err = NetworkSession::restore("10.50.0.0/29", server.clone(), dup, Default::default(), Default::default());
        assert!(matches!(err, Err(SessionError::AddressUnavailable { .. })));

        let mut outside = original.peers().to_vec();
        outside[0].address = "10.99.0.2".into();
        let err = NetworkSession::restore("10.50.0.0/29", server.clone(), outside, Default::default(), Default::default());
        assert!(matches!(err, Err(SessionError::AddressOutsidePool { .. })));

        let mut reserved = original.peers().to_vec();
        reserved[0].address = "10.50.0.1".into();
        let err = NetworkSession::restore("10.50.0.0/29", server.clone(), reserved, Default::default(), Default::default());
        assert!(matches!(err, Err(SessionError::AddressUnavailable { .. })));

        let mut same_id = original.peers().to_vec();
        same_id[1].id = same_id[0].id;
        let err = NetworkSession::restore("10.50.0.0/29", server, same_id, Default::default(), Default::default());
        assert!(matches!(err, Err(SessionError::DuplicatePeerId(_))));
    }

    #[test]
    fn test_set_nat_uses_settings() {
        let settings = SessionSettings {
            wan_interface: "ppp0".into(),
            ..Default::default()
        };
        let mut session = NetworkSession::with_settings("10.50.0.0", 5, &RawServer::default(), settings).unwrap();

        session.set_nat(true);
        assert!(session.server().post_up.ends_with("-o ppp0 -j MASQUERADE"));

        session.set_nat(false);
        assert!(session.server().post_up.is_empty());
        assert!(session.server().post_down.is_empty());
    }

    #[test]
    fn test_session_validates_clean() {
        let raw = RawServer {
            private_key: Some(crate::testing::key(200)),
            public_key: Some(crate::testing::key(201)),
            ..Default::default()
        };
        let mut session = NetworkSession::new("10.50.0.0", 5, &raw).unwrap();
        session.add_peers(3, DEFAULT_NAME_PATTERN, &mut SequentialKeys::default());

        let report = session.validate();
        assert!(report.is_valid(), "{}", report);
    }

    #[test]
    fn test_set_allowed_ips() {
        let mut session = session(5);
        let id = session.add_peer(None, &mut SequentialKeys::default()).unwrap().id;

        session
            .set_allowed_ips(id, &AllowedIpsMode::LanOnly(vec!["192.168.1.0/24".into()]))
            .unwrap();
        assert_eq!(session.peer(id).unwrap().allowed_ips, vec!["192.168.1.0/24"]);

        session.set_allowed_ips(id, &AllowedIpsMode::FullTunnel).unwrap();
        assert_eq!(session.peer(id).unwrap().allowed_ips_or_full_tunnel(), "0.0.0.0/0, ::/0");
    }

    #[test]
    fn test_set_peer_address_keeps_pool_in_sync() {
        let mut session = session(6);
        let mut keys = SequentialKeys::default();
        let ids = session.add_peers(2, DEFAULT_NAME_PATTERN, &mut keys);

        let taken = session.set_peer_address(ids[0], "10.50.0.3");
        assert!(matches!(taken, Err(SessionError::AddressUnavailable { .. })));
        let reserved = session.set_peer_address(ids[0], "10.50.0.1");
        assert!(matches!(reserved, Err(SessionError::AddressUnavailable { .. })));
        let outside = session.set_peer_address(ids[0], "10.99.0.5");
        assert!(matches!(outside, Err(SessionError::AddressOutsidePool { .. })));
        let malformed = session.set_peer_address(ids[0], "10.50.0");
        assert!(matches!(malformed, Err(SessionError::InvalidPeerAddress { .. })));
        assert_eq!(session.peer(ids[0]).unwrap().address, "10.50.0.2");

        session.set_peer_address(ids[0], "10.50.0.5").unwrap();
        assert_eq!(session.peer(ids[0]).unwrap().address, "10.50.0.5");
        assert!(session.set_peer_address(ids[0], "10.50.0.5").is_ok());

        let next = session.add_peer(None, &mut keys).unwrap();
        assert_eq!(next.address, "10.50.0.2");

        let mut addresses: Vec<&str> = session.peers().iter().map(|p| p.address.as_str()).collect();
        addresses.sort_unstable();
        addresses.dedup();
        assert_eq!(addresses.len(), 3);
        assert_eq!(session.utilization().used, 3);
        assert!(matches!(
            session.set_peer_address(PeerId::new(99), "10.50.0.6"),
            Err(SessionError::UnknownPeer(_))
        ));
    }

    #[test]
    fn test_default_names_stay_unique() {
        let mut session = session(6);
        let mut keys = SequentialKeys::default();
        let ids = session.add_peers(3, DEFAULT_NAME_PATTERN, &mut keys);

        session.remove_peer(ids[0]).unwrap();
        let next = session.add_peer(None, &mut keys).unwrap();
        assert_eq!(next.name, "Client-4");

        let names: Vec<&str> = session.peers().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Client-2", "Client-3", "Client-4"]);
    }

    #[test]
    fn test_bulk_names_skip_taken() {
        let mut session = session(6);
        let mut keys = SequentialKeys::default();
        session.add_peer(Some("Client-2"), &mut keys);
        session.add_peer(Some(" "), &mut keys);
        session.add_peers(2, DEFAULT_NAME_PATTERN, &mut keys);

        let names: Vec<&str> = session.peers().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Client-2", "Client-3", "Client-4", "Client-5"]);
    }

    #[test]
    fn test_vyos_keeps_peers_with_equal_names() {
        let mut session = session(6);
        let mut keys = SequentialKeys::default();
        session.add_peer(Some("Bob's"), &mut keys);
        session.add_peer(Some("Bob s"), &mut keys);
        session.add_peer(Some("Bob s"), &mut keys);

        let output = session.export(Platform::VyOs, ExportKind::Server);
        for peer in session.peers() {
            let line = format!("peer {} public-key '{}'\n", peer.id, peer.public_key);
            assert_eq!(output.matches(&line).count(), 1, "{}", line);
        }
        assert_eq!(output.matches(" public-key '").count(), 3);
    }

    #[test]
    fn test_restore_rejects_exhausted_ids() {
        let mut original = session(6);
        original.add_peers(2, DEFAULT_NAME_PATTERN, &mut SequentialKeys::default());
        let mut peers = original.peers().to_vec();
        peers[0].id = PeerId::new(u64::MAX);

        let err = NetworkSession::restore(
            &original.cidr(),
            original.server().clone(),
            peers,
            Default::default(),
            Default::default(),
        );
        assert_eq!(err.unwrap_err(), SessionError::PeerIdExhausted(PeerId::new(u64::MAX)));
    }

    #[test]
    fn test_add_peer_stops_at_last_id() {
        let mut original = session(6);
        original.add_peers(1, DEFAULT_NAME_PATTERN, &mut SequentialKeys::default());
        let mut peers = original.peers().to_vec();
        peers[0].id = PeerId::new(u64::MAX - 1);

        let mut restored = NetworkSession::restore(
            &original.cidr(),
            original.server().clone(),
            peers,
            Default::default(),
            Default::default(),
        )
        .unwrap();
        assert!(restored.add_peer(None, &mut SequentialKeys::default()).is_none());
        assert_eq!(restored.peers().len(), 1);
        assert_eq!(restored.utilization().used, 1);
    }

    #[test]
    fn test_set_endpoint() {
        let mut session = session(5);
        session.set_endpoint(Some(" vpn.example.com "));
        assert_eq!(session.server().endpoint.as_deref(), Some("vpn.example.com"));

        session.set_endpoint(Some(""));
        assert!(session.server().endpoint.is_none());
    }
}
