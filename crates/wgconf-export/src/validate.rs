//! Configuration Validation
//!
//! Cross-checks a server and its peers before export. Findings are
//! accumulated, not short-circuited, so one pass reports everything wrong.
//!
//! Validation never mutates the model and never consults an address pool;
//! duplicates are derived from the flat lists of addresses and keys.

use crate::dyndns::{is_valid_api_key, is_valid_domain, DynDnsSettings, IPV64_DOMAIN_SUFFIX};
use crate::keys::is_valid_key;
use crate::model::{split_prefix, PeerModel, ServerModel};
use std::fmt;
use std::net::Ipv6Addr;
use wgconf_ipam::{is_valid_cidr, is_valid_ipv4};

/// Smallest MTU WireGuard accepts for IPv6 transport
pub const MIN_MTU: u16 = 1280;

/// Largest MTU on a standard Ethernet uplink
pub const MAX_MTU: u16 = 1500;

/// Upper bound for PersistentKeepalive (seconds)
pub const MAX_KEEPALIVE: u16 = 300;

/// Ordered list of human-readable findings; empty means valid
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    findings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn findings(&self) -> &[String] {
        &self.findings
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn into_findings(self) -> Vec<String> {
        self.findings
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.findings.is_empty() {
            return write!(f, "Configuration is valid");
        }
        writeln!(f, "Configuration Validation Errors:")?;
        writeln!(f)?;
        for (index, finding) in self.findings.iter().enumerate() {
            writeln!(f, "{}. {}", index + 1, finding)?;
        }
        Ok(())
    }
}

/// Validate a whole network: server, every peer, uniqueness and DynDNS
pub fn validate_network(
    server: &ServerModel,
    peers: &[PeerModel],
    dyndns: Option<&DynDnsSettings>,
) -> ValidationReport {
    let mut findings = validate_server(server);

    for peer in peers {
        findings.extend(validate_peer(peer));
    }

    findings.extend(duplicate_addresses(server, peers));
    findings.extend(duplicate_public_keys(server, peers));

    if let Some(dyndns) = dyndns {
        findings.extend(validate_dyndns(dyndns));
    }

    ValidationReport { findings }
}

/// Server-level checks
pub fn validate_server(server: &ServerModel) -> Vec<String> {
    let mut errors = Vec::new();

    if server.name.trim().is_empty() {
        errors.push("Server name is required".to_string());
    }

    if server.listen_port == 0 {
        errors.push("Invalid listen port (must be 1-65535)".to_string());
    }

    check_key_field(&mut errors, &server.private_key, "Server private key is required", "Invalid server private key format");
    check_key_field(&mut errors, &server.public_key, "Server public key is required", "Invalid server public key format");

    if server.addresses.is_empty() {
        errors.push("At least one server address is required".to_string());
    }
    for (index, address) in server.addresses.iter().enumerate() {
        if !is_valid_interface_address(address) {
            errors.push(format!("Invalid server address {}: {}", index + 1, address));
        }
    }

    if let Some(mtu) = server.effective_mtu() {
        if !(MIN_MTU..=MAX_MTU).contains(&mtu) {
            errors.push(format!("MTU must be between {} and {}", MIN_MTU, MAX_MTU));
        }
    }

    for (index, dns) in server.dns.iter().enumerate() {
        if !is_valid_ipv4(dns) {
            errors.push(format!("Invalid DNS server {}: {}", index + 1, dns));
        }
    }

    if let Some(endpoint) = server.endpoint.as_deref() {
        if !is_valid_endpoint(endpoint) {
            errors.push(format!("Invalid server endpoint: {}", endpoint));
        }
    }

    errors
}

/// Per-peer checks
pub fn validate_peer(peer: &PeerModel) -> Vec<String> {
    let mut errors = Vec::new();
    let name = &peer.name;

    if name.trim().is_empty() {
        errors.push("Client name is required".to_string());
    }

    check_key_field(
        &mut errors,
        &peer.private_key,
        &format!("Client \"{}\" private key is required", name),
        &format!("Client \"{}\" has invalid private key format", name),
    );
    check_key_field(
        &mut errors,
        &peer.public_key,
        &format!("Client \"{}\" public key is required", name),
        &format!("Client \"{}\" has invalid public key format", name),
    );

    if let Some(psk) = peer.psk() {
        if !is_valid_key(psk) {
            errors.push(format!("Client \"{}\" has invalid PSK format", name));
        }
    }

    if peer.address.is_empty() {
        errors.push(format!("Client \"{}\" address is required", name));
    } else if !is_valid_ipv4(&peer.address) {
        errors.push(format!("Client \"{}\" has invalid address: {}", name, peer.address));
    }

    if peer.persistent_keepalive > MAX_KEEPALIVE {
        errors.push(format!("Client \"{}\" keepalive must be 0-{} seconds", name, MAX_KEEPALIVE));
    }

    if let Some(mtu) = peer.mtu.filter(|m| *m > 0) {
        if !(MIN_MTU..=MAX_MTU).contains(&mtu) {
            errors.push(format!("Client \"{}\" MTU must be between {} and {}", name, MIN_MTU, MAX_MTU));
        }
    }

    for network in &peer.allowed_ips {
        if !is_valid_network(network) {
            errors.push(format!("Client \"{}\" has invalid allowed IP: {}", name, network));
        }
    }

    for (index, dns) in peer.dns.iter().enumerate() {
        if !is_valid_ipv4(dns) {
            errors.push(format!("Client \"{}\" has invalid DNS server {}: {}", name, index + 1, dns));
        }
    }

    errors
}

/// DynDNS checks; only enabled settings are inspected
pub fn validate_dyndns(dyndns: &DynDnsSettings) -> Vec<String> {
    let mut errors = Vec::new();
    if !dyndns.enabled {
        return errors;
    }

    if dyndns.domain.trim().is_empty() {
        errors.push("DynDNS domain is required when enabled".to_string());
    } else if !dyndns.domain.ends_with(IPV64_DOMAIN_SUFFIX) {
        errors.push(format!("DynDNS domain must end with {}", IPV64_DOMAIN_SUFFIX));
    } else if !is_valid_domain(&dyndns.domain) {
        errors.push(format!("Invalid DynDNS domain: {}", dyndns.domain));
    }

    if !is_valid_api_key(&dyndns.api_key) {
        errors.push("DynDNS API key is required when enabled".to_string());
    }

    errors
}

fn check_key_field(errors: &mut Vec<String>, key: &str, missing: &str, malformed: &str) {
    if key.is_empty() {
        errors.push(missing.to_string());
    } else if !is_valid_key(key) {
        errors.push(malformed.to_string());
    }
}

/// Group `(value, holder)` pairs and keep values held more than once, in
/// order of first appearance
fn find_duplicates<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Vec<(&'a str, Vec<&'a str>)> {
    let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
    for (value, holder) in entries {
        match groups.iter_mut().find(|(v, _)| *v == value) {
            Some((_, holders)) => holders.push(holder),
            None => groups.push((value, vec![holder])),
        }
    }
    groups.retain(|(_, holders)| holders.len() > 1);
    groups
}

fn describe_duplicates(groups: &[(&str, Vec<&str>)]) -> String {
    groups
        .iter()
        .map(|(value, holders)| format!("{} ({})", value, holders.join(", ")))
        .collect::<Vec<_>>()
        .join(", ")
}

fn duplicate_addresses(server: &ServerModel, peers: &[PeerModel]) -> Option<String> {
    let server_entry = server.primary_address().map(|addr| (addr, server.name.as_str()));
    let peer_entries = peers
        .iter()
        .filter(|p| !p.address.is_empty())
        .map(|p| (p.address.as_str(), p.name.as_str()));

    let groups = find_duplicates(server_entry.into_iter().chain(peer_entries));
    (!groups.is_empty()).then(|| format!("Duplicate IP addresses found: {}", describe_duplicates(&groups)))
}

fn duplicate_public_keys(server: &ServerModel, peers: &[PeerModel]) -> Option<String> {
    let server_entry = (!server.public_key.is_empty()).then(|| (server.public_key.as_str(), server.name.as_str()));
    let peer_entries = peers
        .iter()
        .filter(|p| !p.public_key.is_empty())
        .map(|p| (p.public_key.as_str(), p.name.as_str()));

    let groups = find_duplicates(server_entry.into_iter().chain(peer_entries));
    if groups.is_empty() {
        return None;
    }

    let holders: Vec<&str> = groups.iter().flat_map(|(_, h)| h.iter().copied()).collect();
    Some(format!("Duplicate public keys detected: {}", holders.join(", ")))
}

/// IPv4 address with an optional prefix, as used on interfaces
pub fn is_valid_interface_address(address: &str) -> bool {
    match split_prefix(address) {
        (host, None) => is_valid_ipv4(host),
        (_, Some(_)) => is_valid_cidr(address),
    }
}

/// IPv4 or IPv6 network in CIDR form
pub fn is_valid_network(network: &str) -> bool {
    if is_valid_cidr(network) {
        return true;
    }
    match split_prefix(network) {
        (host, Some(prefix)) => {
            host.parse::<Ipv6Addr>().is_ok()
                && prefix.parse::<u8>().is_ok_and(|p| p <= 128)
                && (prefix == "0" || !prefix.starts_with('0'))
        }
        _ => false,
    }
}

/// `host`, `host:port`, an IPv6 literal, or `[v6]:port`
pub fn is_valid_endpoint(endpoint: &str) -> bool {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return false;
    }

    if let Some(rest) = endpoint.strip_prefix('[') {
        let Some((v6, tail)) = rest.split_once(']') else {
            return false;
        };
        if v6.parse::<Ipv6Addr>().is_err() {
            return false;
        }
        return match tail {
            "" => true,
            _ => tail.strip_prefix(':').is_some_and(is_valid_port),
        };
    }

    match endpoint.matches(':').count() {
        0 => is_valid_hostname(endpoint),
        1 => endpoint
            .split_once(':')
            .is_some_and(|(host, port)| is_valid_hostname(host) && is_valid_port(port)),
        _ => endpoint.parse::<Ipv6Addr>().is_ok(),
    }
}

fn is_valid_hostname(host: &str) -> bool {
    !host.is_empty() && host.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

fn is_valid_port(port: &str) -> bool {
    !port.starts_with('0')
        && port.bytes().all(|b| b.is_ascii_digit())
        && port.parse::<u16>().is_ok_and(|p| p > 0)
}
