//! Site-to-Site Tunnels
//!
//! Two gateways joined by a point-to-point tunnel, each routing the other's
//! LAN. Site B must be reachable; site A dials it.

use crate::keys::{KeyPair, KeySource};
use crate::model::{
    nat_post_down, nat_post_up, sanitize_file_stem, DEFAULT_INTERFACE, DEFAULT_KEEPALIVE, DEFAULT_LISTEN_PORT,
    DEFAULT_WAN_INTERFACE,
};
use serde::{Deserialize, Serialize};

/// Prefix of the point-to-point transfer network
pub const TRANSFER_PREFIX: u8 = 30;

/// Site-to-site preconditions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SiteError {
    #[error("Keys are missing for {0}; generate keys for both sites first")]
    MissingKeys(String),

    #[error("{0} must have an endpoint configured for the other site to connect to")]
    MissingEndpoint(String),
}

/// One gateway of a site-to-site tunnel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
    #[serde(default)]
    pub private_key: String,
    #[serde(default)]
    pub public_key: String,
    pub tunnel_ip: String,
    pub lan_network: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    DEFAULT_LISTEN_PORT
}

impl Site {
    fn new(name: &str, tunnel_ip: &str, lan_network: &str) -> Self {
        Self {
            name: name.to_string(),
            private_key: String::new(),
            public_key: String::new(),
            tunnel_ip: tunnel_ip.to_string(),
            lan_network: lan_network.to_string(),
            endpoint: String::new(),
            port: DEFAULT_LISTEN_PORT,
        }
    }

    pub fn has_keys(&self) -> bool {
        !self.private_key.is_empty() && !self.public_key.is_empty()
    }

    pub fn set_keys(&mut self, pair: KeyPair) {
        self.private_key = pair.private_key;
        self.public_key = pair.public_key;
    }

    /// `<name>_s2s.conf` with the name made file-system safe
    pub fn file_name(&self) -> String {
        format!("{}_s2s.conf", sanitize_file_stem(&self.name))
    }
}

/// Both ends of a site-to-site tunnel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitePair {
    pub site_a: Site,
    pub site_b: Site,
}

impl Default for SitePair {
    fn default() -> Self {
        Self {
            site_a: Site::new("Site A", "10.99.0.1", "192.168.1.0/24"),
            site_b: Site::new("Site B", "10.99.0.2", "192.168.2.0/24"),
        }
    }
}

impl SitePair {
    /// Exchange the two sites
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.site_a, &mut self.site_b);
    }

    /// Give every site that lacks keys a fresh pair; returns how many were generated
    pub fn ensure_keys(&mut self, keys: &mut dyn KeySource) -> usize {
        let mut generated = 0;
        for site in [&mut self.site_a, &mut self.site_b] {
            if !site.has_keys() {
                site.set_keys(keys.key_pair());
                generated += 1;
            }
        }
        generated
    }

    /// Configs for site A and site B, in that order
    pub fn render_pair(&self) -> Result<(String, String), SiteError> {
        for site in [&self.site_a, &self.site_b] {
            if !site.has_keys() {
                return Err(SiteError::MissingKeys(site.name.clone()));
            }
        }
        if self.site_b.endpoint.trim().is_empty() {
            return Err(SiteError::MissingEndpoint(self.site_b.name.clone()));
        }

        Ok((
            render_site(&self.site_a, &self.site_b),
            render_site(&self.site_b, &self.site_a),
        ))
    }
}

/// `wg-quick` config for `local` peering with `remote`
pub fn render_site(local: &Site, remote: &Site) -> String {
    let mut config = String::from("# Site-to-Site WireGuard Configuration\n");
    config.push_str(&format!("# Local Site: {}\n", local.name));
    config.push_str(&format!("# Remote Site: {}\n\n", remote.name));

    config.push_str("[Interface]\n");
    config.push_str(&format!("PrivateKey = {}\n", local.private_key));
    config.push_str(&format!("Address = {}/{}\n", local.tunnel_ip, TRANSFER_PREFIX));
    config.push_str(&format!("ListenPort = {}\n\n", local.port));

    config.push_str("# Routing for local LAN\n");
    config.push_str(&format!(
        "PostUp = {}\n",
        nat_post_up(true, DEFAULT_INTERFACE, DEFAULT_WAN_INTERFACE)
    ));
    config.push_str(&format!(
        "PostDown = {}\n\n",
        nat_post_down(true, DEFAULT_INTERFACE, DEFAULT_WAN_INTERFACE)
    ));

    config.push_str("[Peer]\n");
    config.push_str(&format!("# Remote Site: {}\n", remote.name));
    config.push_str(&format!("PublicKey = {}\n", remote.public_key));
    let endpoint = remote.endpoint.trim();
    if !endpoint.is_empty() {
        config.push_str(&format!("Endpoint = {}:{}\n", endpoint, remote.port));
    }
    config.push_str(&format!("AllowedIPs = {}/32, {}\n", remote.tunnel_ip, remote.lan_network));
    config.push_str(&format!("PersistentKeepalive = {}\n", DEFAULT_KEEPALIVE));

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SequentialKeys;

    fn keyed_pair() -> SitePair {
        let mut pair = SitePair::default();
        pair.ensure_keys(&mut SequentialKeys::default());
        pair.site_b.endpoint = "b.example.net".into();
        pair
    }

    #[test]
    fn test_defaults() {
        let pair = SitePair::default();
        assert_eq!(pair.site_a.tunnel_ip, "10.99.0.1");
        assert_eq!(pair.site_b.lan_network, "192.168.2.0/24");
        assert_eq!(pair.site_b.port, 51820);
    }

    #[test]
    fn test_requires_keys_and_endpoint() {
        let pair = SitePair::default();
        assert_eq!(pair.render_pair(), Err(SiteError::MissingKeys("Site A".into())));

        let mut pair = keyed_pair();
        pair.site_b.endpoint.clear();
        assert_eq!(pair.render_pair(), Err(SiteError::MissingEndpoint("Site B".into())));
    }

    #[test]
    fn test_render_pair() {
        let pair = keyed_pair();
        let (a, b) = pair.render_pair().unwrap();

        assert!(a.contains("Address = 10.99.0.1/30\n"));
        assert!(a.contains(&format!("PublicKey = {}\n", pair.site_b.public_key)));
        assert!(a.contains("Endpoint = b.example.net:51820\n"));
        assert!(a.contains("AllowedIPs = 10.99.0.2/32, 192.168.2.0/24\n"));
        assert!(a.ends_with("PersistentKeepalive = 25\n"));

        // site A has no endpoint, so B waits for A to dial in
        assert!(!b.contains("Endpoint"));
        assert!(b.contains("AllowedIPs = 10.99.0.1/32, 192.168.1.0/24\n"));
    }

    #[test]
    fn test_swap_and_file_name() {
        let mut pair = keyed_pair();
        pair.swap();
        assert_eq!(pair.site_a.name, "Site B");
        assert_eq!(pair.site_a.file_name(), "Site_B_s2s.conf");
        assert_eq!(pair.render_pair(), Err(SiteError::MissingEndpoint("Site A".into())));
    }

    #[test]
    fn test_ensure_keys_keeps_existing() {
        let mut pair = keyed_pair();
        let before = pair.site_a.public_key.clone();
        assert_eq!(pair.ensure_keys(&mut SequentialKeys::default()), 0);
        assert_eq!(pair.site_a.public_key, before);
    }
}
