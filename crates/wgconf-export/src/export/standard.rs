//! Plain `wg-quick` configuration, the grammar every other dialect falls
//! back to for client files.

use super::Exporter;
use crate::model::{PeerModel, ServerModel};

/// `wg-quick` server config with one `[Peer]` block per client
pub fn server_config(server: &ServerModel, peers: &[PeerModel]) -> String {
    let mut config = String::from("[Interface]\n");
    config.push_str(&format!("PrivateKey = {}\n", server.private_key));
    config.push_str(&format!("Address = {}\n", server.addresses.join(", ")));
    config.push_str(&format!("ListenPort = {}\n", server.listen_port));

    if let Some(mtu) = server.effective_mtu() {
        config.push_str(&format!("MTU = {}\n", mtu));
    }
    if !server.dns.is_empty() {
        config.push_str(&format!("DNS = {}\n", server.dns.join(", ")));
    }
    if !server.post_up.is_empty() {
        config.push_str(&format!("PostUp = {}\n", server.post_up));
    }
    if !server.post_down.is_empty() {
        config.push_str(&format!("PostDown = {}\n", server.post_down));
    }

    for peer in peers {
        config.push_str("\n[Peer]\n");
        config.push_str(&format!("PublicKey = {}\n", peer.public_key));
        if let Some(psk) = peer.psk() {
            config.push_str(&format!("PresharedKey = {}\n", psk));
        }
        config.push_str(&format!("AllowedIPs = {}/32\n", peer.address));
    }

    config
}

/// `wg-quick` client config pointing at `server`
pub fn client_config(peer: &PeerModel, server: &ServerModel) -> String {
    let mut config = String::from("[Interface]\n");
    config.push_str(&format!("PrivateKey = {}\n", peer.private_key));
    config.push_str(&format!("Address = {}/32\n", peer.address));

    if !peer.dns.is_empty() {
        config.push_str(&format!("DNS = {}\n", peer.dns.join(", ")));
    }
    if let Some(mtu) = peer.effective_mtu(server) {
        config.push_str(&format!("MTU = {}\n", mtu));
    }

    config.push_str("\n[Peer]\n");
    config.push_str(&format!("PublicKey = {}\n", server.public_key));
    if let Some(psk) = peer.psk() {
        config.push_str(&format!("PresharedKey = {}\n", psk));
    }
    if let Some(endpoint) = server.endpoint_address() {
        config.push_str(&format!("Endpoint = {}\n", endpoint));
    }
    config.push_str(&format!("AllowedIPs = {}\n", peer.allowed_ips_or_full_tunnel()));
    config.push_str(&format!("PersistentKeepalive = {}\n", peer.persistent_keepalive));

    config
}

/// WireGuard Standard (`.conf`)
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardExporter;

impl Exporter for StandardExporter {
    fn display_name(&self) -> &'static str {
        "WireGuard Standard"
    }

    fn file_extension(&self) -> &'static str {
        "conf"
    }

    fn export_server(&self, server: &ServerModel, peers: &[PeerModel]) -> String {
        server_config(server, peers)
    }

    fn complete_preamble(&self) -> &'static str {
        "# WireGuard Server Configuration\n# Save as /etc/wireguard/wg0.conf\n\n"
    }
}
