//! Teltonika RUT
//!
//! RutOS cannot import WireGuard files. The server side is a WebUI guide;
//! clients still get standard `.conf` files.

use super::{server_prefix, Exporter};
use crate::model::{PeerModel, ServerModel};
use wgconf_ipam::{integer_to_address, prefix_mask};

#[derive(Debug, Clone, Copy, Default)]
pub struct TeltonikaExporter;

impl Exporter for TeltonikaExporter {
    fn display_name(&self) -> &'static str {
        "Teltonika RUT"
    }

    fn file_extension(&self) -> &'static str {
        "txt"
    }

    fn export_server(&self, server: &ServerModel, peers: &[PeerModel]) -> String {
        let netmask = integer_to_address(prefix_mask(server_prefix(server)));

        let mut guide = String::from("# Teltonika RUT WireGuard Configuration Guide\n");
        guide.push_str("# Note: Teltonika does NOT support config file import\n");
        guide.push_str("# Manual configuration required via WebUI\n\n");

        guide.push_str("## Step 1: Enable WireGuard\n");
        guide.push_str("1. Navigate to Services > VPN > WireGuard\n");
        guide.push_str("2. Enable WireGuard service\n\n");

        guide.push_str("## Step 2: Configure WireGuard Instance\n");
        guide.push_str("Click \"Add\" to create new instance:\n\n");
        guide.push_str("General Settings:\n");
        guide.push_str(&format!("- Name: {}\n", server.name));
        guide.push_str(&format!("- Private Key: {}\n", server.private_key));
        guide.push_str(&format!("- Listen Port: {}\n", server.listen_port));
        guide.push_str(&format!("- IP Address: {}\n", server.primary_address().unwrap_or_default()));
        guide.push_str(&format!("- Subnet Mask: {}\n", netmask));
        if let Some(mtu) = server.effective_mtu() {
            guide.push_str(&format!("- MTU: {}\n", mtu));
        }
        guide.push('\n');

        guide.push_str("## Step 3: Add Peers\n");
        guide.push_str("For each client, click \"Add Peer\":\n\n");
        for (index, peer) in peers.iter().enumerate() {
            guide.push_str(&format!("### Peer {}: {}\n", index + 1, peer.name));
            guide.push_str(&format!("- Public Key: {}\n", peer.public_key));
            if let Some(psk) = peer.psk() {
                guide.push_str(&format!("- Pre-Shared Key: {}\n", psk));
            }
            guide.push_str(&format!("- Allowed IPs: {}/32\n", peer.address));
            if peer.persistent_keepalive > 0 {
                guide.push_str(&format!("- Persistent Keepalive: {}\n", peer.persistent_keepalive));
            }
            guide.push_str("- Endpoint: (leave empty for incoming connections)\n\n");
        }

        guide.push_str("## Step 4: Firewall Configuration\n");
        guide.push_str("Navigate to Network > Firewall > General Settings\n\n");
        guide.push_str("Add custom rule:\n");
        guide.push_str("- Name: WireGuard\n");
        guide.push_str("- Protocol: UDP\n");
        guide.push_str(&format!("- Port: {}\n", server.listen_port));
        guide.push_str("- Action: Accept\n\n");

        guide.push_str("## Step 5: Apply Configuration\n");
        guide.push_str("Click \"Save & Apply\" to activate WireGuard\n");
        guide
    }
}
