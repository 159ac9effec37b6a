//! OPNsense
//!
//! OPNsense has no config import for WireGuard, so this dialect is a
//! click-through guide carrying the same values.

use super::Exporter;
use crate::dyndns::DynDnsSettings;
use crate::model::{PeerModel, ServerModel};

#[derive(Debug, Clone, Copy, Default)]
pub struct OpnSenseExporter;

impl Exporter for OpnSenseExporter {
    fn display_name(&self) -> &'static str {
        "OPNsense"
    }

    fn file_extension(&self) -> &'static str {
        "txt"
    }

    fn export_server(&self, server: &ServerModel, peers: &[PeerModel]) -> String {
        let mut guide = String::from("# OPNsense WireGuard Configuration Guide\n");
        guide.push_str("# Configure via: VPN > WireGuard > Instances\n\n");

        guide.push_str("## Step 1: Create WireGuard Instance\n");
        guide.push_str("1. Navigate to VPN > WireGuard > Instances\n");
        guide.push_str("2. Click \"+\" to add new instance\n\n");

        guide.push_str("Configuration:\n");
        guide.push_str(&format!("- Name: {}\n", server.name));
        guide.push_str(&format!("- Public Key: {}\n", server.public_key));
        guide.push_str(&format!("- Private Key: {}\n", server.private_key));
        guide.push_str(&format!("- Listen Port: {}\n", server.listen_port));
        guide.push_str(&format!("- Tunnel Address: {}\n", server.addresses.join(", ")));
        if let Some(mtu) = server.effective_mtu() {
            guide.push_str(&format!("- MTU: {}\n", mtu));
        }
        guide.push('\n');

        guide.push_str("## Step 2: Add Peers\n");
        guide.push_str("Navigate to VPN > WireGuard > Peers\n\n");
        for (index, peer) in peers.iter().enumerate() {
            guide.push_str(&format!("### Peer {}: {}\n", index + 1, peer.name));
            guide.push_str(&format!("- Name: {}\n", peer.name));
            guide.push_str(&format!("- Public Key: {}\n", peer.public_key));
            if let Some(psk) = peer.psk() {
                guide.push_str(&format!("- Pre-Shared Key: {}\n", psk));
            }
            guide.push_str(&format!("- Allowed IPs: {}/32\n", peer.address));
            guide.push_str("- Endpoint: (leave empty for road warrior)\n\n");
        }

        guide.push_str("## Step 3: Configure Firewall\n");
        guide.push_str("Navigate to Firewall > Rules > WAN\n\n");
        guide.push_str("Add rule:\n");
        guide.push_str("- Action: Pass\n");
        guide.push_str("- Interface: WAN\n");
        guide.push_str("- Protocol: UDP\n");
        guide.push_str(&format!("- Destination Port: {}\n", server.listen_port));
        guide.push_str("- Description: WireGuard\n\n");

        guide.push_str("## Step 4: Enable Instance\n");
        guide.push_str("Navigate to VPN > WireGuard > Instances\n");
        guide.push_str("Enable the instance checkbox and apply\n");
        guide
    }

    fn export_dyndns(&self, dyndns: &DynDnsSettings) -> Option<String> {
        if !dyndns.is_complete() {
            return Some(String::new());
        }

        let mut guide = String::from("\n## DynDNS Configuration (IPv64.net)\n");
        guide.push_str("Navigate to Services > Dynamic DNS\n\n");
        guide.push_str("Configuration:\n");
        guide.push_str("- Service Type: Custom\n");
        guide.push_str("- Protocol: DynDns2\n");
        guide.push_str("- Server: ipv64.net\n");
        guide.push_str("- Username: none\n");
        guide.push_str(&format!("- Password: {}\n", dyndns.api_key));
        guide.push_str(&format!("- Hostname: {}\n", dyndns.domain));
        guide.push_str("- Check IP Method: ipify-ipv4 or ipify-ipv6\n");
        guide.push_str("- Force SSL: Yes\n");
        Some(guide)
    }
}
