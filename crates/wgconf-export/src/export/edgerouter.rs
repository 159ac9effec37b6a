//! Ubiquiti EdgeRouter (EdgeOS) `set` commands

use super::{with_prefix, Exporter};
use crate::model::{PeerModel, ServerModel, DEFAULT_INTERFACE};

#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeRouterExporter;

impl Exporter for EdgeRouterExporter {
    fn display_name(&self) -> &'static str {
        "Ubiquiti EdgeRouter"
    }

    fn file_extension(&self) -> &'static str {
        "txt"
    }

    fn export_server(&self, server: &ServerModel, peers: &[PeerModel]) -> String {
        let iface = format!("set interfaces wireguard {}", DEFAULT_INTERFACE);
        let mut config = String::from("# Ubiquiti EdgeRouter WireGuard Configuration\n");
        config.push_str("# SSH into EdgeRouter and enter configuration mode\n\n");
        config.push_str("configure\n\n");

        config.push_str(&format!("{} private-key {}\n", iface, server.private_key));
        config.push_str(&format!("{} listen-port {}\n", iface, server.listen_port));
        for address in &server.addresses {
            config.push_str(&format!("{} address {}\n", iface, with_prefix(address)));
        }
        if let Some(mtu) = server.effective_mtu() {
            config.push_str(&format!("{} mtu {}\n", iface, mtu));
        }
        config.push_str(&format!("{} route-allowed-ips true\n\n", iface));

        // EdgeOS keys peers by their public key
        for peer in peers {
            let node = format!("{} peer {}", iface, peer.public_key);
            config.push_str(&format!("{} allowed-ips {}/32\n", node, peer.address));
            if let Some(psk) = peer.psk() {
                config.push_str(&format!("{} preshared-key {}\n", node, psk));
            }
            if peer.persistent_keepalive > 0 {
                config.push_str(&format!("{} persistent-keepalive {}\n", node, peer.persistent_keepalive));
            }
        }

        config.push_str("\n# Firewall rule to allow WireGuard\n");
        config.push_str("set firewall name WAN_LOCAL rule 20 action accept\n");
        config.push_str("set firewall name WAN_LOCAL rule 20 protocol udp\n");
        config.push_str(&format!(
            "set firewall name WAN_LOCAL rule 20 destination port {}\n",
            server.listen_port
        ));
        config.push_str("set firewall name WAN_LOCAL rule 20 description \"WireGuard\"\n\n");

        if server.enable_nat {
            config.push_str("# NAT masquerade for VPN clients\n");
            config.push_str(&format!("set service nat rule 5000 outbound-interface {}\n", DEFAULT_INTERFACE));
            config.push_str("set service nat rule 5000 type masquerade\n");
            config.push_str("set service nat rule 5000 description \"WireGuard NAT\"\n\n");
        }

        config.push_str("commit\n");
        config.push_str("save\n");
        config.push_str("exit\n");
        config
    }
}
