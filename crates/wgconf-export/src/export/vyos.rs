//! VyOS `set` commands

use super::{with_prefix, Exporter};
use crate::dyndns::DynDnsSettings;
use crate::model::{PeerModel, ServerModel, DEFAULT_INTERFACE, DEFAULT_WAN_INTERFACE};

#[derive(Debug, Clone, Copy, Default)]
pub struct VyOsExporter;

impl Exporter for VyOsExporter {
    fn display_name(&self) -> &'static str {
        "VyOS"
    }

    fn file_extension(&self) -> &'static str {
        "txt"
    }

    fn export_server(&self, server: &ServerModel, peers: &[PeerModel]) -> String {
        let iface = format!("set interfaces wireguard {}", DEFAULT_INTERFACE);
        let mut config = String::from("# VyOS WireGuard Configuration\n");
        config.push_str("# Enter configuration mode: configure\n\n");

        config.push_str(&format!("{} private-key '{}'\n", iface, server.private_key));
        config.push_str(&format!("{} port '{}'\n", iface, server.listen_port));
        for address in &server.addresses {
            config.push_str(&format!("{} address '{}'\n", iface, with_prefix(address)));
        }
        if let Some(mtu) = server.effective_mtu() {
            config.push_str(&format!("{} mtu '{}'\n", iface, mtu));
        }
        config.push('\n');

        // names may repeat, ids never do
        for peer in peers {
            let node = format!("{} peer {}", iface, peer.id);
            config.push_str(&format!("{} description '{}'\n", node, peer.name.replace('\'', "")));
            config.push_str(&format!("{} public-key '{}'\n", node, peer.public_key));
            if let Some(psk) = peer.psk() {
                config.push_str(&format!("{} preshared-key '{}'\n", node, psk));
            }
            config.push_str(&format!("{} allowed-ips '{}/32'\n", node, peer.address));
            if peer.persistent_keepalive > 0 {
                config.push_str(&format!("{} persistent-keepalive '{}'\n", node, peer.persistent_keepalive));
            }
            config.push('\n');
        }

        config.push_str("# Firewall configuration\n");
        config.push_str("set firewall name WAN_LOCAL rule 10 action 'accept'\n");
        config.push_str("set firewall name WAN_LOCAL rule 10 protocol 'udp'\n");
        config.push_str(&format!(
            "set firewall name WAN_LOCAL rule 10 destination port '{}'\n",
            server.listen_port
        ));
        config.push_str("set firewall name WAN_LOCAL rule 10 description 'WireGuard'\n\n");

        if server.enable_nat {
            config.push_str("# NAT configuration\n");
            config.push_str(&format!("set nat source rule 100 outbound-interface '{}'\n", DEFAULT_INTERFACE));
            config.push_str("set nat source rule 100 translation address 'masquerade'\n\n");
        }

        config.push_str("# Apply configuration\n");
        config.push_str("commit\n");
        config.push_str("save\n");
        config
    }

    fn export_dyndns(&self, dyndns: &DynDnsSettings) -> Option<String> {
        if !dyndns.is_complete() {
            return Some(String::new());
        }

        let service = format!(
            "set service dns dynamic interface {} service ipv64",
            DEFAULT_WAN_INTERFACE
        );
        let mut config = String::from("\n# IPv64.net DynDNS Configuration\n");
        config.push_str(&format!("{} host-name '{}'\n", service, dyndns.domain));
        config.push_str(&format!("{} login 'nobody'\n", service));
        config.push_str(&format!("{} password '{}'\n", service, dyndns.api_key));
        config.push_str(&format!("{} protocol 'dyndns2'\n", service));
        config.push_str(&format!("{} server 'ipv64.net'\n\n", service));
        config.push_str("commit\n");
        config.push_str("save\n");
        Some(config)
    }
}
