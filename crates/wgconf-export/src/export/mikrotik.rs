//! MikroTik RouterOS script (`.rsc`)

use super::{with_prefix, Exporter};
use crate::dyndns::{update_url, DynDnsSettings};
use crate::model::{PeerModel, ServerModel, DEFAULT_INTERFACE};

#[derive(Debug, Clone, Copy, Default)]
pub struct MikroTikExporter;

impl Exporter for MikroTikExporter {
    fn display_name(&self) -> &'static str {
        "MikroTik RouterOS"
    }

    fn file_extension(&self) -> &'static str {
        "rsc"
    }

    fn export_server(&self, server: &ServerModel, peers: &[PeerModel]) -> String {
        let wg = DEFAULT_INTERFACE;
        let mut script = String::from("# MikroTik RouterOS WireGuard Configuration\n");
        script.push_str("# Paste into Terminal or save as .rsc and import\n\n");

        script.push_str("/interface wireguard\n");
        script.push_str(&format!(
            "add name={} listen-port={} private-key=\"{}\"",
            wg, server.listen_port, server.private_key
        ));
        if let Some(mtu) = server.effective_mtu() {
            script.push_str(&format!(" mtu={}", mtu));
        }
        script.push_str("\n\n");

        script.push_str("/ip address\n");
        for address in &server.addresses {
            script.push_str(&format!("add address={} interface={}\n", with_prefix(address), wg));
        }

        script.push_str("\n/interface wireguard peers\n");
        for peer in peers {
            script.push_str(&format!("add interface={} public-key=\"{}\"", wg, peer.public_key));
            if let Some(psk) = peer.psk() {
                script.push_str(&format!(" preshared-key=\"{}\"", psk));
            }
            script.push_str(&format!(" allowed-address={}/32", peer.address));
            script.push_str(&format!(" comment=\"{}\"\n", peer.name));
        }

        script.push_str("\n/ip firewall filter\n");
        script.push_str(&format!(
            "add chain=input protocol=udp dst-port={} action=accept place-before=0 comment=\"WireGuard\"\n",
            server.listen_port
        ));

        if server.enable_nat {
            script.push_str("\n/ip firewall nat\n");
            script.push_str(&format!(
                "add chain=srcnat out-interface={} action=masquerade comment=\"WireGuard NAT\"\n",
                wg
            ));
        }

        script
    }

    fn export_dyndns(&self, dyndns: &DynDnsSettings) -> Option<String> {
        if !dyndns.is_complete() {
            return Some(String::new());
        }

        let mut script = String::from("\n# IPv64.net DynDNS Configuration\n");
        script.push_str("/system scheduler\n");
        script.push_str("add name=\"ipv64-dyndns\" interval=1h on-event={\n");
        script.push_str(&format!(
            "  /tool fetch url=\"{}\" keep-result=no\n",
            update_url(&dyndns.api_key, &dyndns.domain)
        ));
        script.push_str("} comment=\"IPv64.net DynDNS Update\"\n");
        Some(script)
    }

    fn complete_epilogue(&self) -> &'static str {
        "\n# Configuration complete!\n# Server is now ready to accept WireGuard connections\n"
    }
}
