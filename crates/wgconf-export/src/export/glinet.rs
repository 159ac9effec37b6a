//! GL.iNet travel routers
//!
//! Both sides accept `wg-quick` files; client files get import notes.

use super::{standard, Exporter};
use crate::model::{PeerModel, ServerModel};

#[derive(Debug, Clone, Copy, Default)]
pub struct GlInetExporter;

impl Exporter for GlInetExporter {
    fn display_name(&self) -> &'static str {
        "GL.iNet Router"
    }

    fn file_extension(&self) -> &'static str {
        "conf"
    }

    fn export_server(&self, server: &ServerModel, peers: &[PeerModel]) -> String {
        let mut output = String::from("# GL.iNet WireGuard Server Configuration\n");
        output.push_str("# Import via: VPN > WireGuard Server\n\n");
        output.push_str(&standard::server_config(server, peers));
        output
    }

    fn export_client(&self, peer: &PeerModel, server: &ServerModel) -> String {
        let mut config = String::from("# GL.iNet WireGuard Client Configuration\n");
        config.push_str("# Import via: VPN > WireGuard Client > Set Up WireGuard Manually\n");
        config.push_str("# You can paste this config or upload the .conf file\n\n");
        config.push_str(&standard::client_config(peer, server));
        config.push_str("\n# GL.iNet Specific Settings:\n");
        config.push_str("# - Enable \"Block Non-VPN Traffic\" for kill switch\n");
        config.push_str("# - Enable \"Auto Reconnect\" for reliability\n");
        if let Some(mtu) = peer.effective_mtu(server) {
            config.push_str(&format!("# - MTU is set to {} for travel router uplinks\n", mtu));
        }
        config
    }

    fn complete_preamble(&self) -> &'static str {
        "# GL.iNet Complete WireGuard Setup\n\n"
    }
}
