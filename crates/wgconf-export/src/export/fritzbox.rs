//! AVM Fritz!Box
//!
//! The box imports plain `wg-quick` files, so the server section is the
//! standard config wrapped in import hints. DynDNS is a step-by-step guide
//! for the custom-provider form.

use super::{standard::server_config, Exporter};
use crate::dyndns::{update_url_with_ip, DynDnsSettings};
use crate::model::{PeerModel, ServerModel};

#[derive(Debug, Clone, Copy, Default)]
pub struct FritzBoxExporter;

impl Exporter for FritzBoxExporter {
    fn display_name(&self) -> &'static str {
        "AVM Fritz!Box"
    }

    fn file_extension(&self) -> &'static str {
        "conf"
    }

    fn export_server(&self, server: &ServerModel, peers: &[PeerModel]) -> String {
        let mut output = String::from("# Fritz!Box WireGuard Server Configuration\n");
        output.push_str("# Import via: Internet > Freigaben > WireGuard\n\n");
        output.push_str(&server_config(server, peers));
        output.push_str("\n\n# Note: Fritz!Box may require manual peer configuration via WebUI\n");
        output
    }

    fn export_dyndns(&self, dyndns: &DynDnsSettings) -> Option<String> {
        if !dyndns.is_complete() {
            return Some(String::new());
        }

        // the box fills in <ipaddr> and <ip6addr> itself
        let url = update_url_with_ip(&dyndns.api_key, &dyndns.domain, Some("<ipaddr>"), Some("<ip6addr>"));

        let mut guide = String::from("\n# Fritz!Box DynDNS Configuration for IPv64.net\n");
        guide.push_str("# Configure via: Internet > Freigaben > DynDNS\n\n");
        guide.push_str("1. DynDNS-Anbieter: Benutzerdefiniert\n");
        guide.push_str(&format!("2. Update-URL: {}\n", url));
        guide.push_str(&format!("3. Domainname: {}\n", dyndns.domain));
        guide.push_str("4. Benutzername: none (must not be empty - type \"none\")\n");
        guide.push_str("5. Kennwort: none (must not be empty - type \"none\")\n\n");
        guide.push_str("# Note: Fritz!Box requires non-empty username/password fields\n");
        guide.push_str("# The actual authentication is done via the API key in the URL\n");
        Some(guide)
    }
}
