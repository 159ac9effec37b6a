//! Platform Exporters
//!
//! Every target platform is an [`Exporter`]: a stateless value that turns the
//! same server and peer records into one dialect's text. Dialects only change
//! syntax and ordering; none of them invents a field the model lacks.
//!
//! ```text
//! ServerModel + [PeerModel] ──► Exporter::export_server   ─► wg0.conf / .rsc / set-commands
//! PeerModel + ServerModel  ──► Exporter::export_client   ─► client .conf
//!                          └─► Exporter::export_complete ─► server + every client (+ DynDNS)
//! ```
//!
//! Rendering is infallible and never re-validates; run [`crate::validate`]
//! first if the input is untrusted.

mod edgerouter;
mod fritzbox;
mod glinet;
mod mikrotik;
mod opnsense;
mod registry;
mod standard;
mod teltonika;
mod vyos;

pub use edgerouter::EdgeRouterExporter;
pub use fritzbox::FritzBoxExporter;
pub use glinet::GlInetExporter;
pub use mikrotik::MikroTikExporter;
pub use opnsense::OpnSenseExporter;
pub use registry::{ExporterRegistry, Platform, PlatformError};
pub use standard::{client_config, server_config, StandardExporter};
pub use teltonika::TeltonikaExporter;
pub use vyos::VyOsExporter;

use crate::dyndns::DynDnsSettings;
use crate::model::{split_prefix, PeerModel, ServerModel};
use std::fmt;
use std::str::FromStr;

/// Prefix assumed by router dialects when the server address carries none
pub const FALLBACK_PREFIX: u8 = 24;

const CLIENT_BANNER: &str = "\n\n# ========================================\n\
                             # Client Configurations\n\
                             # ========================================\n\n";

/// One output dialect
pub trait Exporter: Send + Sync {
    /// Human-readable platform name
    fn display_name(&self) -> &'static str;

    /// File extension without the dot
    fn file_extension(&self) -> &'static str;

    /// Server-side configuration including every peer
    fn export_server(&self, server: &ServerModel, peers: &[PeerModel]) -> String;

    /// Configuration for a single client
    fn export_client(&self, peer: &PeerModel, server: &ServerModel) -> String {
        client_config(peer, server)
    }

    /// DynDNS section in this dialect.
    ///
    /// `None` means the platform has no DynDNS support at all. Supporting
    /// platforms return `Some("")` when the domain or API key is missing.
    fn export_dyndns(&self, _dyndns: &DynDnsSettings) -> Option<String> {
        None
    }

    /// Text placed before the server section of a complete export
    fn complete_preamble(&self) -> &'static str {
        ""
    }

    /// Text placed after everything else in a complete export
    fn complete_epilogue(&self) -> &'static str {
        ""
    }

    /// Server, every client, and DynDNS when supported and active
    fn export_complete(&self, server: &ServerModel, peers: &[PeerModel], dyndns: Option<&DynDnsSettings>) -> String {
        render_complete(self, server, peers, dyndns)
    }
}

/// The uniform complete layout shared by every dialect
pub fn render_complete<E: Exporter + ?Sized>(
    exporter: &E,
    server: &ServerModel,
    peers: &[PeerModel],
    dyndns: Option<&DynDnsSettings>,
) -> String {
    let mut output = String::from(exporter.complete_preamble());
    output.push_str(&exporter.export_server(server, peers));
    output.push_str(CLIENT_BANNER);

    for (index, peer) in peers.iter().enumerate() {
        output.push_str(&format!("# Client {}: {}\n", index + 1, peer.name));
        output.push_str(&format!("# IP: {}\n", peer.address));
        output.push_str(&exporter.export_client(peer, server));
        output.push_str("\n\n");
    }

    if let Some(section) = dyndns
        .filter(|d| d.is_active())
        .and_then(|d| exporter.export_dyndns(d))
    {
        output.push_str(&section);
    }

    output.push_str(exporter.complete_epilogue());
    output
}

/// Every client config back to back, each under a numbered header
pub fn render_clients<E: Exporter + ?Sized>(exporter: &E, server: &ServerModel, peers: &[PeerModel]) -> String {
    let mut output = String::from("# Client Configurations\n\n");
    for (index, peer) in peers.iter().enumerate() {
        output.push_str(&format!("# Client {}: {}\n", index + 1, peer.name));
        output.push_str(&exporter.export_client(peer, server));
        output.push_str("\n\n");
    }
    output
}

/// What to export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportKind {
    Server,
    Clients,
    Complete,
}

impl ExportKind {
    pub fn all() -> &'static [ExportKind] {
        &[ExportKind::Server, ExportKind::Clients, ExportKind::Complete]
    }

    pub fn key(&self) -> &'static str {
        match self {
            ExportKind::Server => "server",
            ExportKind::Clients => "clients",
            ExportKind::Complete => "complete",
        }
    }

    /// Download name, e.g. `wireguard-server.rsc`
    pub fn file_name(&self, extension: &str) -> String {
        format!("wireguard-{}.{}", self.key(), extension)
    }

    /// Render this kind with `exporter`
    pub fn render(
        &self,
        exporter: &dyn Exporter,
        server: &ServerModel,
        peers: &[PeerModel],
        dyndns: Option<&DynDnsSettings>,
    ) -> String {
        match self {
            ExportKind::Server => exporter.export_server(server, peers),
            ExportKind::Clients => render_clients(exporter, server, peers),
            ExportKind::Complete => exporter.export_complete(server, peers, dyndns),
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ExportKind {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "server" => Ok(ExportKind::Server),
            "clients" | "all-clients" => Ok(ExportKind::Clients),
            "complete" => Ok(ExportKind::Complete),
            _ => Err(PlatformError::UnknownExportKind(s.to_string())),
        }
    }
}

/// `10.50.0.1/27` stays as is, `10.50.0.1` becomes `10.50.0.1/24`
pub(crate) fn with_prefix(address: &str) -> String {
    match split_prefix(address) {
        (_, Some(_)) => address.to_string(),
        (host, None) => format!("{}/{}", host, FALLBACK_PREFIX),
    }
}

/// Prefix of the server's first address, or the fallback
pub(crate) fn server_prefix(server: &ServerModel) -> u8 {
    server.tunnel_prefix().unwrap_or(FALLBACK_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_prefix() {
        assert_eq!(with_prefix("10.50.0.1/27"), "10.50.0.1/27");
        assert_eq!(with_prefix("10.50.0.1"), "10.50.0.1/24");
    }

    #[test]
    fn test_export_kind_names() {
        assert_eq!(ExportKind::Server.file_name("rsc"), "wireguard-server.rsc");
        assert_eq!(ExportKind::Clients.file_name("conf"), "wireguard-clients.conf");
        assert_eq!("all-clients".parse::<ExportKind>().unwrap(), ExportKind::Clients);
        assert_eq!("COMPLETE".parse::<ExportKind>().unwrap(), ExportKind::Complete);
        assert!("zip".parse::<ExportKind>().is_err());
    }
}
