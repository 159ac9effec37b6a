//! Exporter Registry
//!
//! Fixed table of supported platforms.
//!
//! | Key | Platform | Ext | DynDNS |
//! |-----|----------|-----|--------|
//! | standard | WireGuard Standard | conf | - |
//! | mikrotik | MikroTik RouterOS | rsc | yes |
//! | vyos | VyOS | txt | yes |
//! | fritzbox | AVM Fritz!Box | conf | yes |
//! | opnsense | OPNsense | txt | yes |
//! | edgerouter | Ubiquiti EdgeRouter | txt | - |
//! | glinet | GL.iNet Router | conf | - |
//! | teltonika | Teltonika RUT | txt | - |

use super::{
    EdgeRouterExporter, Exporter, FritzBoxExporter, GlInetExporter, MikroTikExporter, OpnSenseExporter,
    StandardExporter, TeltonikaExporter, VyOsExporter,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Platform lookup errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Unknown export kind: {0} (expected server, clients or complete)")]
    UnknownExportKind(String),
}

/// Supported target platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Standard,
    MikroTik,
    VyOs,
    FritzBox,
    OpnSense,
    EdgeRouter,
    GlInet,
    Teltonika,
}

static STANDARD: StandardExporter = StandardExporter;
static MIKROTIK: MikroTikExporter = MikroTikExporter;
static VYOS: VyOsExporter = VyOsExporter;
static FRITZBOX: FritzBoxExporter = FritzBoxExporter;
static OPNSENSE: OpnSenseExporter = OpnSenseExporter;
static EDGEROUTER: EdgeRouterExporter = EdgeRouterExporter;
static GLINET: GlInetExporter = GlInetExporter;
static TELTONIKA: TeltonikaExporter = TeltonikaExporter;

impl Platform {
    /// Every platform in registry order
    pub fn all() -> &'static [Platform] {
        &[
            Platform::Standard,
            Platform::MikroTik,
            Platform::VyOs,
            Platform::FritzBox,
            Platform::OpnSense,
            Platform::EdgeRouter,
            Platform::GlInet,
            Platform::Teltonika,
        ]
    }

    /// Registry key
    pub fn key(&self) -> &'static str {
        match self {
            Platform::Standard => "standard",
            Platform::MikroTik => "mikrotik",
            Platform::VyOs => "vyos",
            Platform::FritzBox => "fritzbox",
            Platform::OpnSense => "opnsense",
            Platform::EdgeRouter => "edgerouter",
            Platform::GlInet => "glinet",
            Platform::Teltonika => "teltonika",
        }
    }

    /// The exporter for this platform
    pub fn exporter(&self) -> &'static dyn Exporter {
        match self {
            Platform::Standard => &STANDARD,
            Platform::MikroTik => &MIKROTIK,
            Platform::VyOs => &VYOS,
            Platform::FritzBox => &FRITZBOX,
            Platform::OpnSense => &OPNSENSE,
            Platform::EdgeRouter => &EDGEROUTER,
            Platform::GlInet => &GLINET,
            Platform::Teltonika => &TELTONIKA,
        }
    }

    pub fn display_name(&self) -> &'static str {
        self.exporter().display_name()
    }

    /// Can this platform render a DynDNS section?
    pub fn supports_dyndns(&self) -> bool {
        matches!(
            self,
            Platform::MikroTik | Platform::VyOs | Platform::FritzBox | Platform::OpnSense
        )
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Platform {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Platform::all()
            .iter()
            .copied()
            .find(|p| p.key() == key)
            .ok_or_else(|| PlatformError::UnknownPlatform(s.to_string()))
    }
}

/// Lookup over [`Platform::all`]
pub struct ExporterRegistry;

impl ExporterRegistry {
    /// Case-insensitive lookup; unknown keys fall back to the standard exporter
    pub fn get(key: &str) -> &'static dyn Exporter {
        Self::platform(key).exporter()
    }

    /// Like [`ExporterRegistry::get`] but returns the resolved platform
    pub fn platform(key: &str) -> Platform {
        key.parse().unwrap_or_else(|_| {
            debug!("Unknown platform '{}', falling back to standard", key);
            Platform::Standard
        })
    }

    /// `(key, display name, extension)` for every platform
    pub fn list() -> Vec<(&'static str, &'static str, &'static str)> {
        Platform::all()
            .iter()
            .map(|p| (p.key(), p.display_name(), p.exporter().file_extension()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dyndns::DynDnsSettings;

    #[test]
    fn test_lookup_case_insensitive() {
        assert_eq!(ExporterRegistry::get("MikroTik").display_name(), "MikroTik RouterOS");
        assert_eq!(ExporterRegistry::get("VYOS").file_extension(), "txt");
    }

    #[test]
    fn test_unknown_falls_back_to_standard() {
        assert_eq!(ExporterRegistry::get("pfsense").display_name(), "WireGuard Standard");
        assert_eq!(ExporterRegistry::get("").file_extension(), "conf");
        assert!("pfsense".parse::<Platform>().is_err());
    }

    #[test]
    fn test_registry_table() {
        let list = ExporterRegistry::list();
        assert_eq!(list.len(), 8);
        assert_eq!(list[1], ("mikrotik", "MikroTik RouterOS", "rsc"));
        assert_eq!(list[7], ("teltonika", "Teltonika RUT", "txt"));
    }

    #[test]
    fn test_dyndns_capability_matches_exporters() {
        let settings = DynDnsSettings::ipv64("home.ipv64.net", "KEY");
        for platform in Platform::all() {
            let section = platform.exporter().export_dyndns(&settings);
            assert_eq!(section.is_some(), platform.supports_dyndns(), "{}", platform);
        }
    }

    #[test]
    fn test_incomplete_dyndns_renders_empty() {
        let settings = DynDnsSettings::ipv64("home.ipv64.net", "");
        assert_eq!(Platform::MikroTik.exporter().export_dyndns(&settings), Some(String::new()));
        assert_eq!(Platform::Standard.exporter().export_dyndns(&settings), None);
    }
}
