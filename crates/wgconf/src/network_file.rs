//! Network File
//!
//! Persists one tunnel network as TOML (default) or JSON.
//!
//! ```toml
//! [network]
//! base = "10.50.0.0"
//! peers = 30
//!
//! [settings]
//! default_keepalive = 25
//! interface = "wg0"
//! wan_interface = "eth0"
//!
//! [server]
//! name = "VPN Server"
//! # ...
//!
//! [[peers]]
//! id = 1
//! name = "Client-1"
//! # ...
//!
//! [dyndns]
//! enabled = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use wgconf_export::{DynDnsSettings, NetworkSession, PeerModel, ServerModel, SessionError, SessionSettings, SitePair};
use wgconf_ipam::plan_subnet;

/// Network file errors
#[derive(Debug, thiserror::Error)]
pub enum NetworkFileError {
    #[error("IO error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// On-disk encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Toml,
    Json,
}

impl FileFormat {
    /// `.json` means JSON, anything else TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => FileFormat::Json,
            _ => FileFormat::Toml,
        }
    }
}

/// Address plan inputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSection {
    pub base: String,
    #[serde(default = "default_peers")]
    pub peers: usize,
}

fn default_peers() -> usize {
    30
}

impl NetworkSection {
    /// The CIDR this section plans to
    pub fn cidr(&self) -> String {
        plan_subnet(&self.base, self.peers).cidr
    }
}

/// Everything `wgconf` knows about one network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkFile {
    pub network: NetworkSection,
    #[serde(default)]
    pub settings: SessionSettings,
    pub server: ServerModel,
    #[serde(default)]
    pub peers: Vec<PeerModel>,
    #[serde(default)]
    pub dyndns: DynDnsSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_to_site: Option<SitePair>,
}

impl NetworkFile {
    /// Snapshot a session under the plan that produced it
    pub fn from_session(network: NetworkSection, session: &NetworkSession) -> Self {
        Self {
            network,
            settings: session.settings().clone(),
            server: session.server().clone(),
            peers: session.peers().to_vec(),
            dyndns: session.dyndns().clone(),
            site_to_site: None,
        }
    }

    /// Copy the session's state back, keeping the network section and site pair
    pub fn sync_from(&mut self, session: &NetworkSession) {
        self.settings = session.settings().clone();
        self.server = session.server().clone();
        self.peers = session.peers().to_vec();
        self.dyndns = session.dyndns().clone();
    }

    /// Rebuild the in-memory session, re-claiming every peer address
    pub fn to_session(&self) -> Result<NetworkSession, NetworkFileError> {
        let session = NetworkSession::restore(
            &self.network.cidr(),
            self.server.clone(),
            self.peers.clone(),
            self.dyndns.clone(),
            self.settings.clone(),
        )?;
        Ok(session)
    }

    /// Load by extension
    pub fn load(path: &Path) -> Result<Self, NetworkFileError> {
        debug!("Loading network file {}", path.display());
        match FileFormat::from_path(path) {
            FileFormat::Toml => Self::from_toml_file(path),
            FileFormat::Json => Self::from_json_file(path),
        }
    }

    /// Save by extension
    pub fn save(&self, path: &Path) -> Result<(), NetworkFileError> {
        let content = match FileFormat::from_path(path) {
            FileFormat::Toml => self.to_toml()?,
            FileFormat::Json => self.to_json()?,
        };
        std::fs::write(path, content).map_err(|e| io_error(path, e))?;
        debug!("Saved network file {}", path.display());
        Ok(())
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, NetworkFileError> {
        let content = std::fs::read_to_string(path).map_err(|e| io_error(path, e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, NetworkFileError> {
        toml::from_str(content).map_err(|e| NetworkFileError::Parse(e.to_string()))
    }

    pub fn from_json_file(path: &Path) -> Result<Self, NetworkFileError> {
        let content = std::fs::read_to_string(path).map_err(|e| io_error(path, e))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, NetworkFileError> {
        serde_json::from_str(content).map_err(|e| NetworkFileError::Parse(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String, NetworkFileError> {
        toml::to_string_pretty(self).map_err(|e| NetworkFileError::Serialize(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, NetworkFileError> {
        serde_json::to_string_pretty(self).map_err(|e| NetworkFileError::Serialize(e.to_string()))
    }
}

fn io_error(path: &Path, error: std::io::Error) -> NetworkFileError {
    NetworkFileError::Io {
        path: path.display().to_string(),
        message: error.to_string(),
    }
}
