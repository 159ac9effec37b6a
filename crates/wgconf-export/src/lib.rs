//! wgconf Export - WireGuard network model, validation and platform exporters
//!
//! Turns a planned tunnel network into deployable configuration text for
//! `wg-quick` and a set of router platforms.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       NetworkSession                         │
//! │                                                              │
//! │  ┌─────────────┐   ┌──────────────┐   ┌──────────────────┐   │
//! │  │ AddressPool │──▶│ ServerModel  │──▶│ ExporterRegistry │──▶ text
//! │  │ (ipam)      │   │ [PeerModel]  │   │  standard, rsc,  │   │
//! │  └─────────────┘   └──────┬───────┘   │  vyos, ...       │   │
//! │                           │           └──────────────────┘   │
//! │         KeySource ────────┘                                  │
//! │         (host supplied)   └──▶ validate_network()            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Features
//!
//! - **Eight dialects**: standard, MikroTik, VyOS, Fritz!Box, OPNsense,
//!   EdgeRouter, GL.iNet, Teltonika
//! - **Deterministic output**: same model, same bytes
//! - **Accumulating validation**: every finding in one pass
//! - **IPv64.net DynDNS** sections for routers that support it
//! - **Site-to-site** gateway pairs
//!
//! The crate never generates key material and performs no I/O.

pub mod dyndns;
pub mod export;
mod keys;
mod model;
mod session;
mod site;
mod validate;

pub use dyndns::DynDnsSettings;
pub use export::{ExportKind, Exporter, ExporterRegistry, Platform, PlatformError};
pub use keys::{check_key, is_valid_key, KeyError, KeyPair, KeySource, ENCODED_KEY_LEN, KEY_LEN};
pub use model::{
    build_peer, build_server, nat_post_down, nat_post_up, sanitize_file_stem, split_prefix, AllowedIpsMode, PeerId,
    PeerModel, RawPeer, RawServer, ServerModel, DEFAULT_INTERFACE, DEFAULT_KEEPALIVE, DEFAULT_LISTEN_PORT,
    DEFAULT_MTU, DEFAULT_SERVER_NAME, DEFAULT_WAN_INTERFACE, FULL_TUNNEL,
};
pub use session::{
    NetworkSession, ResizeReport, SessionError, SessionSettings, DEFAULT_NAME_PATTERN, ORDINAL_PLACEHOLDER,
};
pub use site::{render_site, Site, SiteError, SitePair, TRANSFER_PREFIX};
pub use validate::{
    is_valid_endpoint, is_valid_interface_address, is_valid_network, validate_dyndns, validate_network,
    validate_peer, validate_server, ValidationReport, MAX_KEEPALIVE, MAX_MTU, MIN_MTU,
};
