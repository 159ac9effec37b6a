//! Subcommand implementations
//!
//! Each command loads the network file, works on a [`NetworkSession`], and
//! writes the file back when something changed.

use crate::keygen::X25519KeySource;
use crate::network_file::{NetworkFile, NetworkSection};
use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::ExitCode;
use tracing::{info, warn};
use wgconf_export::dyndns::linux_cron_line;
use wgconf_export::{
    sanitize_file_stem, validate_dyndns, DynDnsSettings, ExportKind, ExporterRegistry, NetworkSession, Platform, RawServer,
    SitePair,
};
use wgconf_ipam::{parse_cidr, plan_subnet_checked};

/// Options for `wgconf init`
pub struct InitOptions {
    pub base: String,
    pub peers: usize,
    pub name: Option<String>,
    pub endpoint: Option<String>,
    pub dns: Vec<String>,
    pub nat: bool,
    pub force: bool,
}

fn load(file: &Path) -> Result<(NetworkFile, NetworkSession)> {
    let network = NetworkFile::load(file)
        .with_context(|| format!("Failed to load {} (run `wgconf init` first?)", file.display()))?;
    let session = network
        .to_session()
        .with_context(|| format!("Network file {} is inconsistent", file.display()))?;
    Ok((network, session))
}

fn save(file: &Path, network: &mut NetworkFile, session: &NetworkSession) -> Result<()> {
    network.sync_from(session);
    network
        .save(file)
        .with_context(|| format!("Failed to write {}", file.display()))
}

pub fn init(file: &Path, options: InitOptions) -> Result<ExitCode> {
    if file.exists() && !options.force {
        bail!("{} already exists (use --force to overwrite)", file.display());
    }

    let keys = X25519KeySource::generate_pair();
    let raw = RawServer {
        name: options.name,
        private_key: Some(keys.private_key),
        public_key: Some(keys.public_key),
        endpoint: options.endpoint,
        dns: (!options.dns.is_empty()).then_some(options.dns),
        enable_nat: Some(options.nat),
        ..Default::default()
    };

    let section = NetworkSection {
        base: options.base,
        peers: options.peers,
    };
    let session = NetworkSession::new(&section.base, section.peers, &raw).context("Failed to plan network")?;
    let mut network = NetworkFile::from_session(section, &session);
    save(file, &mut network, &session)?;

    info!("Wrote {}", file.display());
    println!("Network:     {}", session.cidr());
    println!("Server:      {} ({})", session.server().name, session.server().addresses.join(", "));
    println!("Public key:  {}", session.server().public_key);
    println!("Capacity:    {} peers", session.utilization().total);
    Ok(ExitCode::SUCCESS)
}

pub fn plan(base: &str, peers: usize) -> Result<ExitCode> {
    let plan = plan_subnet_checked(base, peers)?;
    let subnet = parse_cidr(&plan.cidr)?;

    println!("Subnet:      {}", subnet);
    println!("Netmask:     {}", subnet.netmask());
    println!("Broadcast:   {}", subnet.broadcast_address());
    println!("Server:      {}", subnet.first_usable());
    println!("Peers:       {} - {}", add_one(subnet.first_usable()), subnet.last_usable());
    println!(
        "Capacity:    {} usable, {} for peers",
        plan.usable_address_count,
        plan.usable_address_count.saturating_sub(1)
    );
    if peers as u64 > plan.usable_address_count {
        warn!("{} peers requested; the largest plan holds {}", peers, plan.usable_address_count);
    }
    Ok(ExitCode::SUCCESS)
}

fn add_one(address: std::net::Ipv4Addr) -> std::net::Ipv4Addr {
    std::net::Ipv4Addr::from(u32::from(address).saturating_add(1))
}

pub fn add_peer(file: &Path, name: Option<String>, count: Option<usize>, pattern: &str) -> Result<ExitCode> {
    let (mut network, mut session) = load(file)?;
    let mut keys = X25519KeySource;

    let added = match count {
        Some(count) => {
            let ids = session.add_peers(count, pattern, &mut keys);
            if ids.len() < count {
                warn!("Only {} of {} peers added: {} is full", ids.len(), count, session.cidr());
            }
            ids
        }
        None => match session.add_peer(name.as_deref(), &mut keys) {
            Some(peer) => vec![peer.id],
            None => bail!("Address pool {} is exhausted; run `wgconf resize` first", session.cidr()),
        },
    };

    for id in &added {
        if let Some(peer) = session.peer(*id) {
            println!("Added {} ({}) at {}", peer.name, peer.id, peer.address);
        }
    }

    save(file, &mut network, &session)?;
    Ok(ExitCode::SUCCESS)
}

pub fn remove_peer(file: &Path, query: &str) -> Result<ExitCode> {
    let (mut network, mut session) = load(file)?;
    let Some(id) = session.find_peer(query).map(|p| p.id) else {
        bail!("No peer named or numbered '{}'", query);
    };

    let removed = session.remove_peer(id)?;
    println!("Removed {} ({}), {} is free again", removed.name, removed.id, removed.address);

    save(file, &mut network, &session)?;
    Ok(ExitCode::SUCCESS)
}

pub fn list(file: &Path) -> Result<ExitCode> {
    let (_, session) = load(file)?;
    let server = session.server();
    let usage = session.utilization();

    println!("Network:   {} ({}/{} used, {}%)", session.cidr(), usage.used, usage.total, usage.percent_used);
    println!("Server:    {} {} port {}", server.name, server.addresses.join(", "), server.listen_port);
    if let Some(endpoint) = server.endpoint_address() {
        println!("Endpoint:  {}", endpoint);
    }
    if session.dyndns().is_active() {
        println!("DynDNS:    {}", session.dyndns().domain);
    }
    println!();

    if session.peers().is_empty() {
        println!("No peers configured. Add one with `wgconf add-peer`.");
        return Ok(ExitCode::SUCCESS);
    }

    println!("{:<8} {:<20} {:<16} {:<6} PUBLIC KEY", "ID", "NAME", "ADDRESS", "PSK");
    for peer in session.peers() {
        println!(
            "{:<8} {:<20} {:<16} {:<6} {}",
            peer.id.to_string(),
            peer.name,
            peer.address,
            if peer.psk().is_some() { "yes" } else { "no" },
            peer.public_key
        );
    }
    Ok(ExitCode::SUCCESS)
}

pub fn validate(file: &Path) -> Result<ExitCode> {
    let (_, session) = load(file)?;
    let report = session.validate();

    if report.is_valid() {
        println!("{}", report);
        return Ok(ExitCode::SUCCESS);
    }
    print!("{}", report);
    Ok(ExitCode::from(1))
}

pub fn export(
    file: &Path,
    platform: Platform,
    kind: ExportKind,
    peer: Option<&str>,
    output: Option<&Path>,
) -> Result<ExitCode> {
    let (_, session) = load(file)?;
    let exporter = platform.exporter();

    let report = session.validate();
    if !report.is_valid() {
        warn!("Exporting a configuration with {} validation findings", report.len());
    }

    let (text, file_name) = match peer {
        Some(query) => {
            let Some(peer) = session.find_peer(query) else {
                bail!("No peer named or numbered '{}'", query);
            };
            let text = exporter.export_client(peer, session.server());
            let name = format!("{}.{}", sanitize_file_stem(&peer.name), exporter.file_extension());
            (text, name)
        }
        None => (session.export(platform, kind), kind.file_name(exporter.file_extension())),
    };

    match output {
        Some(path) => {
            let target = if path.is_dir() { path.join(file_name) } else { path.to_path_buf() };
            std::fs::write(&target, text).with_context(|| format!("Failed to write {}", target.display()))?;
            info!("Wrote {} config to {}", exporter.display_name(), target.display());
        }
        None => print!("{}", text),
    }
    Ok(ExitCode::SUCCESS)
}

pub fn platforms() -> Result<ExitCode> {
    println!("{:<12} {:<22} {:<5} DYNDNS", "KEY", "PLATFORM", "EXT");
    for (key, name, ext) in ExporterRegistry::list() {
        let dyndns = ExporterRegistry::platform(key).supports_dyndns();
        println!("{:<12} {:<22} {:<5} {}", key, name, ext, if dyndns { "yes" } else { "-" });
    }
    Ok(ExitCode::SUCCESS)
}

pub fn resize(file: &Path, base: Option<String>, peers: usize) -> Result<ExitCode> {
    let (mut network, mut session) = load(file)?;
    let base = base.unwrap_or_else(|| network.network.base.clone());

    let report = session
        .resize(&base, peers)
        .with_context(|| format!("Cannot resize to {} peers", peers))?;
    network.network = NetworkSection { base, peers };

    println!("Resized {} -> {}", report.old_cidr, report.new_cidr);
    println!("Kept {} peer addresses", report.kept);
    for (id, from, to) in &report.moved {
        println!("Moved {}: {} -> {}", id, from, to);
    }
    if !report.moved.is_empty() {
        warn!("{} client configs changed and must be redistributed", report.moved.len());
    }

    save(file, &mut network, &session)?;
    Ok(ExitCode::SUCCESS)
}

pub fn dyndns(file: &Path, domain: Option<String>, api_key: Option<String>, disable: bool) -> Result<ExitCode> {
    let (mut network, mut session) = load(file)?;
    let mut settings = session.dyndns().clone();

    if disable {
        settings.enabled = false;
    } else {
        let current = settings.clone();
        settings = DynDnsSettings::ipv64(
            domain.as_deref().unwrap_or(&current.domain),
            api_key.as_deref().unwrap_or(&current.api_key),
        );
        let findings = validate_dyndns(&settings);
        if !findings.is_empty() {
            bail!("Invalid DynDNS settings: {}", findings.join("; "));
        }
        if session.server().endpoint.is_none() {
            session.set_endpoint(Some(&settings.domain));
            info!("Server endpoint set to {}", settings.domain);
        }
    }

    if settings.is_active() {
        println!("DynDNS enabled for {}", settings.domain);
        println!("{}", linux_cron_line(&settings.api_key, &settings.domain));
    } else {
        println!("DynDNS disabled");
    }

    session.set_dyndns(settings);
    save(file, &mut network, &session)?;
    Ok(ExitCode::SUCCESS)
}

pub fn site_to_site(file: &Path, swap: bool, endpoint: Option<String>, output: Option<&Path>) -> Result<ExitCode> {
    let (mut network, session) = load(file)?;
    let pair = network.site_to_site.get_or_insert_with(SitePair::default);

    if swap {
        pair.swap();
    }
    if let Some(endpoint) = endpoint {
        pair.site_b.endpoint = endpoint;
    }
    let generated = pair.ensure_keys(&mut X25519KeySource);
    if generated > 0 {
        info!("Generated keys for {} site(s)", generated);
    }

    let rendered = pair.render_pair();
    let pair = pair.clone();
    save(file, &mut network, &session)?;
    let (config_a, config_b) = rendered?;

    match output {
        Some(dir) => {
            for (site, config) in [(&pair.site_a, &config_a), (&pair.site_b, &config_b)] {
                let target = dir.join(site.file_name());
                std::fs::write(&target, config).with_context(|| format!("Failed to write {}", target.display()))?;
                println!("Wrote {}", target.display());
            }
        }
        None => {
            println!("# ===== {} ({}) =====", pair.site_a.name, pair.site_a.file_name());
            println!("{}", config_a);
            println!("# ===== {} ({}) =====", pair.site_b.name, pair.site_b.file_name());
            print!("{}", config_b);
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn genkey(psk: bool) -> Result<ExitCode> {
    let pair = X25519KeySource::generate_pair();
    println!("PrivateKey = {}", pair.private_key);
    println!("PublicKey = {}", pair.public_key);
    if psk {
        println!("PresharedKey = {}", X25519KeySource::generate_preshared());
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_options(peers: usize) -> InitOptions {
        InitOptions {
            base: "10.50.0.0".into(),
            peers,
            name: None,
            endpoint: Some("vpn.example.com".into()),
            dns: vec!["1.1.1.1".into()],
            nat: true,
            force: false,
        }
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("wgconf.toml");

        init(&file, init_options(6)).unwrap();
        assert!(init(&file, init_options(6)).is_err());

        let mut forced = init_options(6);
        forced.force = true;
        assert!(init(&file, forced).is_ok());
    }

    #[test]
    fn test_peer_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("wgconf.toml");
        init(&file, init_options(6)).unwrap();

        add_peer(&file, None, Some(3), "Client-{n}").unwrap();
        add_peer(&file, Some("laptop".into()), None, "Client-{n}").unwrap();
        assert_eq!(validate(&file).unwrap(), ExitCode::SUCCESS);

        remove_peer(&file, "Client-2").unwrap();
        let (network, session) = load(&file).unwrap();
        assert_eq!(network.peers.len(), 3);
        assert!(session.find_peer("Client-2").is_none());
        assert!(remove_peer(&file, "Client-2").is_err());
    }

    #[test]
    fn test_add_peer_fails_when_full() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("wgconf.toml");
        init(&file, init_options(6)).unwrap();

        add_peer(&file, None, Some(10), "Client-{n}").unwrap();
        assert!(add_peer(&file, None, None, "Client-{n}").is_err());

        resize(&file, None, 14).unwrap();
        assert!(add_peer(&file, None, None, "Client-{n}").is_ok());
        let (network, _) = load(&file).unwrap();
        assert_eq!(network.network.peers, 14);
    }

    #[test]
    fn test_export_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("wgconf.toml");
        init(&file, init_options(6)).unwrap();
        add_peer(&file, None, Some(2), "Client-{n}").unwrap();

        export(&file, Platform::MikroTik, ExportKind::Server, None, Some(dir.path())).unwrap();
        let script = std::fs::read_to_string(dir.path().join("wireguard-server.rsc")).unwrap();
        assert!(script.contains("/interface wireguard peers"));
        assert!(script.contains("/ip firewall nat"));

        export(&file, Platform::Standard, ExportKind::Complete, Some("Client-1"), Some(dir.path())).unwrap();
        let client = std::fs::read_to_string(dir.path().join("Client_1.conf")).unwrap();
        assert!(client.contains("Endpoint = vpn.example.com:51820"));
    }

    #[test]
    fn test_validate_reports_findings() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("wgconf.toml");
        init(&file, init_options(6)).unwrap();
        add_peer(&file, None, Some(1), "Client-{n}").unwrap();

        let mut network = NetworkFile::load(&file).unwrap();
        network.peers[0].public_key = "broken".into();
        network.save(&file).unwrap();

        assert_eq!(validate(&file).unwrap(), ExitCode::from(1));
    }

    #[test]
    fn test_dyndns_and_site_to_site() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("wgconf.toml");
        let mut options = init_options(6);
        options.endpoint = None;
        init(&file, options).unwrap();

        assert!(dyndns(&file, Some("home.example.com".into()), Some("KEY".into()), false).is_err());
        dyndns(&file, Some("home.ipv64.net".into()), Some("KEY".into()), false).unwrap();
        let (network, _) = load(&file).unwrap();
        assert!(network.dyndns.is_active());
        assert_eq!(network.server.endpoint.as_deref(), Some("home.ipv64.net"));

        // site B has no endpoint yet; keys are still generated and kept
        assert!(site_to_site(&file, false, None, None).is_err());
        let (network, _) = load(&file).unwrap();
        let pair = network.site_to_site.unwrap();
        assert!(pair.site_a.has_keys() && pair.site_b.has_keys());

        site_to_site(&file, false, Some("b.example.net".into()), Some(dir.path())).unwrap();
        assert!(dir.path().join("Site_A_s2s.conf").exists());
        assert!(dir.path().join("Site_B_s2s.conf").exists());
    }
}
