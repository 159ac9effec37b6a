//! wgconf: WireGuard network planner and multi-platform config exporter
//!
//! Plans a tunnel subnet, manages peers in a network file, and renders
//! configurations for `wg-quick` and router platforms. Logs go to stderr so
//! exported configs on stdout can be piped.

mod commands;
mod keygen;
mod network_file;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use wgconf_export::{ExportKind, Platform, DEFAULT_NAME_PATTERN};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "wgconf", version, about = "WireGuard network planner and config exporter")]
struct Cli {
    /// Network file (.toml or .json)
    #[arg(short, long, global = true, default_value = "wgconf.toml")]
    file: PathBuf,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new network file with fresh server keys
    Init {
        /// Base network address
        #[arg(long, default_value = "10.50.0.0")]
        base: String,
        /// Number of peers to plan for
        #[arg(long, default_value_t = 30)]
        peers: usize,
        /// Server display name
        #[arg(long)]
        name: Option<String>,
        /// Public host[:port] clients connect to
        #[arg(long)]
        endpoint: Option<String>,
        /// DNS servers pushed to clients
        #[arg(long, value_delimiter = ',')]
        dns: Vec<String>,
        /// Masquerade tunnel traffic out of the WAN interface
        #[arg(long)]
        nat: bool,
        /// Overwrite an existing network file
        #[arg(long)]
        force: bool,
    },
    /// Show the subnet planned for a peer count
    Plan {
        #[arg(long, default_value = "10.50.0.0")]
        base: String,
        #[arg(long, default_value_t = 30)]
        peers: usize,
    },
    /// Add one peer, or several with --count
    AddPeer {
        /// Name for a single peer (default Client-<n>)
        #[arg(long, conflicts_with = "count")]
        name: Option<String>,
        /// Number of peers to add
        #[arg(long)]
        count: Option<usize>,
        /// Name pattern for --count; {n} is replaced by the peer number
        #[arg(long, default_value = DEFAULT_NAME_PATTERN)]
        pattern: String,
    },
    /// Remove a peer by name or id
    RemovePeer {
        /// Peer name, `peer-<n>` or `<n>`
        peer: String,
    },
    /// List server and peers
    List,
    /// Validate the network (exit code 1 on findings)
    Validate,
    /// Render configuration for a platform
    Export {
        #[arg(long, default_value_t = Platform::Standard)]
        platform: Platform,
        /// server, clients or complete
        #[arg(long, default_value_t = ExportKind::Complete)]
        kind: ExportKind,
        /// Render a single client instead
        #[arg(long, conflicts_with = "kind")]
        peer: Option<String>,
        /// Write to a file, or into a directory using the standard file name
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List supported platforms
    Platforms,
    /// Re-plan the subnet, keeping peer addresses where possible
    Resize {
        /// New base network (default: current)
        #[arg(long)]
        base: Option<String>,
        #[arg(long)]
        peers: usize,
    },
    /// Configure IPv64.net DynDNS
    Dyndns {
        #[arg(long)]
        domain: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        disable: bool,
    },
    /// Generate a site-to-site gateway pair
    SiteToSite {
        /// Exchange site A and site B first
        #[arg(long)]
        swap: bool,
        /// Endpoint of site B
        #[arg(long)]
        endpoint: Option<String>,
        /// Write both configs into this directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print a fresh key pair
    Genkey {
        /// Also print a pre-shared key
        #[arg(long)]
        psk: bool,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let file = cli.file.as_path();
    match cli.command {
        Commands::Init {
            base,
            peers,
            name,
            endpoint,
            dns,
            nat,
            force,
        } => commands::init(
            file,
            commands::InitOptions {
                base,
                peers,
                name,
                endpoint,
                dns,
                nat,
                force,
            },
        ),
        Commands::Plan { base, peers } => commands::plan(&base, peers),
        Commands::AddPeer { name, count, pattern } => commands::add_peer(file, name, count, &pattern),
        Commands::RemovePeer { peer } => commands::remove_peer(file, &peer),
        Commands::List => commands::list(file),
        Commands::Validate => commands::validate(file),
        Commands::Export {
            platform,
            kind,
            peer,
            output,
        } => commands::export(file, platform, kind, peer.as_deref(), output.as_deref()),
        Commands::Platforms => commands::platforms(),
        Commands::Resize { base, peers } => commands::resize(file, base, peers),
        Commands::Dyndns {
            domain,
            api_key,
            disable,
        } => commands::dyndns(file, domain, api_key, disable),
        Commands::SiteToSite { swap, endpoint, output } => {
            commands::site_to_site(file, swap, endpoint, output.as_deref())
        }
        Commands::Genkey { psk } => commands::genkey(psk),
    }
}
