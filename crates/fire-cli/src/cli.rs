//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use fire_wireguard::options::{
    DEFAULT_IPV4_CIDR, DEFAULT_IPV6_CIDR, DEFAULT_LISTEN_PORT, DEFAULT_MTU, MAX_PEER_COUNT,
};
use fire_wireguard::GenerateOptions;

/// Fire - `WireGuard` hub-and-spoke mesh generator.
#[derive(Parser, Debug, Clone)]
#[command(name = "fire")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log at debug level (`RUST_LOG` takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Generate a hub and its spokes.
    ///
    /// The mesh is printed to stdout as JSON. With `--out-dir`, one
    /// `wg-quick` file per participant is written as well.
    Generate(GenerateArgs),

    /// Print a new private key.
    Genkey,

    /// Read a private key from stdin and print its public key.
    Pubkey,

    /// Print a new preshared key.
    Genpsk,

    /// Convert a JSON interface document to a `wg-quick` config.
    Render {
        /// JSON file to read.
        file: PathBuf,
    },

    /// Convert a `wg-quick` config to a JSON interface document.
    Parse {
        /// Config file to read.
        file: PathBuf,
    },
}

/// Arguments for the generate command.
#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Load options from a JSON file instead of the flags below.
    #[arg(long, value_name = "FILE")]
    pub options: Option<PathBuf>,

    /// Also write `hub.conf` and `peer-<n>.conf` into this directory.
    #[arg(short, long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Number of spokes to generate.
    #[arg(short, long, default_value_t = MAX_PEER_COUNT)]
    pub count: usize,

    /// IPv4 mesh prefix.
    #[arg(long, default_value = DEFAULT_IPV4_CIDR)]
    pub ipv4_cidr: String,

    /// IPv6 mesh prefix.
    #[arg(long, default_value = DEFAULT_IPV6_CIDR)]
    pub ipv6_cidr: String,

    /// Enable IPv4 addressing (the default when neither family is enabled).
    #[arg(short = '4', long)]
    pub enable_ipv4: bool,

    /// Enable IPv6 addressing.
    #[arg(short = '6', long)]
    pub enable_ipv6: bool,

    /// DNS resolvers (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub dns: Vec<String>,

    /// Generate a preshared key for every hub/spoke pair.
    #[arg(short = 'P', long)]
    pub enable_preshared: bool,

    /// Interface listen port.
    #[arg(long, default_value_t = DEFAULT_LISTEN_PORT)]
    pub interface_listen_port: u16,

    /// `PreUp` command (repeatable).
    #[arg(long, value_name = "CMD")]
    pub pre_up: Vec<String>,

    /// `PostUp` command (repeatable).
    #[arg(long, value_name = "CMD")]
    pub post_up: Vec<String>,

    /// `PreDown` command (repeatable).
    #[arg(long, value_name = "CMD")]
    pub pre_down: Vec<String>,

    /// `PostDown` command (repeatable).
    #[arg(long, value_name = "CMD")]
    pub post_down: Vec<String>,

    /// Routing table id; non-positive leaves it unset.
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub table: i64,

    /// Prefixes spokes route through the hub (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub allow_ips: Vec<String>,

    /// Persistent keepalive seconds; negative disables it.
    #[arg(short = 'k', long, default_value_t = -1, allow_negative_numbers = true)]
    pub keep_alive: i64,

    /// Hub endpoint host as seen by spokes.
    #[arg(short, long, default_value = "")]
    pub endpoint: String,

    /// Hub endpoint port; 0 uses the listen port.
    #[arg(long, default_value_t = 0)]
    pub endpoint_port: u16,

    /// Interface MTU.
    #[arg(long, default_value_t = i64::from(DEFAULT_MTU), allow_negative_numbers = true)]
    pub mtu: i64,

    /// Apply interface options to every spoke, not only the hub.
    #[arg(long)]
    pub setup_all_peers: bool,
}

impl GenerateArgs {
    /// Collects the flags into generation options.
    #[must_use]
    pub fn to_options(&self) -> GenerateOptions {
        GenerateOptions {
            count: self.count,
            setup_all_peers_interface: self.setup_all_peers,
            ipv4: self.enable_ipv4,
            ipv6: self.enable_ipv6,
            ipv4_cidr: self.ipv4_cidr.clone(),
            ipv6_cidr: self.ipv6_cidr.clone(),
            dns: self.dns.clone(),
            enable_preshared: self.enable_preshared,
            interface_listen_port: self.interface_listen_port,
            pre_up: self.pre_up.clone(),
            post_up: self.post_up.clone(),
            pre_down: self.pre_down.clone(),
            post_down: self.post_down.clone(),
            table: self.table,
            mtu: self.mtu,
            allow_ips: self.allow_ips.clone(),
            persistent_keepalive: self.keep_alive,
            endpoint: self.endpoint.clone(),
            endpoint_port: self.endpoint_port,
        }
    }
}
