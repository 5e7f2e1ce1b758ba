//! Options for mesh generation.
//!
//! [`GenerateOptions`] is the raw, user-facing record (CLI flags or a JSON
//! options file). [`GenerateOptions::build`] validates it into a
//! [`GeneratePlan`] that the mesh builder consumes.

use std::net::IpAddr;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::allocator::address_capacity;
use crate::config::{Interface, Peer};
use crate::error::{Result, WireGuardError};
use crate::types::Endpoint;

/// Hard ceiling on spokes per generation.
pub const MAX_PEER_COUNT: usize = 1 << 12;

/// MTU used when none (or a non-positive one) is given.
pub const DEFAULT_MTU: u32 = 1420;

/// Default `WireGuard` listen port.
pub const DEFAULT_LISTEN_PORT: u16 = 51820;

/// Default IPv4 mesh prefix.
pub const DEFAULT_IPV4_CIDR: &str = "10.13.13.0/24";

/// Default IPv6 mesh prefix.
pub const DEFAULT_IPV6_CIDR: &str = "fd82:9a37:b1c5:e6f:2d18:4b93:7a50:c8/120";

/// User-supplied generation options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerateOptions {
    /// Requested number of spokes.
    pub count: usize,
    /// Apply interface options to every spoke, not only the hub.
    pub setup_all_peers_interface: bool,
    /// Enable IPv4 addressing.
    pub ipv4: bool,
    /// Enable IPv6 addressing.
    pub ipv6: bool,
    /// IPv4 mesh prefix.
    pub ipv4_cidr: String,
    /// IPv6 mesh prefix.
    pub ipv6_cidr: String,
    /// DNS resolvers, as bare addresses.
    pub dns: Vec<String>,
    /// Generate a preshared key per hub/spoke pair.
    pub enable_preshared: bool,
    /// Interface listen port.
    pub interface_listen_port: u16,
    /// `PreUp` hooks.
    pub pre_up: Vec<String>,
    /// `PostUp` hooks.
    pub post_up: Vec<String>,
    /// `PreDown` hooks.
    pub pre_down: Vec<String>,
    /// `PostDown` hooks.
    pub post_down: Vec<String>,
    /// Routing table id; non-positive means unset.
    pub table: i64,
    /// MTU; non-positive means [`DEFAULT_MTU`].
    pub mtu: i64,
    /// Prefixes each spoke routes through the hub. Empty means the mesh prefixes.
    pub allow_ips: Vec<String>,
    /// Keepalive seconds; negative means disabled.
    pub persistent_keepalive: i64,
    /// Hub endpoint host as seen by spokes. Empty means none.
    pub endpoint: String,
    /// Hub endpoint port; 0 means the listen port.
    pub endpoint_port: u16,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            count: MAX_PEER_COUNT,
            setup_all_peers_interface: false,
            ipv4: false,
            ipv6: false,
            ipv4_cidr: DEFAULT_IPV4_CIDR.to_string(),
            ipv6_cidr: DEFAULT_IPV6_CIDR.to_string(),
            dns: Vec::new(),
            enable_preshared: false,
            interface_listen_port: DEFAULT_LISTEN_PORT,
            pre_up: Vec::new(),
            post_up: Vec::new(),
            pre_down: Vec::new(),
            post_down: Vec::new(),
            table: -1,
            mtu: i64::from(DEFAULT_MTU),
            allow_ips: Vec::new(),
            persistent_keepalive: -1,
            endpoint: String::new(),
            endpoint_port: 0,
        }
    }
}

impl GenerateOptions {
    /// Loads options from a JSON document, rejecting unknown fields.
    ///
    /// # Errors
    ///
    /// Returns [`WireGuardError::Json`] on malformed input.
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Validates and normalizes the options.
    ///
    /// # Errors
    ///
    /// Returns [`WireGuardError::InvalidAddress`] for an unparseable prefix,
    /// DNS address, allowed IP or endpoint, and
    /// [`WireGuardError::InvalidValue`] for out-of-range numbers.
    pub fn build(&self) -> Result<GeneratePlan> {
        let (ipv4, ipv6) = if self.ipv4 || self.ipv6 {
            (self.ipv4, self.ipv6)
        } else {
            (true, false)
        };

        let ipv4 = ipv4.then(|| parse_prefix(&self.ipv4_cidr)).transpose()?;
        let ipv6 = ipv6.then(|| parse_prefix(&self.ipv6_cidr)).transpose()?;

        // The hub takes the first address of every enabled family.
        let mut count = self.count.min(MAX_PEER_COUNT);
        for prefix in ipv4.iter().chain(ipv6.iter()) {
            count = count.min(address_capacity(prefix).saturating_sub(1));
        }
        if count < self.count {
            warn!(requested = self.count, granted = count, "peer count clamped");
        }

        let allow_ips = if self.allow_ips.is_empty() {
            ipv4.iter().chain(ipv6.iter()).map(IpNet::trunc).collect()
        } else {
            self.allow_ips
                .iter()
                .map(|s| parse_prefix(s))
                .collect::<Result<Vec<_>>>()?
        };

        let dns = self
            .dns
            .iter()
            .map(|s| {
                s.trim()
                    .parse::<IpAddr>()
                    .map_err(|e| WireGuardError::InvalidAddress(format!("dns {s}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let endpoint = if self.endpoint.trim().is_empty() {
            None
        } else {
            let port = if self.endpoint_port == 0 {
                self.interface_listen_port
            } else {
                self.endpoint_port
            };
            Some(Endpoint::new(self.endpoint.trim(), port)?)
        };

        let mtu = if self.mtu <= 0 {
            DEFAULT_MTU
        } else {
            to_unsigned("mtu", self.mtu)?
        };

        Ok(GeneratePlan {
            count,
            setup_all_peers_interface: self.setup_all_peers_interface,
            ipv4,
            ipv6,
            dns,
            enable_preshared: self.enable_preshared,
            listen_port: self.interface_listen_port,
            pre_up: trimmed(&self.pre_up),
            post_up: trimmed(&self.post_up),
            pre_down: trimmed(&self.pre_down),
            post_down: trimmed(&self.post_down),
            table: to_unsigned("table", self.table.max(0))?,
            mtu,
            allow_ips,
            persistent_keepalive: to_unsigned(
                "persistent_keepalive",
                self.persistent_keepalive.max(0),
            )?,
            endpoint,
        })
    }
}

/// Validated generation options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratePlan {
    /// Number of spokes, already clamped to what the prefixes can address.
    pub count: usize,
    /// Apply interface options to every spoke, not only the hub.
    pub setup_all_peers_interface: bool,
    /// IPv4 prefix, if that family is enabled.
    pub ipv4: Option<IpNet>,
    /// IPv6 prefix, if that family is enabled.
    pub ipv6: Option<IpNet>,
    /// DNS resolvers.
    pub dns: Vec<IpAddr>,
    /// Generate a preshared key per pair.
    pub enable_preshared: bool,
    /// Interface listen port.
    pub listen_port: u16,
    /// `PreUp` hooks.
    pub pre_up: Vec<String>,
    /// `PostUp` hooks.
    pub post_up: Vec<String>,
    /// `PreDown` hooks.
    pub pre_down: Vec<String>,
    /// `PostDown` hooks.
    pub post_down: Vec<String>,
    /// Routing table id, 0 for unset.
    pub table: u32,
    /// Interface MTU.
    pub mtu: u32,
    /// Prefixes each spoke routes through the hub.
    pub allow_ips: Vec<IpNet>,
    /// Keepalive seconds, 0 for disabled.
    pub persistent_keepalive: u16,
    /// Hub endpoint as seen by spokes.
    pub endpoint: Option<Endpoint>,
}

impl GeneratePlan {
    /// Copies the shared interface settings onto `interface`.
    pub fn apply_interface(&self, interface: &mut Interface) {
        interface.listen_port = self.listen_port;
        interface.dns.clone_from(&self.dns);
        interface.mtu = self.mtu;
        interface.table = self.table;
        interface.pre_up.clone_from(&self.pre_up);
        interface.post_up.clone_from(&self.post_up);
        interface.pre_down.clone_from(&self.pre_down);
        interface.post_down.clone_from(&self.post_down);
    }

    /// Configures a spoke's peer entry pointing at the hub.
    ///
    /// `own_routes` are the spoke's host routes, appended after the
    /// configured allowed IPs unless already present.
    pub fn apply_peer(&self, peer: &mut Peer, own_routes: &[IpNet]) {
        peer.allowed_ips.clone_from(&self.allow_ips);
        for route in own_routes {
            if !peer.allowed_ips.contains(route) {
                peer.allowed_ips.push(*route);
            }
        }
        peer.persistent_keepalive = self.persistent_keepalive;
        peer.endpoint.clone_from(&self.endpoint);
    }
}

// The line-oriented form does not keep surrounding whitespace.
fn trimmed(commands: &[String]) -> Vec<String> {
    commands.iter().map(|c| c.trim().to_string()).collect()
}

fn parse_prefix(s: &str) -> Result<IpNet> {
    s.trim()
        .parse::<IpNet>()
        .map_err(|e| WireGuardError::InvalidAddress(format!("{s}: {e}")))
}

fn to_unsigned<T: TryFrom<i64>>(key: &'static str, value: i64) -> Result<T> {
    T::try_from(value).map_err(|_| WireGuardError::InvalidValue {
        key,
        value: value.to_string(),
    })
}
