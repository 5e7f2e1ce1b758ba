//! Hub-and-spoke mesh generation.
//!
//! One hub peers with every spoke; each spoke peers only with the hub.
//!
//! ```text
//!            spoke 1
//!               |
//!   spoke 4 -- hub -- spoke 2
//!               |
//!            spoke 3
//! ```
//!
//! Every spoke's key pair is mirrored on the hub, and an optional preshared
//! key is shared by both sides of each hub/spoke link.

use std::net::IpAddr;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::allocator::{host_route, PrefixHosts};
use crate::config::{Interface, InterfaceWithPeers, Peer};
use crate::error::Result;
use crate::keys::{generate_private_key, KeyPair, PresharedKey};
use crate::options::{GenerateOptions, GeneratePlan};

/// The result of a generation: the hub and one tree per spoke.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeshPair {
    /// The hub.
    pub root: InterfaceWithPeers,
    /// The spokes, in allocation order.
    #[serde(default)]
    pub peers: Vec<InterfaceWithPeers>,
}

impl MeshPair {
    /// Encodes the structured (JSON) form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decodes the structured (JSON) form, rejecting unknown fields.
    ///
    /// # Errors
    ///
    /// Returns [`crate::WireGuardError::Json`] on malformed input or unknown fields.
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Returns the number of spokes.
    #[must_use]
    pub fn spoke_count(&self) -> usize {
        self.peers.len()
    }
}

impl InterfaceWithPeers {
    /// Adds a new spoke to this interface, acting as its hub.
    ///
    /// A fresh key pair is generated for the spoke and a peer entry for it is
    /// appended here. The returned spoke has one peer: this hub. With
    /// `enable_preshared` both entries carry the same new preshared key.
    ///
    /// # Errors
    ///
    /// Returns [`crate::WireGuardError::InvalidKey`] if this interface's
    /// private key is not valid.
    pub fn extend(&mut self, enable_preshared: bool) -> Result<Self> {
        let hub_public = self.interface.private_key.public_key()?;
        let (spoke_private, spoke_public) = KeyPair::generate().into_parts();

        let mut mirrored = Peer::new(spoke_public);
        let mut towards_hub = Peer::new(hub_public);
        if enable_preshared {
            let psk = PresharedKey::generate();
            mirrored.preshared_key = Some(psk.clone());
            towards_hub.preshared_key = Some(psk);
        }
        self.peers.push(mirrored);

        Ok(Self {
            interface: Interface::new(spoke_private),
            peers: vec![towards_hub],
        })
    }
}

/// Pulls the next address from each enabled family.
fn next_addresses(v4: &mut Option<PrefixHosts>, v6: &mut Option<PrefixHosts>) -> Vec<IpAddr> {
    [v4.as_mut(), v6.as_mut()]
        .into_iter()
        .flatten()
        .filter_map(Iterator::next)
        .collect()
}

/// Builds a hub-and-spoke mesh from validated options.
///
/// # Errors
///
/// Propagates key errors from [`InterfaceWithPeers::extend`]. No partial mesh
/// is ever returned.
pub fn generate(plan: &GeneratePlan) -> Result<MeshPair> {
    let mut v4 = plan.ipv4.map(PrefixHosts::new);
    let mut v6 = plan.ipv6.map(PrefixHosts::new);
    for hosts in v4.iter().chain(v6.iter()) {
        debug!(prefix = %hosts.prefix(), "allocating from prefix");
    }

    let mut root = InterfaceWithPeers {
        interface: Interface::new(generate_private_key()),
        peers: Vec::with_capacity(plan.count),
    };
    root.interface.addresses = next_addresses(&mut v4, &mut v6);

    let mut spokes = Vec::with_capacity(plan.count);
    for index in 1..=plan.count {
        let mut spoke = root.extend(plan.enable_preshared)?;

        let addresses = next_addresses(&mut v4, &mut v6);
        let routes: Vec<IpNet> = addresses.iter().copied().map(host_route).collect();

        if let Some(mirrored) = root.peers.last_mut() {
            mirrored.allowed_ips.extend(routes.iter().copied());
        }
        for peer in &mut spoke.peers {
            plan.apply_peer(peer, &routes);
        }

        spoke.interface.addresses = addresses;
        if plan.setup_all_peers_interface {
            plan.apply_interface(&mut spoke.interface);
        }

        debug!(spoke = index, addresses = ?spoke.interface.addresses, "spoke allocated");
        spokes.push(spoke);
    }

    plan.apply_interface(&mut root.interface);

    info!(
        spokes = spokes.len(),
        hub_addresses = ?root.interface.addresses,
        preshared = plan.enable_preshared,
        "mesh generated"
    );

    Ok(MeshPair { root, peers: spokes })
}

/// Validates `options` and builds the mesh.
///
/// # Errors
///
/// Returns any validation error from [`GenerateOptions::build`] or
/// generation error from [`generate`].
pub fn generate_from_options(options: &GenerateOptions) -> Result<MeshPair> {
    generate(&options.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::error::WireGuardError;
    use crate::keys::PrivateKey;

    fn opts() -> GenerateOptions {
        GenerateOptions {
            count: 10,
            ipv4_cidr: "10.13.13.0/28".into(),
            ..GenerateOptions::default()
        }
    }

    fn mesh(options: &GenerateOptions) -> MeshPair {
        generate_from_options(options).expect("mesh generates")
    }

    #[test]
    fn ten_spokes_in_a_slash_28() {
        let result = mesh(&opts());
        let prefix: IpNet = "10.13.13.0/28".parse().expect("valid");

        assert_eq!(result.spoke_count(), 10);
        assert_eq!(result.root.peers.len(), 10);
        assert_eq!(
            result.root.interface.addresses,
            vec!["10.13.13.1".parse::<IpAddr>().expect("valid")]
        );

        let mut seen = HashSet::new();
        seen.insert(result.root.interface.addresses[0]);
        for spoke in &result.peers {
            assert_eq!(spoke.interface.addresses.len(), 1);
            let addr = spoke.interface.addresses[0];
            assert!(prefix.contains(&addr));
            assert!(seen.insert(addr), "duplicate address {addr}");
        }
    }

    #[test]
    fn key_pairs_mirror_across_the_hub() {
        let result = mesh(&opts());
        let hub_public = result.root.interface.private_key.public_key().expect("valid hub key");

        for (spoke, mirrored) in result.peers.iter().zip(&result.root.peers) {
            let spoke_public = spoke.interface.private_key.public_key().expect("valid spoke key");
            assert_eq!(mirrored.public_key, spoke_public);
            assert_eq!(spoke.peers.len(), 1);
            assert_eq!(spoke.peers[0].public_key, hub_public);
        }
    }

    #[test]
    fn host_routes_are_mirrored() {
        let result = mesh(&opts());
        for (spoke, mirrored) in result.peers.iter().zip(&result.root.peers) {
            let route = host_route(spoke.interface.addresses[0]);
            assert_eq!(mirrored.allowed_ips, vec![route]);
            assert_eq!(
                spoke.peers[0].allowed_ips,
                vec!["10.13.13.0/28".parse().expect("valid"), route]
            );
        }
    }

    #[test]
    fn preshared_keys_match_on_both_sides() {
        let result = mesh(&GenerateOptions { enable_preshared: true, ..opts() });
        let mut distinct = HashSet::new();
        for (spoke, mirrored) in result.peers.iter().zip(&result.root.peers) {
            let hub_side = mirrored.preshared_key.as_ref().expect("hub psk");
            let spoke_side = spoke.peers[0].preshared_key.as_ref().expect("spoke psk");
            assert_eq!(hub_side.as_bytes(), spoke_side.as_bytes());
            assert!(distinct.insert(*hub_side.as_bytes()));
        }
    }

    #[test]
    fn no_preshared_keys_unless_enabled() {
        let result = mesh(&opts());
        assert!(result.root.peers.iter().all(|p| p.preshared_key.is_none()));
        assert!(result.peers.iter().all(|s| s.peers[0].preshared_key.is_none()));
    }

    #[test]
    fn dual_stack_allocates_both_families() {
        let result = mesh(&GenerateOptions {
            count: 3,
            ipv4: true,
            ipv6: true,
            ipv6_cidr: "fd00::/120".into(),
            ..opts()
        });
        assert_eq!(result.root.interface.addresses.len(), 2);
        for (i, (spoke, mirrored)) in result.peers.iter().zip(&result.root.peers).enumerate() {
            let expected_v4: IpAddr = format!("10.13.13.{}", i + 2).parse().expect("valid");
            let expected_v6: IpAddr = format!("fd00::{}", i + 2).parse().expect("valid");
            assert_eq!(spoke.interface.addresses, vec![expected_v4, expected_v6]);
            let routes: Vec<String> =
                mirrored.allowed_ips.iter().map(ToString::to_string).collect();
            assert_eq!(routes, vec![format!("{expected_v4}/32"), format!("{expected_v6}/128")]);
        }
    }

    #[test]
    fn ipv6_only_mesh() {
        let result = mesh(&GenerateOptions {
            count: 2,
            ipv6: true,
            ipv6_cidr: "fd00::/126".into(),
            ..opts()
        });
        assert_eq!(result.spoke_count(), 2);
        assert!(result.peers.iter().all(|s| s.interface.addresses[0].is_ipv6()));
    }

    #[test]
    fn interface_options_go_to_hub_only_by_default() {
        let options = GenerateOptions {
            count: 2,
            dns: vec!["1.1.1.1".into()],
            post_up: vec!["echo up".into()],
            table: 100,
            ..opts()
        };
        let result = mesh(&options);
        let hub = &result.root.interface;
        assert_eq!(hub.mtu, 1420);
        assert_eq!(hub.listen_port, 51820);
        assert_eq!(hub.table, 100);
        assert_eq!(hub.post_up, vec!["echo up"]);
        for spoke in &result.peers {
            assert_eq!(spoke.interface.mtu, 0);
            assert!(spoke.interface.dns.is_empty());
            assert_eq!(spoke.interface.listen_port, 0);
        }

        let result = mesh(&GenerateOptions { setup_all_peers_interface: true, ..options });
        for spoke in &result.peers {
            assert_eq!(spoke.interface.mtu, 1420);
            assert_eq!(spoke.interface.dns, vec!["1.1.1.1".parse::<IpAddr>().expect("valid")]);
            assert_eq!(spoke.interface.post_up, vec!["echo up"]);
        }
    }

    #[test]
    fn spokes_get_endpoint_and_keepalive() {
        let result = mesh(&GenerateOptions {
            count: 2,
            endpoint: "hub.example.net".into(),
            persistent_keepalive: 25,
            ..opts()
        });
        for spoke in &result.peers {
            let peer = &spoke.peers[0];
            assert_eq!(peer.persistent_keepalive, 25);
            assert_eq!(
                peer.endpoint.as_ref().map(ToString::to_string).as_deref(),
                Some("hub.example.net:51820")
            );
        }
        assert!(result.root.peers.iter().all(|p| p.endpoint.is_none()));
    }

    #[test]
    fn exhausted_prefix_yields_empty_mesh() {
        let result = mesh(&GenerateOptions { ipv4_cidr: "10.0.0.9/32".into(), ..opts() });
        assert_eq!(result.spoke_count(), 0);
        assert!(result.root.interface.addresses.is_empty());
        assert!(result.root.interface.private_key.is_valid());
    }

    #[test]
    fn bad_options_return_no_mesh() {
        let result = generate_from_options(&GenerateOptions {
            allow_ips: vec!["x".into()],
            ..opts()
        });
        assert!(matches!(result, Err(WireGuardError::InvalidAddress(_))));
    }

    #[test]
    fn every_tree_renders_and_parses_back() {
        let result = mesh(&GenerateOptions {
            enable_preshared: true,
            ipv6: true,
            ipv4: true,
            ipv6_cidr: "fd00::/120".into(),
            endpoint: "192.0.2.1".into(),
            ..opts()
        });
        for tree in std::iter::once(&result.root).chain(&result.peers) {
            let text = tree.to_config_string().expect("renders");
            assert_eq!(&InterfaceWithPeers::from_config_str(&text).expect("parses"), tree);
        }
    }

    #[test]
    fn mesh_json_roundtrip() {
        let result = mesh(&GenerateOptions { count: 3, enable_preshared: true, ..opts() });
        let json = result.to_json().expect("encodes");
        assert_eq!(MeshPair::from_json(&json).expect("decodes"), result);

        let mut value: serde_json::Value = serde_json::from_str(&json).expect("json");
        value["hub"] = serde_json::Value::Null;
        assert!(MeshPair::from_json(&value.to_string()).is_err());
    }

    #[test]
    fn extend_requires_a_valid_hub_key() {
        let mut hub = InterfaceWithPeers {
            interface: Interface::new(PrivateKey::default()),
            peers: Vec::new(),
        };
        assert!(matches!(hub.extend(false), Err(WireGuardError::InvalidKey(_))));
        assert!(hub.peers.is_empty());
    }

    #[test]
    fn extend_appends_one_peer_per_call() {
        let mut hub = InterfaceWithPeers {
            interface: Interface::new(generate_private_key()),
            peers: Vec::new(),
        };
        let first = hub.extend(true).expect("valid hub");
        let second = hub.extend(true).expect("valid hub");
        assert_eq!(hub.peers.len(), 2);
        assert_ne!(first.interface.private_key, second.interface.private_key);
        assert_eq!(hub.peers[1].preshared_key, second.peers[0].preshared_key);
    }
}
