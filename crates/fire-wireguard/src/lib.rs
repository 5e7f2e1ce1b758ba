//! # fire-wireguard
//!
//! `WireGuard` hub-and-spoke mesh generation.
//!
//! Provides:
//! - Curve25519 key generation and derivation ([`keys`])
//! - Sequential host address allocation from a prefix ([`allocator`])
//! - Mesh construction from validated options ([`mesh`], [`options`])
//! - The `wg-quick` line-oriented format and a JSON form ([`config`])
//!
//! ```text
//!   GenerateOptions ──build──► GeneratePlan ──generate──► MeshPair
//!                                                           │
//!                                     root + peers: InterfaceWithPeers
//!                                                           │
//!                                         render_config / to_json
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod allocator;
pub mod config;
pub mod error;
pub mod keys;
pub mod mesh;
pub mod options;
pub mod types;

pub use allocator::{address_capacity, host_route, PrefixHosts};
pub use config::{parse_config, render_config, Interface, InterfaceWithPeers, Peer};
pub use error::{Result, WireGuardError};
pub use keys::{
    derive_public_key, generate_keypair, generate_preshared_key, generate_private_key, KeyPair,
    PresharedKey, PrivateKey, PublicKey, KEY_SIZE,
};
pub use mesh::{generate, generate_from_options, MeshPair};
pub use options::{GenerateOptions, GeneratePlan, MAX_PEER_COUNT};
pub use types::Endpoint;
