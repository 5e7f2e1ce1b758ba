//! `WireGuard` configuration model and its two encodings.
//!
//! The line-oriented form is the INI-style file used by `wg-quick`:
//!
//! ```text
//! [Interface]
//! PrivateKey = yAnz5TF+lXXJte14tji3zlMNq+hd2rYUIgJBgB3fBmk=
//! Address = 10.13.13.1
//! ListenPort = 51820
//!
//! [Peer]
//! PublicKey = xTIBA5rboUvnH4htodjb6e697QjLERt1NAB4mZqp8Dg=
//! AllowedIPs = 10.13.13.2/32
//! ```
//!
//! The structured form is JSON with snake_case field names. The two differ on
//! purpose in how they treat unknown input: the line-oriented parser skips
//! unknown keys, the structured decoder rejects unknown fields.

use std::fmt::Write as FmtWrite;
use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, WireGuardError};
use crate::keys::{PresharedKey, PrivateKey, PublicKey};
use crate::types::Endpoint;

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero_u16(v: &u16) -> bool {
    *v == 0
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(v: &bool) -> bool {
    !*v
}

/// One participant's local interface configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Interface {
    /// The interface's private key. Must be clamped to be rendered.
    #[serde(default)]
    pub private_key: PrivateKey,
    /// Host addresses assigned to this interface.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<IpAddr>,
    /// UDP listen port, 0 for ephemeral.
    #[serde(default, skip_serializing_if = "is_zero_u16")]
    pub listen_port: u16,
    /// DNS resolvers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns: Vec<IpAddr>,
    /// MTU, 0 for unset.
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub mtu: u32,
    /// Routing table id, 0 for unset.
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub table: u32,
    /// Commands run before the interface comes up.
    ///
    /// Hook commands are single lines. The line-oriented form trims
    /// surrounding whitespace, so it is not kept across a round trip.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_up: Vec<String>,
    /// Commands run after the interface comes up.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_up: Vec<String>,
    /// Commands run before the interface goes down.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_down: Vec<String>,
    /// Commands run after the interface goes down.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_down: Vec<String>,
    /// Whether `wg-quick` writes runtime state back on shutdown.
    #[serde(default, skip_serializing_if = "is_false")]
    pub save_config: bool,
}

impl Interface {
    /// Creates an interface with the given private key and nothing else set.
    #[must_use]
    pub fn new(private_key: PrivateKey) -> Self {
        Self {
            private_key,
            ..Self::default()
        }
    }

    /// Adds an address.
    #[must_use]
    pub fn with_address(mut self, address: IpAddr) -> Self {
        self.addresses.push(address);
        self
    }

    /// Sets the listen port.
    #[must_use]
    pub fn with_listen_port(mut self, port: u16) -> Self {
        self.listen_port = port;
        self
    }

    /// Renders the body of an `[Interface]` section (without the header).
    ///
    /// # Errors
    ///
    /// Returns [`WireGuardError::MissingField`] if the private key is not
    /// valid, and [`WireGuardError::InvalidValue`] for a hook command that
    /// spans more than one line.
    pub fn to_config_text(&self) -> Result<String> {
        if !self.private_key.is_valid() {
            return Err(WireGuardError::MissingField("PrivateKey"));
        }

        let mut output = String::new();
        let _ = writeln!(output, "PrivateKey = {}", self.private_key.to_base64());

        if !self.addresses.is_empty() {
            let _ = writeln!(output, "Address = {}", join(&self.addresses));
        }
        if self.listen_port > 0 {
            let _ = writeln!(output, "ListenPort = {}", self.listen_port);
        }
        if !self.dns.is_empty() {
            let _ = writeln!(output, "DNS = {}", join(&self.dns));
        }
        if self.mtu > 0 {
            let _ = writeln!(output, "MTU = {}", self.mtu);
        }
        if self.table != 0 {
            let _ = writeln!(output, "Table = {}", self.table);
        }

        let hooks = [
            ("PreUp", &self.pre_up),
            ("PostUp", &self.post_up),
            ("PreDown", &self.pre_down),
            ("PostDown", &self.post_down),
        ];
        for (key, commands) in hooks {
            for command in commands {
                if command.contains(['\n', '\r']) {
                    return Err(WireGuardError::InvalidValue {
                        key,
                        value: command.clone(),
                    });
                }
                let _ = writeln!(output, "{key} = {command}");
            }
        }

        if self.save_config {
            output.push_str("SaveConfig = true\n");
        }

        Ok(output)
    }

    /// Parses the body of an `[Interface]` section.
    ///
    /// Section headers, comments and unknown keys are skipped.
    ///
    /// # Errors
    ///
    /// Fails on unparseable values, a missing `PrivateKey`
    /// ([`WireGuardError::MissingField`]) or an unclamped one
    /// ([`WireGuardError::InvalidKey`]).
    pub fn from_config_text(text: &str) -> Result<Self> {
        let mut interface = Self::default();
        let mut private_key: Option<PrivateKey> = None;

        for (key, value) in key_values(text) {
            match key {
                "PrivateKey" => private_key = Some(PrivateKey::from_base64(value)?),
                "Address" => interface.addresses.extend(parse_list::<IpAddr>(value)?),
                "ListenPort" => interface.listen_port = parse_number("ListenPort", value)?,
                "DNS" => interface.dns.extend(parse_list::<IpAddr>(value)?),
                "MTU" => interface.mtu = parse_number("MTU", value)?,
                "Table" => interface.table = parse_number("Table", value)?,
                "PreUp" => interface.pre_up.push(value.to_string()),
                "PostUp" => interface.post_up.push(value.to_string()),
                "PreDown" => interface.pre_down.push(value.to_string()),
                "PostDown" => interface.post_down.push(value.to_string()),
                "SaveConfig" => interface.save_config = value.eq_ignore_ascii_case("true"),
                _ => {}
            }
        }

        let private_key = private_key.ok_or(WireGuardError::MissingField("PrivateKey"))?;
        if !private_key.is_valid() {
            return Err(WireGuardError::InvalidKey(
                "PrivateKey is not a clamped Curve25519 scalar".to_string(),
            ));
        }
        interface.private_key = private_key;
        Ok(interface)
    }
}

/// One remote participant as seen from an [`Interface`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Peer {
    /// The peer's public key. Required and non-zero.
    #[serde(default)]
    pub public_key: PublicKey,
    /// Optional preshared key for an extra symmetric layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preshared_key: Option<PresharedKey>,
    /// Prefixes this peer may send from and is routed to. Required non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_ips: Vec<IpNet>,
    /// Where to reach the peer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Endpoint>,
    /// Keepalive interval in seconds, 0 for disabled.
    #[serde(default, skip_serializing_if = "is_zero_u16")]
    pub persistent_keepalive: u16,
}

impl Peer {
    /// Creates a peer with the given public key and nothing else set.
    #[must_use]
    pub fn new(public_key: PublicKey) -> Self {
        Self {
            public_key,
            ..Self::default()
        }
    }

    /// Adds an allowed prefix.
    #[must_use]
    pub fn with_allowed_ip(mut self, prefix: IpNet) -> Self {
        self.allowed_ips.push(prefix);
        self
    }

    /// Sets the preshared key.
    #[must_use]
    pub fn with_preshared_key(mut self, key: PresharedKey) -> Self {
        self.preshared_key = Some(key);
        self
    }

    /// Returns whether the peer has the fields a usable `[Peer]` needs.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.public_key.is_valid() && !self.allowed_ips.is_empty()
    }

    /// Renders the body of a `[Peer]` section (without the header).
    ///
    /// # Errors
    ///
    /// Returns [`WireGuardError::MissingField`] if the public key is not valid
    /// or there are no allowed IPs.
    pub fn to_config_text(&self) -> Result<String> {
        self.check_ready()?;

        let mut output = String::new();
        let _ = writeln!(output, "PublicKey = {}", self.public_key.to_base64());

        if let Some(psk) = self.preshared_key.as_ref().filter(|k| k.is_valid()) {
            let _ = writeln!(output, "PresharedKey = {}", psk.to_base64());
        }

        let _ = writeln!(output, "AllowedIPs = {}", join(&self.allowed_ips));

        if let Some(ref endpoint) = self.endpoint {
            let _ = writeln!(output, "Endpoint = {endpoint}");
        }
        if self.persistent_keepalive != 0 {
            let _ = writeln!(output, "PersistentKeepalive = {}", self.persistent_keepalive);
        }

        Ok(output)
    }

    /// Parses the body of a `[Peer]` section.
    ///
    /// # Errors
    ///
    /// Fails on unparseable values, or with [`WireGuardError::MissingField`]
    /// when the result is not [ready](Self::is_ready).
    pub fn from_config_text(text: &str) -> Result<Self> {
        let mut peer = Self::default();

        for (key, value) in key_values(text) {
            match key {
                "PublicKey" => peer.public_key = PublicKey::from_base64(value)?,
                "PresharedKey" => {
                    peer.preshared_key =
                        Some(PresharedKey::from_base64(value)?).filter(PresharedKey::is_valid);
                }
                "AllowedIPs" => peer.allowed_ips.extend(parse_list::<IpNet>(value)?),
                "Endpoint" => peer.endpoint = Some(value.parse()?),
                "PersistentKeepalive" => {
                    peer.persistent_keepalive = parse_number("PersistentKeepalive", value)?;
                }
                _ => {}
            }
        }

        peer.check_ready()?;
        Ok(peer)
    }

    fn check_ready(&self) -> Result<()> {
        if !self.public_key.is_valid() {
            return Err(WireGuardError::MissingField("PublicKey"));
        }
        if self.allowed_ips.is_empty() {
            return Err(WireGuardError::MissingField("AllowedIPs"));
        }
        Ok(())
    }
}

/// An interface together with its peers: one participant's whole config.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterfaceWithPeers {
    /// The local interface.
    pub interface: Interface,
    /// The remote peers.
    #[serde(default)]
    pub peers: Vec<Peer>,
}

impl InterfaceWithPeers {
    /// Renders the line-oriented form.
    ///
    /// # Errors
    ///
    /// See [`render_config`].
    pub fn to_config_string(&self) -> Result<String> {
        render_config(&self.interface, &self.peers)
    }

    /// Parses the line-oriented form.
    ///
    /// # Errors
    ///
    /// See [`parse_config`].
    pub fn from_config_str(input: &str) -> Result<Self> {
        let (interface, peers) = parse_config(input)?;
        Ok(Self { interface, peers })
    }

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
    /// Returns [`WireGuardError::Json`] on malformed input or unknown fields.
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }
}

impl FromStr for InterfaceWithPeers {
    type Err = WireGuardError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_config_str(s)
    }
}

/// Renders a complete configuration file.
///
/// Nothing is returned unless every section renders.
///
/// # Errors
///
/// Returns [`WireGuardError::MissingField`] for an invalid private key, or a
/// peer with an invalid public key or empty allowed IPs.
pub fn render_config(interface: &Interface, peers: &[Peer]) -> Result<String> {
    let mut output = String::from("[Interface]\n");
    output.push_str(&interface.to_config_text()?);
    output.push('\n');

    for peer in peers {
        output.push_str("[Peer]\n");
        output.push_str(&peer.to_config_text()?);
        output.push('\n');
    }

    Ok(output)
}

/// Parser state for configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Interface,
    Peer,
}

/// Parses a complete configuration file.
///
/// `[Peer]` sections that fail to parse or lack a public key or allowed IPs
/// are dropped; the rest of the file is still parsed.
///
/// # Errors
///
/// - [`WireGuardError::DuplicateSection`] for a second `[Interface]`
/// - [`WireGuardError::UnknownSection`] for any other header name
/// - [`WireGuardError::MissingSection`] when there is no `[Interface]`
/// - any error from [`Interface::from_config_text`]
pub fn parse_config(input: &str) -> Result<(Interface, Vec<Peer>)> {
    let mut section = Section::None;
    let mut interface_text: Option<String> = None;
    let mut peer_text = String::new();
    let mut peers = Vec::new();

    for (line_num, raw) in input.lines().enumerate() {
        let line = raw.trim();
        if is_skippable(line) {
            continue;
        }

        if let Some(name) = section_header(line) {
            if section == Section::Peer {
                flush_peer(&mut peer_text, &mut peers);
            }
            section = match name {
                "Interface" => {
                    if interface_text.is_some() {
                        return Err(WireGuardError::DuplicateSection { line: line_num + 1 });
                    }
                    interface_text = Some(String::new());
                    Section::Interface
                }
                "Peer" => Section::Peer,
                other => {
                    return Err(WireGuardError::UnknownSection {
                        line: line_num + 1,
                        name: other.to_string(),
                    });
                }
            };
            continue;
        }

        let buffer = match section {
            Section::None => continue,
            Section::Interface => interface_text.get_or_insert_with(String::new),
            Section::Peer => &mut peer_text,
        };
        buffer.push_str(line);
        buffer.push('\n');
    }

    if section == Section::Peer {
        flush_peer(&mut peer_text, &mut peers);
    }

    let interface_text = interface_text.ok_or(WireGuardError::MissingSection("Interface"))?;
    let interface = Interface::from_config_text(&interface_text)?;
    Ok((interface, peers))
}

fn flush_peer(text: &mut String, peers: &mut Vec<Peer>) {
    if text.is_empty() {
        return;
    }
    match Peer::from_config_text(text) {
        Ok(peer) => peers.push(peer),
        Err(e) => debug!(error = %e, "dropping incomplete [Peer] section"),
    }
    text.clear();
}

fn is_skippable(line: &str) -> bool {
    line.is_empty() || line.starts_with('#') || line.starts_with(';')
}

fn section_header(line: &str) -> Option<&str> {
    line.strip_prefix('[')?.strip_suffix(']').map(str::trim)
}

/// Yields trimmed `(key, value)` pairs, skipping comments, headers and lines
/// without `=`.
fn key_values(text: &str) -> impl Iterator<Item = (&str, &str)> {
    text.lines()
        .map(str::trim)
        .filter(|line| !is_skippable(line) && section_header(line).is_none())
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
}

fn parse_list<T>(value: &str) -> Result<Vec<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<T>()
                .map_err(|e| WireGuardError::InvalidAddress(format!("{item}: {e}")))
        })
        .collect()
}

fn parse_number<T: FromStr>(key: &'static str, value: &str) -> Result<T> {
    value.parse().map_err(|_| WireGuardError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn join<T: ToString>(items: &[T]) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
