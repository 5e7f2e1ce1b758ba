//! Small value types shared by the configuration model.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, WireGuardError};

/// A `WireGuard` peer endpoint: a host name or IP literal plus a UDP port.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Creates an endpoint from a host and port.
    ///
    /// The host is an IP literal (IPv6 optionally in brackets) or a host name
    /// made of ASCII letters, digits, `.` and `-`.
    ///
    /// # Errors
    ///
    /// Returns [`WireGuardError::InvalidAddress`] for any other host.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        let host = host.into();
        let bracketed = host.strip_prefix('[').and_then(|h| h.strip_suffix(']'));

        if let Ok(ip) = bracketed.unwrap_or(host.as_str()).parse::<IpAddr>() {
            // Brackets are only meaningful around IPv6.
            if bracketed.is_none() || ip.is_ipv6() {
                return Ok(Self::from_ip_port(ip, port));
            }
        }
        if bracketed.is_none() && is_host_name(&host) {
            return Ok(Self { host, port });
        }
        Err(WireGuardError::InvalidAddress(format!("invalid endpoint host: {host:?}")))
    }

    /// Creates an endpoint from an IP address and port.
    #[must_use]
    pub fn from_ip_port(ip: IpAddr, port: u16) -> Self {
        Self {
            host: ip.to_string(),
            port,
        }
    }

    /// Returns the host part, without IPv6 brackets.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

fn is_host_name(host: &str) -> bool {
    !host.is_empty()
        && host
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-')
}

impl FromStr for Endpoint {
    type Err = WireGuardError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || WireGuardError::InvalidAddress(format!("invalid endpoint: {s}"));
        let (host, port) = s.rsplit_once(':').ok_or_else(invalid)?;
        // Bare IPv6 literals are ambiguous without brackets.
        if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
            return Err(invalid());
        }
        let port = port.parse::<u16>().map_err(|_| invalid())?;
        Self::new(host, port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl Serialize for Endpoint {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Endpoint {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
