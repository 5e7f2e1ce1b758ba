//! Host address allocation from a network prefix.
//!
//! [`PrefixHosts`] walks a prefix in ascending order starting right after the
//! network address. It is forward-only and finite; dropping it early is the
//! only cancellation there is.
//!
//! ```text
//! 10.0.0.0/30     -> 10.0.0.1, 10.0.0.2          (network and broadcast skipped)
//! fd00::/126      -> fd00::1, fd00::2, fd00::3   (no broadcast in IPv6)
//! ```

use std::iter::FusedIterator;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::IpNet;

/// Lazy sequence of usable host addresses inside a prefix.
#[derive(Debug, Clone)]
pub struct PrefixHosts {
    prefix: IpNet,
    next: Option<u128>,
    last: u128,
}

impl PrefixHosts {
    /// Creates an allocator over `prefix`, masked to its network form first.
    #[must_use]
    pub fn new(prefix: IpNet) -> Self {
        let prefix = prefix.trunc();
        let (network, last) = match prefix {
            IpNet::V4(net) => (
                u128::from(u32::from(net.network())),
                // Broadcast is never handed out.
                u128::from(u32::from(net.broadcast())).saturating_sub(1),
            ),
            IpNet::V6(net) => (u128::from(net.network()), u128::from(net.broadcast())),
        };
        Self {
            prefix,
            next: network.checked_add(1),
            last,
        }
    }

    /// The masked prefix being walked.
    #[must_use]
    pub const fn prefix(&self) -> IpNet {
        self.prefix
    }

    fn to_addr(&self, value: u128) -> IpAddr {
        match self.prefix {
            IpNet::V4(_) => IpAddr::V4(Ipv4Addr::from(value as u32)),
            IpNet::V6(_) => IpAddr::V6(Ipv6Addr::from(value)),
        }
    }
}

impl Iterator for PrefixHosts {
    type Item = IpAddr;

    fn next(&mut self) -> Option<IpAddr> {
        let current = self.next.filter(|&candidate| candidate <= self.last)?;
        let addr = self.to_addr(current);
        if !self.prefix.contains(&addr) {
            self.next = None;
            return None;
        }
        self.next = current.checked_add(1);
        Some(addr)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next {
            Some(next) if next <= self.last => {
                let remaining = self.last - next + 1;
                let lower = usize::try_from(remaining).unwrap_or(usize::MAX);
                (lower, usize::try_from(remaining).ok())
            }
            _ => (0, Some(0)),
        }
    }
}

impl FusedIterator for PrefixHosts {}

/// Returns how many addresses [`PrefixHosts`] yields for `prefix`.
///
/// Saturates at `usize::MAX` for very large IPv6 prefixes.
#[must_use]
pub fn address_capacity(prefix: &IpNet) -> usize {
    let host_bits = u32::from(prefix.max_prefix_len() - prefix.prefix_len());
    let (size, reserved) = match prefix {
        IpNet::V4(_) => (1u128 << host_bits, 2u128),
        // Cap the exponent so the shift can never overflow.
        IpNet::V6(_) => (1u128 << host_bits.min(64), 1u128),
    };
    usize::try_from(size.saturating_sub(reserved)).unwrap_or(usize::MAX)
}

/// Returns `addr` as a single-address prefix (`/32` or `/128`).
#[must_use]
pub fn host_route(addr: IpAddr) -> IpNet {
    IpNet::from(addr)
}
