//! Source-network access filter.
//!
//! # Responsibilities
//! - Parse network prefixes (`10.0.0.0/8`, `fd00::/8`, bare host addresses)
//! - Decide admit/reject for a peer address
//!
//! # Design Decisions
//! - Pure predicate: no state retained between decisions
//! - IPv4-mapped IPv6 peers are matched against IPv4 prefixes
//! - Prefixes with host bits set are a configuration error, not silently masked

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use thiserror::Error;

/// Errors produced while parsing a network prefix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrefixParseError {
    #[error("invalid address in prefix '{0}'")]
    Address(String),

    #[error("invalid prefix length in '{0}'")]
    Length(String),

    #[error("prefix '{0}' has host bits set below the mask")]
    HostBits(String),
}

/// An IP network prefix such as `10.0.0.0/8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkPrefix {
    V4 { network: u32, len: u8 },
    V6 { network: u128, len: u8 },
}

impl NetworkPrefix {
    /// Returns true if `addr` falls inside this prefix.
    pub fn contains(&self, addr: IpAddr) -> bool {
        match (self, addr.to_canonical()) {
            (NetworkPrefix::V4 { network, len }, IpAddr::V4(ip)) => {
                u32::from(ip) & mask_v4(*len) == *network
            }
            (NetworkPrefix::V6 { network, len }, IpAddr::V6(ip)) => {
                u128::from(ip) & mask_v6(*len) == *network
            }
            _ => false,
        }
    }
}

fn mask_v4(len: u8) -> u32 {
    u32::MAX.checked_shl(32 - u32::from(len)).unwrap_or(0)
}

fn mask_v6(len: u8) -> u128 {
    u128::MAX.checked_shl(128 - u32::from(len)).unwrap_or(0)
}

impl FromStr for NetworkPrefix {
    type Err = PrefixParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (addr_part, len_part) = match s.split_once('/') {
            Some((addr, len)) => (addr, Some(len)),
            None => (s, None),
        };

        let addr: IpAddr = addr_part
            .parse()
            .map_err(|_| PrefixParseError::Address(s.to_string()))?;

        let max_len = if addr.is_ipv4() { 32 } else { 128 };
        let len = match len_part {
            Some(raw) => raw
                .parse::<u8>()
                .ok()
                .filter(|len| *len <= max_len)
                .ok_or_else(|| PrefixParseError::Length(s.to_string()))?,
            None => max_len,
        };

        let prefix = match addr {
            IpAddr::V4(ip) => {
                let bits = u32::from(ip);
                if bits & !mask_v4(len) != 0 {
                    return Err(PrefixParseError::HostBits(s.to_string()));
                }
                NetworkPrefix::V4 { network: bits, len }
            }
            IpAddr::V6(ip) => {
                let bits = u128::from(ip);
                if bits & !mask_v6(len) != 0 {
                    return Err(PrefixParseError::HostBits(s.to_string()));
                }
                NetworkPrefix::V6 { network: bits, len }
            }
        };

        Ok(prefix)
    }
}

impl fmt::Display for NetworkPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkPrefix::V4 { network, len } => write!(f, "{}/{}", Ipv4Addr::from(*network), len),
            NetworkPrefix::V6 { network, len } => write!(f, "{}/{}", Ipv6Addr::from(*network), len),
        }
    }
}

/// The set of networks allowed to reach the backend handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    allowed: Vec<NetworkPrefix>,
}

impl AccessPolicy {
    /// Build a policy from textual prefixes, failing on the first bad entry.
    pub fn from_prefixes<S: AsRef<str>>(prefixes: &[S]) -> Result<Self, PrefixParseError> {
        let allowed = prefixes
            .iter()
            .map(|p| p.as_ref().parse())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { allowed })
    }

    /// Returns true if a connection from `addr` may be handed off.
    pub fn is_authorized(&self, addr: IpAddr) -> bool {
        self.allowed.iter().any(|prefix| prefix.contains(addr))
    }

    /// The parsed networks, in configuration order.
    pub fn prefixes(&self) -> &[NetworkPrefix] {
        &self.allowed
    }
}
