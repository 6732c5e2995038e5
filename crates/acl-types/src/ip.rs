//! IP address family inference and prefix-length bounds.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Address family of an ACL entry's `ip` literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    /// Longest prefix length the family accepts (32 or 128).
    pub const fn max_prefix_len(&self) -> u8 {
        match self {
            IpFamily::V4 => 32,
            IpFamily::V6 => 128,
        }
    }

    /// Returns true if `subnet` is a valid prefix length for this family.
    pub const fn accepts_prefix_len(&self, subnet: u8) -> bool {
        subnet <= self.max_prefix_len()
    }

    /// Infers the family of an address literal.
    ///
    /// # Errors
    ///
    /// Returns an error if `literal` is neither a valid IPv4 nor a valid
    /// IPv6 address. CIDR suffixes (`10.0.0.0/8`) are rejected; the prefix
    /// length travels in the separate `subnet` field.
    pub fn of(literal: &str) -> Result<Self, ParseError> {
        literal.parse()
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFamily::V4 => write!(f, "ipv4"),
            IpFamily::V6 => write!(f, "ipv6"),
        }
    }
}

impl FromStr for IpFamily {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains(':') {
            s.parse::<Ipv6Addr>()
                .map(|_| IpFamily::V6)
                .map_err(|_| ParseError::InvalidIpAddress(s.to_string()))
        } else {
            s.parse::<Ipv4Addr>()
                .map(|_| IpFamily::V4)
                .map_err(|_| ParseError::InvalidIpAddress(s.to_string()))
        }
    }
}
