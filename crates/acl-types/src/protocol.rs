//! L4 protocols understood by the classifier.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// IP protocol numbers the classifier extracts and matches on.
///
/// Any other protocol is passed through without classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum IpProtocol {
    Icmp = 1,
    Tcp = 6,
    Udp = 17,
}

impl IpProtocol {
    /// Returns the IANA protocol number.
    pub const fn number(&self) -> u8 {
        *self as u8
    }

    /// Maps an IANA protocol number to a supported protocol.
    pub const fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(IpProtocol::Icmp),
            6 => Some(IpProtocol::Tcp),
            17 => Some(IpProtocol::Udp),
            _ => None,
        }
    }

    /// Returns true if packets of this protocol carry L4 ports.
    pub const fn has_ports(&self) -> bool {
        matches!(self, IpProtocol::Tcp | IpProtocol::Udp)
    }
}

impl fmt::Display for IpProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IpProtocol::Icmp => "icmp",
            IpProtocol::Tcp => "tcp",
            IpProtocol::Udp => "udp",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for IpProtocol {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "icmp" => Ok(IpProtocol::Icmp),
            "tcp" => Ok(IpProtocol::Tcp),
            "udp" => Ok(IpProtocol::Udp),
            _ => Err(ParseError::InvalidProtocol(s.to_string())),
        }
    }
}
