//! IPv4 prefix and mask helpers with safe parsing.
//!
//! Addresses and masks are carried as host-order `u32` values
//! (`192.168.1.0` is `0xC0A8_0100`). Conversion to wire order happens only
//! where bytes are produced (hash keys, packed records).

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Returns the netmask for a prefix length (`24` -> `0xFFFF_FF00`).
///
/// Lengths above 32 saturate to a full mask.
pub const fn prefix_mask(len: u8) -> u32 {
    match len {
        0 => 0,
        l if l >= 32 => u32::MAX,
        l => u32::MAX << (32 - l as u32),
    }
}

/// Returns the prefix length of a contiguous netmask.
///
/// Returns `None` for masks with holes (`255.0.255.0`).
pub const fn mask_len(mask: u32) -> Option<u8> {
    let ones = mask.leading_ones();
    if mask.count_ones() == ones {
        Some(ones as u8)
    } else {
        None
    }
}

/// An IPv4 network prefix in CIDR notation (e.g. `10.0.0.0/24`).
///
/// The stored address never has host bits set: `192.168.1.7/24` parses to
/// `192.168.1.0/24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Prefix {
    addr: u32,
    len: u8,
}

impl Ipv4Prefix {
    /// Matches every address.
    pub const ANY: Self = Ipv4Prefix { addr: 0, len: 0 };

    /// Creates a prefix, clearing host bits.
    ///
    /// # Errors
    ///
    /// Returns an error if `len` exceeds 32.
    pub fn new(addr: Ipv4Addr, len: u8) -> Result<Self, ParseError> {
        if len > 32 {
            return Err(ParseError::InvalidIpPrefix(format!(
                "prefix length {} exceeds maximum 32",
                len
            )));
        }

        Ok(Ipv4Prefix {
            addr: u32::from(addr) & prefix_mask(len),
            len,
        })
    }

    /// Creates a prefix from an address and a contiguous netmask.
    pub fn from_mask(addr: u32, mask: u32) -> Result<Self, ParseError> {
        let len = mask_len(mask).ok_or(ParseError::InvalidMask(mask))?;
        Ok(Ipv4Prefix {
            addr: addr & mask,
            len,
        })
    }

    /// Returns the (already masked) network address.
    pub const fn masked_addr(&self) -> u32 {
        self.addr
    }

    /// Returns the netmask.
    pub const fn mask(&self) -> u32 {
        prefix_mask(self.len)
    }

    /// Returns the prefix length in bits.
    pub const fn prefix_len(&self) -> u8 {
        self.len
    }

    /// Returns true if this is a host prefix (/32).
    pub const fn is_host(&self) -> bool {
        self.len == 32
    }

    /// Returns true if `addr` falls inside this prefix.
    pub const fn contains(&self, addr: u32) -> bool {
        addr & self.mask() == self.addr
    }

    /// Returns the network address as an [`Ipv4Addr`].
    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.addr)
    }
}

impl Default for Ipv4Prefix {
    fn default() -> Self {
        Self::ANY
    }
}

impl fmt::Display for Ipv4Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network(), self.len)
    }
}

impl FromStr for Ipv4Prefix {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (addr_str, len) = match s.rsplit_once('/') {
            Some((addr, len_str)) => {
                let len: u8 = len_str
                    .parse()
                    .map_err(|_| ParseError::InvalidIpPrefix(s.to_string()))?;
                (addr, len)
            }
            None => (s, 32),
        };

        let addr: Ipv4Addr = addr_str
            .parse()
            .map_err(|_| ParseError::InvalidIpAddress(addr_str.to_string()))?;

        Ipv4Prefix::new(addr, len)
    }
}

impl TryFrom<String> for Ipv4Prefix {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Ipv4Prefix> for String {
    fn from(prefix: Ipv4Prefix) -> Self {
        prefix.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_prefix_mask() {
        assert_eq!(prefix_mask(0), 0);
        assert_eq!(prefix_mask(8), 0xFF00_0000);
        assert_eq!(prefix_mask(24), 0xFFFF_FF00);
        assert_eq!(prefix_mask(32), 0xFFFF_FFFF);
        assert_eq!(prefix_mask(40), 0xFFFF_FFFF);
    }

    #[test]
    fn test_mask_len() {
        assert_eq!(mask_len(0), Some(0));
        assert_eq!(mask_len(0xFFFF_FF00), Some(24));
        assert_eq!(mask_len(0xFFFF_FFFF), Some(32));
        assert_eq!(mask_len(0xFF00_FF00), None);
        assert_eq!(mask_len(0x0000_00FF), None);
    }

    #[test]
    fn test_prefix_parse_masks_host_bits() {
        let prefix: Ipv4Prefix = "192.168.1.7/24".parse().unwrap();
        assert_eq!(prefix.masked_addr(), 0xC0A8_0100);
        assert_eq!(prefix.mask(), 0xFFFF_FF00);
        assert_eq!(prefix.prefix_len(), 24);
        assert_eq!(prefix.to_string(), "192.168.1.0/24");
    }

    #[test]
    fn test_bare_address_is_host_prefix() {
        let prefix: Ipv4Prefix = "10.1.2.3".parse().unwrap();
        assert!(prefix.is_host());
        assert_eq!(prefix.masked_addr(), 0x0A01_0203);
    }

    #[test]
    fn test_prefix_contains() {
        let prefix: Ipv4Prefix = "10.0.0.0/8".parse().unwrap();
        assert!(prefix.contains(0x0A01_0203));
        assert!(!prefix.contains(0x0B00_0001));
        assert!(Ipv4Prefix::ANY.contains(0xDEAD_BEEF));
    }

    #[test]
    fn test_from_mask() {
        let prefix = Ipv4Prefix::from_mask(0xC0A8_0105, 0xFFFF_FF00).unwrap();
        assert_eq!(prefix.to_string(), "192.168.1.0/24");
        assert_eq!(
            Ipv4Prefix::from_mask(0, 0xFF00_FF00),
            Err(ParseError::InvalidMask(0xFF00_FF00))
        );
    }

    #[test]
    fn test_masking_is_idempotent() {
        for &(addr, mask) in &[
            (0xC0A8_0105u32, 0xFFFF_FF00u32),
            (0xFFFF_FFFF, 0),
            (0x0A00_0001, 0xFFFF_FFFF),
            (0x1234_5678, 0xF0F0_F0F0),
        ] {
            assert_eq!((addr & mask) & mask, addr & mask);
        }
    }

    #[test]
    fn test_invalid_prefixes() {
        assert!("10.0.0.0/33".parse::<Ipv4Prefix>().is_err());
        assert!("10.0.0/8".parse::<Ipv4Prefix>().is_err());
        assert!("10.0.0.0/abc".parse::<Ipv4Prefix>().is_err());
        assert!("2001:db8::/32".parse::<Ipv4Prefix>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let prefix: Ipv4Prefix = "172.16.0.0/12".parse().unwrap();
        let s: String = prefix.into();
        assert_eq!(s, "172.16.0.0/12");
        assert_eq!(Ipv4Prefix::try_from(s).unwrap(), prefix);
    }
}
