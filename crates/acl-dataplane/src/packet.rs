//! 5-tuple extraction from raw Ethernet frames.
//!
//! Every field access is preceded by a bounds check against the frame
//! length. Frames that cannot be classified resolve to a [`Skip`] reason,
//! which the driver turns into the pass-through action.

use acl_types::IpProtocol;
use byteorder::{BigEndian, ByteOrder};

/// Length of an untagged Ethernet header.
pub const ETH_HLEN: usize = 14;

/// Length of an IPv4 header without options.
pub const IPV4_MIN_HLEN: usize = 20;

/// Length of a UDP header, the shortest transport header read.
pub const UDP_HLEN: usize = 8;

/// Shortest frame considered before any field is touched.
pub const MIN_FRAME_LEN: usize = ETH_HLEN + IPV4_MIN_HLEN + UDP_HLEN;

/// IPv4 ethertype.
pub const ETH_P_IP: u16 = 0x0800;

const ETH_TYPE: usize = 12;
const IP_VERSION_IHL: usize = ETH_HLEN;
const IP_PROTOCOL: usize = ETH_HLEN + 9;
const IP_SADDR: usize = ETH_HLEN + 12;
const IP_DADDR: usize = ETH_HLEN + 16;

/// The canonical packet 5-tuple. Addresses and ports are host order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PacketTuple {
    pub src_addr: u32,
    pub dst_addr: u32,
    pub src_port: u16,
    pub dst_port: u16,
    pub protocol: u8,
}

impl PacketTuple {
    /// Builds an ICMP tuple (ports unused).
    pub const fn icmp(src_addr: u32, dst_addr: u32) -> Self {
        PacketTuple {
            src_addr,
            dst_addr,
            src_port: 0,
            dst_port: 0,
            protocol: IpProtocol::Icmp.number(),
        }
    }

    /// Builds a tuple for a port-carrying protocol.
    pub const fn with_ports(
        protocol: IpProtocol,
        src_addr: u32,
        src_port: u16,
        dst_addr: u32,
        dst_port: u16,
    ) -> Self {
        PacketTuple {
            src_addr,
            dst_addr,
            src_port,
            dst_port,
            protocol: protocol.number(),
        }
    }
}

/// Why a frame was not classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// Shorter than [`MIN_FRAME_LEN`].
    Truncated,
    /// Ethertype other than IPv4.
    NotIpv4(u16),
    /// IP version or header length field is invalid.
    Malformed,
    /// Protocol other than ICMP, TCP or UDP.
    UnsupportedProtocol(u8),
    /// IP options push the transport header past the frame end.
    TruncatedTransport,
}

#[inline(always)]
fn be16(frame: &[u8], offset: usize) -> Option<u16> {
    frame.get(offset..offset + 2).map(BigEndian::read_u16)
}

#[inline(always)]
fn be32(frame: &[u8], offset: usize) -> Option<u32> {
    frame.get(offset..offset + 4).map(BigEndian::read_u32)
}

/// Parses a raw Ethernet frame into a [`PacketTuple`].
///
/// Ports are read only for TCP and UDP; ICMP tuples carry zero ports.
pub fn extract(frame: &[u8]) -> Result<PacketTuple, Skip> {
    if frame.len() < MIN_FRAME_LEN {
        return Err(Skip::Truncated);
    }

    let ethertype = be16(frame, ETH_TYPE).ok_or(Skip::Truncated)?;
    if ethertype != ETH_P_IP {
        return Err(Skip::NotIpv4(ethertype));
    }

    let version_ihl = *frame.get(IP_VERSION_IHL).ok_or(Skip::Truncated)?;
    let ihl = usize::from(version_ihl & 0x0f) * 4;
    if version_ihl >> 4 != 4 || ihl < IPV4_MIN_HLEN {
        return Err(Skip::Malformed);
    }

    let protocol = *frame.get(IP_PROTOCOL).ok_or(Skip::Truncated)?;
    let src_addr = be32(frame, IP_SADDR).ok_or(Skip::Truncated)?;
    let dst_addr = be32(frame, IP_DADDR).ok_or(Skip::Truncated)?;

    let mut tuple = PacketTuple {
        src_addr,
        dst_addr,
        src_port: 0,
        dst_port: 0,
        protocol,
    };

    match IpProtocol::from_number(protocol) {
        Some(IpProtocol::Icmp) => {}
        Some(IpProtocol::Tcp | IpProtocol::Udp) => {
            let l4 = ETH_HLEN + ihl;
            tuple.src_port = be16(frame, l4).ok_or(Skip::TruncatedTransport)?;
            tuple.dst_port = be16(frame, l4 + 2).ok_or(Skip::TruncatedTransport)?;
        }
        None => return Err(Skip::UnsupportedProtocol(protocol)),
    }

    Ok(tuple)
}

/// Frame builders shared by unit and integration tests.
#[doc(hidden)]
pub mod testing {
    use super::*;

    /// Builds an Ethernet + IPv4 frame (no options) with an 8 byte L4
    /// header carrying the given ports.
    pub fn ipv4_frame(
        protocol: u8,
        src_addr: u32,
        src_port: u16,
        dst_addr: u32,
        dst_port: u16,
    ) -> Vec<u8> {
        let mut frame = vec![0u8; MIN_FRAME_LEN];
        BigEndian::write_u16(&mut frame[ETH_TYPE..], ETH_P_IP);
        frame[IP_VERSION_IHL] = 0x45;
        frame[IP_PROTOCOL] = protocol;
        BigEndian::write_u32(&mut frame[IP_SADDR..], src_addr);
        BigEndian::write_u32(&mut frame[IP_DADDR..], dst_addr);
        let l4 = ETH_HLEN + IPV4_MIN_HLEN;
        BigEndian::write_u16(&mut frame[l4..], src_port);
        BigEndian::write_u16(&mut frame[l4 + 2..], dst_port);
        frame
    }

    /// Builds an ICMP echo frame.
    pub fn icmp_frame(src_addr: u32, dst_addr: u32) -> Vec<u8> {
        let mut frame = ipv4_frame(IpProtocol::Icmp.number(), src_addr, 0, dst_addr, 0);
        frame[ETH_HLEN + IPV4_MIN_HLEN] = 8;
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use pretty_assertions::assert_eq;

    const SRC: u32 = 0xC0A8_0105;
    const DST: u32 = 0xC0A8_0109;

    #[test]
    fn test_extract_tcp() {
        let frame = ipv4_frame(6, SRC, 40000, DST, 443);
        assert_eq!(
            extract(&frame),
            Ok(PacketTuple::with_ports(IpProtocol::Tcp, SRC, 40000, DST, 443))
        );
    }

    #[test]
    fn test_extract_udp() {
        let frame = ipv4_frame(17, SRC, 5353, DST, 53);
        let tuple = extract(&frame).unwrap();
        assert_eq!(tuple.protocol, 17);
        assert_eq!(tuple.src_port, 5353);
        assert_eq!(tuple.dst_port, 53);
    }

    #[test]
    fn test_extract_icmp_has_no_ports() {
        let frame = icmp_frame(SRC, DST);
        assert_eq!(extract(&frame), Ok(PacketTuple::icmp(SRC, DST)));
    }

    #[test]
    fn test_truncated_frames() {
        let frame = ipv4_frame(6, SRC, 1, DST, 2);
        for len in [0, 1, ETH_HLEN, ETH_HLEN + IPV4_MIN_HLEN, MIN_FRAME_LEN - 1] {
            assert_eq!(extract(&frame[..len]), Err(Skip::Truncated), "len={}", len);
        }
    }

    #[test]
    fn test_non_ipv4_ethertype() {
        let mut frame = icmp_frame(SRC, DST);
        frame[12] = 0x86;
        frame[13] = 0xdd;
        assert_eq!(extract(&frame), Err(Skip::NotIpv4(0x86dd)));
    }

    #[test]
    fn test_bad_version_or_ihl() {
        let mut frame = icmp_frame(SRC, DST);
        frame[ETH_HLEN] = 0x65;
        assert_eq!(extract(&frame), Err(Skip::Malformed));
        frame[ETH_HLEN] = 0x44;
        assert_eq!(extract(&frame), Err(Skip::Malformed));
    }

    #[test]
    fn test_unsupported_protocol() {
        let frame = ipv4_frame(47, SRC, 0, DST, 0);
        assert_eq!(extract(&frame), Err(Skip::UnsupportedProtocol(47)));
    }

    #[test]
    fn test_ip_options_shift_transport_header() {
        // IHL = 6: four bytes of options before the UDP header.
        let mut frame = ipv4_frame(17, SRC, 0, DST, 0);
        frame[ETH_HLEN] = 0x46;
        frame.extend_from_slice(&[0; 4]);
        let l4 = ETH_HLEN + 24;
        BigEndian::write_u16(&mut frame[l4..], 1234);
        BigEndian::write_u16(&mut frame[l4 + 2..], 80);
        let tuple = extract(&frame).unwrap();
        assert_eq!((tuple.src_port, tuple.dst_port), (1234, 80));
    }

    #[test]
    fn test_transport_past_frame_end() {
        let mut frame = ipv4_frame(6, SRC, 1, DST, 2);
        frame[ETH_HLEN] = 0x4f;
        assert_eq!(extract(&frame), Err(Skip::TruncatedTransport));
    }

    #[test]
    fn test_options_do_not_affect_icmp() {
        let mut frame = icmp_frame(SRC, DST);
        frame[ETH_HLEN] = 0x4f;
        assert_eq!(extract(&frame), Ok(PacketTuple::icmp(SRC, DST)));
    }
}
