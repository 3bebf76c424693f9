//! Common value types shared by the ACL control plane and data plane.
//!
//! - [`Ipv4Prefix`]: IPv4 network prefixes (CIDR notation), always masked
//! - [`IpProtocol`]: the L4 protocols the classifier understands
//! - [`Action`]: the verdict attached to a rule (XDP numbering)
//! - [`PortRange`]: inclusive L4 port ranges

mod action;
mod ip;
mod port;
mod protocol;

pub use action::Action;
pub use ip::{mask_len, prefix_mask, Ipv4Prefix};
pub use port::PortRange;
pub use protocol::IpProtocol;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid IPv4 address format: {0}")]
    InvalidIpAddress(String),

    #[error("invalid IPv4 prefix format: {0}")]
    InvalidIpPrefix(String),

    #[error("non-contiguous IPv4 mask: {0:#010x}")]
    InvalidMask(u32),

    #[error("invalid port: {0}")]
    InvalidPort(String),

    #[error("invalid port range: {start} > {end}")]
    InvalidPortRange { start: u16, end: u16 },

    #[error("invalid protocol: {0}")]
    InvalidProtocol(String),

    #[error("invalid action: {0}")]
    InvalidAction(String),
}
