//! Inclusive L4 port ranges.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An inclusive range of L4 ports.
///
/// Rule files write ranges as `"80"`, `"8000-8080"`, or `"*"`/`"all"`
/// for every port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    /// Every port, `0..=65535`.
    pub const ANY: Self = PortRange {
        start: 0,
        end: u16::MAX,
    };

    /// Creates a range, rejecting `start > end`.
    pub fn new(start: u16, end: u16) -> Result<Self, ParseError> {
        if start > end {
            return Err(ParseError::InvalidPortRange { start, end });
        }
        Ok(PortRange { start, end })
    }

    /// A range holding exactly one port.
    pub const fn single(port: u16) -> Self {
        PortRange {
            start: port,
            end: port,
        }
    }

    /// Returns true if `port` lies within the range (both ends inclusive).
    pub const fn contains(&self, port: u16) -> bool {
        self.start <= port && port <= self.end
    }

    /// Returns true if the range covers every port.
    pub const fn is_any(&self) -> bool {
        self.start == 0 && self.end == u16::MAX
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_any() {
            write!(f, "*")
        } else if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

fn parse_port(s: &str) -> Result<u16, ParseError> {
    s.trim()
        .parse::<u16>()
        .map_err(|_| ParseError::InvalidPort(s.to_string()))
}

impl FromStr for PortRange {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "*" | "all" => return Ok(Self::ANY),
            "" => return Err(ParseError::InvalidPort(s.to_string())),
            _ => {}
        }

        match lower.split_once('-') {
            Some((a, b)) => PortRange::new(parse_port(a)?, parse_port(b)?),
            None => Ok(PortRange::single(parse_port(&lower)?)),
        }
    }
}
