//! Rule actions.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The verdict attached to an ACL rule.
///
/// Codes follow the XDP return values, so a stored action byte can be
/// handed to the host unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", from = "u8")]
pub enum Action {
    Aborted,
    Drop,
    /// Fail-open default.
    #[default]
    Pass,
    Tx,
    Redirect,
    /// Any other host-defined verdict code.
    Custom(u8),
}

impl Action {
    /// Returns the numeric verdict code.
    pub const fn code(&self) -> u8 {
        match self {
            Action::Aborted => 0,
            Action::Drop => 1,
            Action::Pass => 2,
            Action::Tx => 3,
            Action::Redirect => 4,
            Action::Custom(code) => *code,
        }
    }

    /// Maps a numeric verdict code back to an action.
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => Action::Aborted,
            1 => Action::Drop,
            2 => Action::Pass,
            3 => Action::Tx,
            4 => Action::Redirect,
            other => Action::Custom(other),
        }
    }
}

impl From<u8> for Action {
    fn from(code: u8) -> Self {
        Action::from_code(code)
    }
}

impl From<Action> for u8 {
    fn from(action: Action) -> Self {
        action.code()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Aborted => write!(f, "ABORTED"),
            Action::Drop => write!(f, "DROP"),
            Action::Pass => write!(f, "PASS"),
            Action::Tx => write!(f, "TX"),
            Action::Redirect => write!(f, "REDIRECT"),
            Action::Custom(code) => write!(f, "CUSTOM({})", code),
        }
    }
}

impl FromStr for Action {
    type Err = ParseError;

    /// Parses rule-file spellings: `allow`/`pass`, `deny`/`drop`, `tx`,
    /// `redirect`, `aborted`, or a raw numeric code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "allow" | "pass" => Ok(Action::Pass),
            "deny" | "drop" => Ok(Action::Drop),
            "tx" => Ok(Action::Tx),
            "redirect" => Ok(Action::Redirect),
            "aborted" => Ok(Action::Aborted),
            other => other
                .parse::<u8>()
                .map(Action::from_code)
                .map_err(|_| ParseError::InvalidAction(s.to_string())),
        }
    }
}
