//! Hex frame input.
//!
//! One frame per line, written as contiguous hex digits. Blank lines and
//! lines starting with `#` are ignored; whitespace inside a line is
//! allowed so captures can be pasted as `xx xx xx`.

use std::fs;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("Failed to read frames file {}: {source}", .path.display())]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A frame and the 1-based line it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub line: usize,
    pub bytes: Vec<u8>,
}

fn decode_hex(text: &str) -> Result<Vec<u8>, String> {
    let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits ({})", digits.len()));
    }

    let mut bytes = Vec::with_capacity(digits.len() / 2);
    for i in (0..digits.len()).step_by(2) {
        let pair = digits
            .get(i..i + 2)
            .ok_or_else(|| format!("non-ASCII data at offset {}", i))?;
        let byte =
            u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte {:?}", pair))?;
        bytes.push(byte);
    }
    Ok(bytes)
}

/// Parses the contents of a frames file.
pub fn parse_frames(text: &str) -> Result<Vec<Frame>, FrameError> {
    let mut frames = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let bytes = decode_hex(line).map_err(|reason| FrameError::Parse {
            line: idx + 1,
            reason,
        })?;
        frames.push(Frame {
            line: idx + 1,
            bytes,
        });
    }
    Ok(frames)
}

/// Reads and parses a frames file.
pub fn load_frames(path: impl AsRef<Path>) -> Result<Vec<Frame>, FrameError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| FrameError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_frames(&text)
}

/// Formats bytes as lowercase hex.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
